// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable integer identity of an upstream stream.
///
/// Assigned once per session and never reused, so it can key registries
/// on both sides of the shared accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u32);

impl SourceId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Name used for the producer in logs (`sink_<id>`).
    pub fn pad_name(self) -> String {
        format!("sink_{}", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SourceId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Opaque payload plus the `{source, sequence}` tag.
///
/// `sequence` only carries meaning once the skip-frame router has stamped
/// it; the fan-in scheduler leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedItem<T> {
    pub source_id: Option<SourceId>,
    pub sequence: u64,
    pub payload: T,
}

impl<T> TaggedItem<T> {
    /// Untagged item with sequence 0.
    pub fn new(payload: T) -> Self {
        Self {
            source_id: None,
            sequence: 0,
            payload,
        }
    }

    pub fn with_source(mut self, source_id: SourceId) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn tagged(source_id: SourceId, sequence: u64, payload: T) -> Self {
        Self {
            source_id: Some(source_id),
            sequence,
            payload,
        }
    }
}
