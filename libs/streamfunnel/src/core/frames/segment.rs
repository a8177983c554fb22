// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentFormat {
    #[default]
    Time,
    Bytes,
    Buffers,
}

/// Playback segment of a stream. Positions are in nanoseconds for
/// [`SegmentFormat::Time`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub format: SegmentFormat,
    pub rate: f64,
    pub start: u64,
    pub stop: Option<u64>,
    pub time: u64,
    pub position: u64,
    pub base: u64,
}

impl Segment {
    /// Open-ended time segment starting at zero.
    pub fn time() -> Self {
        Self::new_time(0)
    }

    pub fn new_time(start: u64) -> Self {
        Self {
            format: SegmentFormat::Time,
            rate: 1.0,
            start,
            stop: None,
            time: start,
            position: start,
            base: 0,
        }
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::time()
    }
}
