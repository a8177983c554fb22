// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::{Result, StreamError};

/// Settings for the inference router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipFrameConfig {
    /// One batch in every `infer_interval` goes through the accelerator.
    pub infer_interval: u32,
}

impl SkipFrameConfig {
    pub const MIN_INFER_INTERVAL: u32 = 1;
    pub const MAX_INFER_INTERVAL: u32 = 7;

    pub fn with_infer_interval(infer_interval: u32) -> Self {
        Self { infer_interval }
    }

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_INFER_INTERVAL..=Self::MAX_INFER_INTERVAL).contains(&self.infer_interval) {
            return Err(StreamError::Configuration(format!(
                "infer_interval {} out of range [{}, {}]",
                self.infer_interval,
                Self::MIN_INFER_INTERVAL,
                Self::MAX_INFER_INTERVAL
            )));
        }
        Ok(())
    }
}

impl Default for SkipFrameConfig {
    fn default() -> Self {
        Self { infer_interval: 1 }
    }
}
