// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Result, StreamError};

/// Settings for the fan-in round-robin scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelConfig {
    /// Per-producer queue capacity.
    pub queue_size: usize,
    /// Override for the per-producer wait. When unset the wait is derived
    /// from the negotiated framerate of live sources, or unbounded.
    pub sink_wait_timeout_ms: Option<u64>,
}

impl FunnelConfig {
    pub const DEFAULT_QUEUE_SIZE: usize = 2;
    pub const MIN_QUEUE_SIZE: usize = 1;
    pub const MAX_QUEUE_SIZE: usize = 100;
    pub const MIN_WAIT_TIMEOUT_MS: u64 = 1;
    pub const MAX_WAIT_TIMEOUT_MS: u64 = 1000;

    /// Hard ceiling on simultaneously registered producers.
    pub const MAX_PRODUCERS: usize = 256;

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    pub fn with_wait_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.sink_wait_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn wait_timeout_override(&self) -> Option<Duration> {
        self.sink_wait_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_QUEUE_SIZE..=Self::MAX_QUEUE_SIZE).contains(&self.queue_size) {
            return Err(StreamError::Configuration(format!(
                "queue_size {} out of range [{}, {}]",
                self.queue_size,
                Self::MIN_QUEUE_SIZE,
                Self::MAX_QUEUE_SIZE
            )));
        }
        if let Some(ms) = self.sink_wait_timeout_ms {
            validate_wait_timeout_ms(ms)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_wait_timeout_ms(ms: u64) -> Result<()> {
    if !(FunnelConfig::MIN_WAIT_TIMEOUT_MS..=FunnelConfig::MAX_WAIT_TIMEOUT_MS).contains(&ms) {
        return Err(StreamError::Configuration(format!(
            "sink_wait_timeout_ms {} out of range [{}, {}]",
            ms,
            FunnelConfig::MIN_WAIT_TIMEOUT_MS,
            FunnelConfig::MAX_WAIT_TIMEOUT_MS
        )));
    }
    Ok(())
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            queue_size: Self::DEFAULT_QUEUE_SIZE,
            sink_wait_timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FunnelConfig::default();
        assert_eq!(config.queue_size, 2);
        assert!(config.sink_wait_timeout_ms.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_queue_size_bounds() {
        assert!(FunnelConfig::default().with_queue_size(0).validate().is_err());
        assert!(FunnelConfig::default().with_queue_size(1).validate().is_ok());
        assert!(FunnelConfig::default().with_queue_size(100).validate().is_ok());
        assert!(FunnelConfig::default().with_queue_size(101).validate().is_err());
    }

    #[test]
    fn test_wait_timeout_bounds() {
        assert!(FunnelConfig::default().with_wait_timeout_ms(0).validate().is_err());
        assert!(FunnelConfig::default().with_wait_timeout_ms(1000).validate().is_ok());
        assert!(matches!(
            FunnelConfig::default().with_wait_timeout_ms(1001).validate(),
            Err(StreamError::Configuration(_))
        ));
    }
}
