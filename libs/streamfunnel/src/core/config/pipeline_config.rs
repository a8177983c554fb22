// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pipeline-level configuration via `streamfunnel.yaml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{FunnelConfig, SkipFrameConfig};
use crate::core::{Result, StreamError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub funnel: FunnelConfig,
    pub skip_frame: SkipFrameConfig,
}

impl PipelineConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "streamfunnel.yaml";

    /// Load and validate the configuration from a directory. Returns error
    /// if the file is missing, cannot be parsed or holds out-of-range values.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            StreamError::Configuration(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            StreamError::Configuration(msg) => {
                StreamError::Configuration(format!("{}: {}", config_path.display(), msg))
            }
            other => other,
        })?;

        tracing::info!("Loaded pipeline config from {}", config_path.display());
        Ok(config)
    }

    /// Like [`PipelineConfig::load`] but falls back to defaults on any
    /// failure.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(
                "No {} found in {}, using defaults",
                Self::FILE_NAME,
                dir.display()
            );
            return Self::default();
        }

        match Self::load(dir) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| StreamError::Configuration(format!("Failed to parse: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.funnel.validate()?;
        self.skip_frame.validate()
    }
}
