// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod funnel_config;
mod pipeline_config;
mod skip_frame_config;

pub use funnel_config::FunnelConfig;
pub(crate) use funnel_config::validate_wait_timeout_ms;
pub use pipeline_config::PipelineConfig;
pub use skip_frame_config::SkipFrameConfig;
