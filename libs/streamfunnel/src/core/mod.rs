// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod accel;
pub mod config;
pub mod demux;
pub mod error;
pub mod events;
pub mod flow;
pub mod frames;
pub mod funnel;
pub mod logging;
pub mod output;
pub mod reorder;
pub mod skipframe;

pub use accel::{AcceleratorCaps, BatchProcessor, BatchStage};
pub use config::{FunnelConfig, PipelineConfig, SkipFrameConfig};
pub use demux::{SourceDemuxer, SourceSinkFactory};
pub use error::*;
pub use events::StreamEvent;
pub use flow::{FlowCell, FlowReturn};
pub use frames::*;
pub use funnel::{ProducerHandle, RoundRobinFunnel, WaitTimeout};
pub use logging::init_logging;
pub use output::{ChannelSink, EventSink, FnSink, OutputPort};
pub use reorder::{PassthroughInput, PendingItems, ProcessedInput, SequenceReorderer};
pub use skipframe::{InferenceRouter, Route, Routed, SkipFrameStage};
