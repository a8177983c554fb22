// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shared-accelerator plumbing for many video streams.
//!
//! [`RoundRobinFunnel`] merges N producers into one ordered stream for a
//! batching hardware stage. [`InferenceRouter`] decides which items go
//! through the accelerator. [`SequenceReorderer`] puts processed and skipped
//! items back into per-source order and [`SourceDemuxer`] hands each source
//! its own output again.

// Suppress pedantic clippy warnings that are intentional design choices
#![allow(clippy::type_complexity)] // Complex types are clear in context

pub mod core;

// Re-export crossbeam_channel for users wiring ChannelSink receivers
pub use crossbeam_channel;

pub use core::{
    init_logging, AcceleratorCaps, BatchProcessor, BatchStage, ChannelSink, EventSink, FlowReturn,
    FnSink, Fraction, FunnelConfig, InferenceRouter, OutputPort, PassthroughInput, PendingItems,
    PipelineConfig, ProcessedInput, ProducerHandle, Result, RoundRobinFunnel, Route, Routed,
    Segment, SegmentFormat, SequenceReorderer, SkipFrameConfig, SkipFrameStage, SourceDemuxer,
    SourceId, SourceSinkFactory, StreamError, StreamEvent, TaggedItem, VideoInfo, WaitTimeout,
};
