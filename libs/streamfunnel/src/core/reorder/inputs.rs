// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! [`EventSink`] adapters feeding a shared [`SequenceReorderer`], so the
//! reorderer can sit at the end of a chain of stages.

use std::sync::Arc;

use super::reorderer::SequenceReorderer;
use crate::core::events::StreamEvent;
use crate::core::flow::FlowReturn;
use crate::core::output::EventSink;
use crate::core::{Result, StreamError};

fn to_flow(path: &str, result: Result<()>) -> FlowReturn {
    match result {
        Ok(()) => FlowReturn::Ok,
        Err(StreamError::DownstreamFailure(flow)) => flow,
        Err(e) => {
            tracing::error!("[reorder] {} input: {}", path, e);
            FlowReturn::Error
        }
    }
}

/// Processed-path input. Also carries the stream's control events.
pub struct ProcessedInput<T: Send + 'static> {
    reorderer: Arc<SequenceReorderer<T>>,
}

impl<T: Send + 'static> EventSink<T> for ProcessedInput<T> {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        let result = match event {
            StreamEvent::Data(item) if item.source_id.is_none() => {
                self.reorderer.on_untagged_item(item)
            }
            StreamEvent::Data(item) => self.reorderer.on_processed_item(item),
            StreamEvent::PadAdded(source) => self.reorderer.on_stream_start(source),
            StreamEvent::SourceEos(source) => self.reorderer.on_source_eos(source),
            StreamEvent::Segment(Some(source), segment) => {
                self.reorderer.on_segment(source, segment)
            }
            StreamEvent::Eos => self.reorderer.on_end_of_stream(),
            StreamEvent::Segment(None, _) | StreamEvent::PadRemoved(_) => Ok(()),
        };
        to_flow("processed", result)
    }
}

/// Pass-through input. Control events on this path are dropped; the
/// processed path carries them.
pub struct PassthroughInput<T: Send + 'static> {
    reorderer: Arc<SequenceReorderer<T>>,
}

impl<T: Send + 'static> EventSink<T> for PassthroughInput<T> {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        let result = match event {
            StreamEvent::Data(item) if item.source_id.is_none() => {
                self.reorderer.on_untagged_item(item)
            }
            StreamEvent::Data(item) => self.reorderer.on_passthrough_item(item),
            other => {
                tracing::trace!("[reorder] pass-through input: dropping {}", other.name());
                Ok(())
            }
        };
        to_flow("pass-through", result)
    }
}

impl<T: Send + 'static> SequenceReorderer<T> {
    pub fn processed_input(self: &Arc<Self>) -> ProcessedInput<T> {
        ProcessedInput {
            reorderer: Arc::clone(self),
        }
    }

    pub fn passthrough_input(self: &Arc<Self>) -> PassthroughInput<T> {
        PassthroughInput {
            reorderer: Arc::clone(self),
        }
    }
}
