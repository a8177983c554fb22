// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::{AcceleratorCaps, BatchProcessor};
use crate::core::events::StreamEvent;
use crate::core::flow::FlowReturn;
use crate::core::frames::{TaggedItem, VideoInfo};
use crate::core::output::EventSink;
use crate::core::{Result, StreamError};

/// Sink that gathers data items into accelerator batches.
///
/// A control event flushes the partial batch before it is forwarded, so
/// control and data keep their relative order.
pub struct BatchStage<T, P> {
    processor: P,
    caps: AcceleratorCaps,
    downstream: Box<dyn EventSink<T>>,
    pending: Vec<TaggedItem<T>>,
}

impl<T: Send, P: BatchProcessor<T>> BatchStage<T, P> {
    pub fn new(processor: P, downstream: Box<dyn EventSink<T>>) -> Result<Self> {
        let caps = processor.capabilities();
        if caps.max_batch == 0 {
            return Err(StreamError::Configuration(
                "Accelerator reports a batch size of 0".to_string(),
            ));
        }
        tracing::info!(
            "[accel] {}x{} {}, batch size {}",
            caps.video.width,
            caps.video.height,
            caps.video.format,
            caps.max_batch
        );
        Ok(Self {
            processor,
            pending: Vec::with_capacity(caps.max_batch),
            caps,
            downstream,
        })
    }

    pub fn caps(&self) -> &AcceleratorCaps {
        &self.caps
    }

    /// Reject streams the accelerator cannot take.
    pub fn check_caps(&self, info: &VideoInfo) -> Result<()> {
        if self.caps.video.matches(info) {
            Ok(())
        } else {
            Err(StreamError::CapabilityMismatch(format!(
                "accelerator: {}",
                self.caps.video.describe_mismatch(info)
            )))
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Submit whatever is gathered and forward the results.
    pub fn flush(&mut self) -> FlowReturn {
        if self.pending.is_empty() {
            return FlowReturn::Ok;
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.caps.max_batch));
        let submitted = batch.len();
        tracing::trace!("[accel] submitting batch of {}", submitted);

        let results = match self.processor.process_batch(batch) {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("[accel] batch failed: {}", e);
                return FlowReturn::Error;
            }
        };
        if results.len() != submitted {
            tracing::error!(
                "[accel] batch returned {} items for {} submitted",
                results.len(),
                submitted
            );
            return FlowReturn::Error;
        }

        for item in results {
            let flow = self.downstream.emit(StreamEvent::Data(item));
            if flow.is_failure() {
                return flow;
            }
        }
        FlowReturn::Ok
    }
}

impl<T: Send, P: BatchProcessor<T>> EventSink<T> for BatchStage<T, P> {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        match event {
            StreamEvent::Data(item) => {
                self.pending.push(item);
                if self.pending.len() >= self.caps.max_batch {
                    self.flush()
                } else {
                    FlowReturn::Ok
                }
            }
            control => {
                let flow = self.flush();
                if flow.is_failure() {
                    return flow;
                }
                self.downstream.emit(control)
            }
        }
    }
}
