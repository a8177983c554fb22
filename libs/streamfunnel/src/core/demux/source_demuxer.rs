// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Splits an ordered output back into one output per source.

use std::collections::BTreeMap;

use crate::core::events::StreamEvent;
use crate::core::flow::FlowReturn;
use crate::core::frames::SourceId;
use crate::core::output::EventSink;
use crate::core::{Result, StreamError};

/// Creates the downstream sink for a newly announced source.
pub trait SourceSinkFactory<T>: Send {
    fn create(&mut self, source: SourceId) -> Result<Box<dyn EventSink<T>>>;
}

impl<T, F> SourceSinkFactory<T> for F
where
    F: FnMut(SourceId) -> Result<Box<dyn EventSink<T>>> + Send,
{
    fn create(&mut self, source: SourceId) -> Result<Box<dyn EventSink<T>>> {
        self(source)
    }
}

pub struct SourceDemuxer<T, F> {
    factory: F,
    sinks: BTreeMap<SourceId, Box<dyn EventSink<T>>>,
}

impl<T, F: SourceSinkFactory<T>> SourceDemuxer<T, F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sinks: BTreeMap::new(),
        }
    }

    pub fn source_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn has_source(&self, source: SourceId) -> bool {
        self.sinks.contains_key(&source)
    }

    /// Route one event. Data for a source with no sink yields
    /// `NotNegotiated`; a segment for one is an error.
    pub fn handle(&mut self, event: StreamEvent<T>) -> Result<FlowReturn> {
        match event {
            StreamEvent::PadAdded(source) => {
                if !self.sinks.contains_key(&source) {
                    let sink = self.factory.create(source)?;
                    self.sinks.insert(source, sink);
                    tracing::debug!("[demux] source {}: output created", source);
                }
                Ok(FlowReturn::Ok)
            }
            StreamEvent::Data(item) => {
                let Some(source) = item.source_id else {
                    tracing::error!("[demux] data item carries no source id");
                    return Ok(FlowReturn::NotNegotiated);
                };
                match self.sinks.get_mut(&source) {
                    Some(sink) => Ok(sink.emit(StreamEvent::Data(item))),
                    None => {
                        tracing::error!("[demux] source {}: no output for data", source);
                        Ok(FlowReturn::NotNegotiated)
                    }
                }
            }
            StreamEvent::Segment(Some(source), segment) => match self.sinks.get_mut(&source) {
                Some(sink) => Ok(sink.emit(StreamEvent::Segment(Some(source), segment))),
                None => Err(StreamError::NotFound(format!(
                    "no output for segment of source {}",
                    source
                ))),
            },
            StreamEvent::SourceEos(source) => match self.sinks.get_mut(&source) {
                Some(sink) => {
                    tracing::debug!("[demux] source {}: EOS", source);
                    Ok(sink.emit(StreamEvent::Eos))
                }
                None => {
                    tracing::warn!("[demux] source {}: EOS for unknown output", source);
                    Ok(FlowReturn::Ok)
                }
            },
            StreamEvent::PadRemoved(source) => match self.sinks.remove(&source) {
                Some(mut sink) => {
                    tracing::debug!("[demux] source {}: output removed", source);
                    Ok(sink.emit(StreamEvent::Eos))
                }
                None => Ok(FlowReturn::Ok),
            },
            StreamEvent::Segment(None, _) | StreamEvent::Eos => Ok(FlowReturn::Ok),
        }
    }
}

impl<T, F: SourceSinkFactory<T>> EventSink<T> for SourceDemuxer<T, F> {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        match self.handle(event) {
            Ok(flow) => flow,
            Err(e) => {
                tracing::error!("[demux] {}", e);
                FlowReturn::Error
            }
        }
    }
}
