// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::router::{InferenceRouter, Route};
use crate::core::events::StreamEvent;
use crate::core::flow::FlowReturn;
use crate::core::output::EventSink;

/// [`EventSink`] wrapper around an [`InferenceRouter`].
///
/// Data goes to `processed` or `passthrough` as routed. Control events and
/// untagged items always go to `processed`.
pub struct SkipFrameStage<T> {
    router: InferenceRouter,
    processed: Box<dyn EventSink<T>>,
    passthrough: Box<dyn EventSink<T>>,
}

impl<T> SkipFrameStage<T> {
    pub fn new(
        router: InferenceRouter,
        processed: Box<dyn EventSink<T>>,
        passthrough: Box<dyn EventSink<T>>,
    ) -> Self {
        Self {
            router,
            processed,
            passthrough,
        }
    }

    pub fn router(&self) -> &InferenceRouter {
        &self.router
    }
}

impl<T> EventSink<T> for SkipFrameStage<T> {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        match event {
            StreamEvent::Data(item) if item.source_id.is_some() => {
                match self.router.route(item) {
                    Ok(routed) => match routed.route {
                        Route::Processed => self.processed.emit(StreamEvent::Data(routed.item)),
                        Route::Passthrough => {
                            self.passthrough.emit(StreamEvent::Data(routed.item))
                        }
                    },
                    Err(e) => {
                        tracing::error!("[skipframe] {}", e);
                        FlowReturn::Error
                    }
                }
            }
            StreamEvent::PadAdded(source) => {
                self.router.on_stream_start(source);
                self.processed.emit(StreamEvent::PadAdded(source))
            }
            StreamEvent::SourceEos(source) => {
                self.router.on_source_eos(source);
                self.processed.emit(StreamEvent::SourceEos(source))
            }
            other => self.processed.emit(other),
        }
    }
}
