// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Ordered output channel.
//!
//! [`OutputPort`] owns the downstream [`EventSink`] behind its own lock.
//! Input-side locks (registry, per-source queues) are never held while the
//! port lock is taken by the worker, so a slow consumer cannot stop
//! producers from filling their queues.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::core::events::StreamEvent;
use crate::core::flow::FlowReturn;

/// Downstream consumer of an ordered output.
pub trait EventSink<T>: Send {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn;
}

impl<T> EventSink<T> for Box<dyn EventSink<T>> {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        (**self).emit(event)
    }
}

/// Single-writer output guarded by a dedicated lock.
pub struct OutputPort<T> {
    name: String,
    sink: Mutex<Box<dyn EventSink<T>>>,
}

impl<T> OutputPort<T> {
    pub fn new(name: impl Into<String>, sink: Box<dyn EventSink<T>>) -> Self {
        Self {
            name: name.into(),
            sink: Mutex::new(sink),
        }
    }

    /// Emit one event. Callers emitting a run of events that must stay
    /// contiguous use [`OutputPort::lock`] instead.
    pub fn emit(&self, event: StreamEvent<T>) -> FlowReturn {
        let kind = event.name();
        let flow = self.sink.lock().emit(event);
        if flow.is_failure() {
            tracing::warn!("[{}] {} emission returned {}", self.name, kind, flow);
        }
        flow
    }

    pub fn lock(&self) -> parking_lot::MutexGuard<'_, Box<dyn EventSink<T>>> {
        self.sink.lock()
    }
}

/// Sink backed by a crossbeam channel.
pub struct ChannelSink<T> {
    tx: Sender<StreamEvent<T>>,
    blocking: bool,
}

impl<T: Send> ChannelSink<T> {
    pub fn new(tx: Sender<StreamEvent<T>>) -> Self {
        Self { tx, blocking: true }
    }

    pub fn unbounded() -> (Self, Receiver<StreamEvent<T>>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    /// Bounded sink. When `blocking` is false a full channel reports
    /// [`FlowReturn::Flushing`] instead of waiting for the receiver.
    pub fn bounded(capacity: usize, blocking: bool) -> (Self, Receiver<StreamEvent<T>>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx, blocking }, rx)
    }
}

impl<T: Send> EventSink<T> for ChannelSink<T> {
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        if self.blocking {
            return match self.tx.send(event) {
                Ok(()) => FlowReturn::Ok,
                Err(_) => FlowReturn::NotLinked,
            };
        }
        match self.tx.try_send(event) {
            Ok(()) => FlowReturn::Ok,
            Err(TrySendError::Full(_)) => FlowReturn::Flushing,
            Err(TrySendError::Disconnected(_)) => FlowReturn::NotLinked,
        }
    }
}

/// Sink wrapping a closure.
pub struct FnSink<F>(pub F);

impl<T, F> EventSink<T> for FnSink<F>
where
    F: FnMut(StreamEvent<T>) -> FlowReturn + Send,
{
    fn emit(&mut self, event: StreamEvent<T>) -> FlowReturn {
        (self.0)(event)
    }
}
