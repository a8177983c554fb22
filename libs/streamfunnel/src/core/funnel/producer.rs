// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use super::producer_queue::{ProducerQueue, QueueEntry};
use super::round_robin::FunnelShared;
use crate::core::flow::FlowReturn;
use crate::core::frames::{Segment, SourceId, TaggedItem, VideoInfo};
use crate::core::Result;

/// Producer-side handle returned by
/// [`RoundRobinFunnel::register_producer`](super::RoundRobinFunnel::register_producer).
///
/// Cheap to clone; every clone feeds the same bounded queue.
pub struct ProducerHandle<T> {
    pub(super) id: SourceId,
    pub(super) queue: Arc<ProducerQueue<T>>,
    pub(super) shared: Arc<FunnelShared<T>>,
}

impl<T> Clone for ProducerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            queue: Arc::clone(&self.queue),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> ProducerHandle<T> {
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Queue one item, blocking while this producer's queue is full.
    ///
    /// Returns the last downstream status seen by the worker, or the reason
    /// the item was refused (`NotLinked` after removal, `Flushing` while
    /// stopped, `Eos` after [`ProducerHandle::mark_eos`]).
    pub fn push(&self, payload: T) -> FlowReturn {
        let item = TaggedItem::new(payload).with_source(self.id);
        match self.queue.push(QueueEntry::Data(item)) {
            Ok(()) => self.shared.last_flow.get(),
            Err(flow) => {
                tracing::debug!("[funnel] {}: push refused ({})", self.id.pad_name(), flow);
                flow
            }
        }
    }

    /// Queue segment information; it reaches downstream in order with this
    /// producer's data.
    pub fn send_segment(&self, segment: Segment) -> FlowReturn {
        match self.queue.push(QueueEntry::Segment(segment)) {
            Ok(()) => self.shared.last_flow.get(),
            Err(flow) => flow,
        }
    }

    /// Report the producer's negotiated capabilities.
    pub fn set_caps(&self, info: &VideoInfo) -> Result<()> {
        self.shared.negotiate(self.id, info)
    }

    /// The producer will push nothing more. Its `SourceEos` follows once the
    /// queue drains.
    pub fn mark_eos(&self) {
        if self.queue.mark_eos() {
            tracing::debug!("[funnel] {}: got EOS", self.id.pad_name());
        }
    }

    /// Items currently queued and not yet taken by the worker.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}
