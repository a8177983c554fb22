// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use super::source_queues::{PendingItems, SourceQueues};
use super::worker;
use crate::core::events::StreamEvent;
use crate::core::flow::FlowReturn;
use crate::core::frames::{Segment, SourceId, TaggedItem};
use crate::core::output::{EventSink, OutputPort};
use crate::core::{Result, StreamError};

pub(super) type SourceRegistry<T> = BTreeMap<SourceId, Arc<Mutex<SourceQueues<T>>>>;

/// State shared between the reorderer and its worker.
///
/// Lock order is registry, then a source's queues. The output lock is never
/// taken while holding either.
pub(super) struct ReorderShared<T> {
    pub sources: Mutex<SourceRegistry<T>>,
    /// Bumped on every wake-worthy event; the worker sleeps while it is
    /// unchanged.
    pub generation: Mutex<u64>,
    pub wake: Condvar,
    pub output: OutputPort<T>,
    pub end_of_stream: AtomicBool,
    pub shutdown: AtomicBool,
    pub running: AtomicBool,
    pub aborted: Mutex<Option<FlowReturn>>,
}

impl<T> ReorderShared<T> {
    pub fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.wake.notify_all();
    }

    pub fn snapshot(&self) -> Vec<(SourceId, Arc<Mutex<SourceQueues<T>>>)> {
        self.sources
            .lock()
            .iter()
            .map(|(id, queues)| (*id, Arc::clone(queues)))
            .collect()
    }

    /// Processed items buffered across every source. While any are held,
    /// the worker keeps rescanning instead of waiting for a wake.
    pub fn processed_pending(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|(_, queues)| queues.lock().pending().processed)
            .sum()
    }

    fn check_aborted(&self) -> Result<()> {
        match *self.aborted.lock() {
            Some(flow) => Err(StreamError::DownstreamFailure(flow)),
            None => Ok(()),
        }
    }

    fn source(
        &self,
        id: Option<SourceId>,
        path: &str,
    ) -> Result<(SourceId, Arc<Mutex<SourceQueues<T>>>)> {
        let id = id.ok_or_else(|| {
            StreamError::ProtocolViolation(format!("{} carries no source id", path))
        })?;
        let queues = self.sources.lock().get(&id).cloned().ok_or_else(|| {
            tracing::error!("[reorder] {} for unknown source {}", path, id);
            StreamError::ProtocolViolation(format!("{} for unknown source {}", path, id))
        })?;
        Ok((id, queues))
    }
}

/// Fan-out sequence reorderer.
pub struct SequenceReorderer<T: Send + 'static> {
    shared: Arc<ReorderShared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> SequenceReorderer<T> {
    pub fn new(sink: Box<dyn EventSink<T>>) -> Self {
        Self {
            shared: Arc::new(ReorderShared {
                sources: Mutex::new(BTreeMap::new()),
                generation: Mutex::new(0),
                wake: Condvar::new(),
                output: OutputPort::new("reorder", sink),
                end_of_stream: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                running: AtomicBool::new(false),
                aborted: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Err(StreamError::Runtime(
                "Reorder worker is already running".to_string(),
            ));
        }
        if let Some(previous) = worker.take() {
            if previous.join().is_err() {
                tracing::error!("[reorder] Previous worker panicked");
            }
        }
        self.shared.shutdown.store(false, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("streamfunnel-reorder".to_string())
            .spawn(move || worker::run(shared))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                StreamError::Runtime(format!("Failed to spawn thread: {}", e))
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stop the worker, leaving buffered items in place.
    pub fn stop(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.notify();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::error!("[reorder] Worker panicked");
            }
        }
        self.shared.running.store(false, Ordering::Release);
    }

    /// Wait for the worker to exit on its own (terminal EOS or abort).
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("[reorder] Worker panicked");
            }
        }
    }

    /// Announce the source downstream with `PadAdded`, then allocate its
    /// ordering state starting at sequence 0.
    pub fn on_stream_start(&self, source: SourceId) -> Result<()> {
        self.shared.check_aborted()?;
        let flow = self.shared.output.emit(StreamEvent::PadAdded(source));
        let previous = self
            .shared
            .sources
            .lock()
            .insert(source, Arc::new(Mutex::new(SourceQueues::new(source))));
        if previous.is_some() {
            tracing::warn!("[reorder] source {}: restarted, previous state discarded", source);
        } else {
            tracing::debug!("[reorder] source {}: stream start", source);
        }
        flow.into_result()
    }

    /// Forward a source's segment as is.
    pub fn on_segment(&self, source: SourceId, segment: Segment) -> Result<()> {
        self.shared.check_aborted()?;
        self.shared
            .output
            .emit(StreamEvent::Segment(Some(source), segment))
            .into_result()
    }

    /// Item coming back from the accelerator. Wakes the worker.
    pub fn on_processed_item(&self, item: TaggedItem<T>) -> Result<()> {
        self.shared.check_aborted()?;
        let (id, queues) = self.shared.source(item.source_id, "processed item")?;
        tracing::trace!("[reorder] source {}: processed item {}", id, item.sequence);
        queues.lock().push_processed(item);
        self.shared.notify();
        Ok(())
    }

    /// Item that bypassed the accelerator.
    ///
    /// This does not wake an idle worker. While processed items are buffered
    /// the worker keeps rescanning and picks it up; otherwise it waits for
    /// the next processed item, an EOS or a source finishing. A source fed
    /// only on this path can therefore sit buffered until one of those
    /// happens.
    pub fn on_passthrough_item(&self, item: TaggedItem<T>) -> Result<()> {
        self.shared.check_aborted()?;
        let (id, queues) = self.shared.source(item.source_id, "pass-through item")?;
        tracing::trace!("[reorder] source {}: pass-through item {}", id, item.sequence);
        queues.lock().push_passthrough(item);
        Ok(())
    }

    /// Item without a source tag; forwarded as is, bypassing reordering.
    pub fn on_untagged_item(&self, item: TaggedItem<T>) -> Result<()> {
        self.shared.check_aborted()?;
        self.shared.output.emit(StreamEvent::Data(item)).into_result()
    }

    /// The source will send nothing more. Its `SourceEos` follows once both
    /// of its queues drain.
    pub fn on_source_eos(&self, source: SourceId) -> Result<()> {
        self.shared.check_aborted()?;
        let (_, queues) = self.shared.source(Some(source), "EOS")?;
        queues.lock().mark_eos();
        tracing::debug!("[reorder] source {}: got EOS", source);
        self.shared.notify();
        Ok(())
    }

    /// The processed input ended. The terminal EOS follows once every source
    /// has finished.
    pub fn on_end_of_stream(&self) -> Result<()> {
        self.shared.check_aborted()?;
        self.shared.end_of_stream.store(true, Ordering::Release);
        tracing::debug!("[reorder] end of stream received");
        self.shared.notify();
        Ok(())
    }

    pub fn source_count(&self) -> usize {
        self.shared.sources.lock().len()
    }

    /// Next sequence the source is waiting for, if the source is known.
    pub fn next_expected(&self, source: SourceId) -> Option<u64> {
        let queues = self.shared.sources.lock().get(&source).cloned()?;
        let next = queues.lock().next_expected();
        Some(next)
    }

    pub fn pending(&self, source: SourceId) -> Option<PendingItems> {
        let queues = self.shared.sources.lock().get(&source).cloned()?;
        let pending = queues.lock().pending();
        Some(pending)
    }

    /// Status that made the worker give up, if it did.
    pub fn aborted(&self) -> Option<FlowReturn> {
        *self.shared.aborted.lock()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Drop for SequenceReorderer<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::output::ChannelSink;

    fn reorderer() -> (SequenceReorderer<u32>, crossbeam_channel::Receiver<StreamEvent<u32>>) {
        let (sink, rx) = ChannelSink::<u32>::unbounded();
        (SequenceReorderer::new(Box::new(sink)), rx)
    }

    #[test]
    fn test_unknown_source_is_protocol_violation() {
        let (reorderer, _rx) = reorderer();
        let item = TaggedItem::tagged(SourceId(3), 0, 1);
        assert!(matches!(
            reorderer.on_processed_item(item.clone()),
            Err(StreamError::ProtocolViolation(_))
        ));
        assert!(matches!(
            reorderer.on_passthrough_item(item),
            Err(StreamError::ProtocolViolation(_))
        ));
        assert!(matches!(
            reorderer.on_source_eos(SourceId(3)),
            Err(StreamError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_untagged_item_on_tagged_path_is_rejected() {
        let (reorderer, _rx) = reorderer();
        reorderer.on_stream_start(SourceId(0)).unwrap();
        assert!(matches!(
            reorderer.on_processed_item(TaggedItem::new(1)),
            Err(StreamError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_untagged_item_is_forwarded_immediately() {
        let (reorderer, rx) = reorderer();
        reorderer.on_untagged_item(TaggedItem::new(9)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Data(TaggedItem::new(9)));
    }

    #[test]
    fn test_introspection_before_start() {
        let (reorderer, _rx) = reorderer();
        reorderer.on_stream_start(SourceId(1)).unwrap();
        reorderer
            .on_processed_item(TaggedItem::tagged(SourceId(1), 1, 10))
            .unwrap();
        reorderer
            .on_passthrough_item(TaggedItem::tagged(SourceId(1), 2, 20))
            .unwrap();

        assert_eq!(reorderer.source_count(), 1);
        assert_eq!(reorderer.next_expected(SourceId(1)), Some(0));
        assert_eq!(
            reorderer.pending(SourceId(1)),
            Some(PendingItems {
                processed: 1,
                passthrough: 1
            })
        );
        assert_eq!(reorderer.pending(SourceId(2)), None);
    }

    #[test]
    fn test_stream_start_announces_source() {
        let (reorderer, rx) = reorderer();
        reorderer.on_stream_start(SourceId(4)).unwrap();
        reorderer.on_segment(SourceId(4), Segment::time()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::PadAdded(SourceId(4)));
        assert_eq!(
            rx.try_recv().unwrap(),
            StreamEvent::Segment(Some(SourceId(4)), Segment::time())
        );
    }

    #[test]
    fn test_restart_discards_state() {
        let (reorderer, _rx) = reorderer();
        reorderer.on_stream_start(SourceId(1)).unwrap();
        reorderer
            .on_processed_item(TaggedItem::tagged(SourceId(1), 4, 10))
            .unwrap();
        reorderer.on_stream_start(SourceId(1)).unwrap();
        assert_eq!(reorderer.pending(SourceId(1)).map(|p| p.total()), Some(0));
    }
}
