// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bounded per-producer queue.
//!
//! One lock and one condition variable per producer. The condition variable
//! is shared by both directions (producer waiting for room, worker waiting
//! for data or a state change) so every state change uses `notify_all`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::wait_timeout::WaitTimeout;
use crate::core::flow::FlowReturn;
use crate::core::frames::{Segment, SourceId, TaggedItem};

pub(crate) enum QueueEntry<T> {
    Data(TaggedItem<T>),
    Segment(Segment),
}

/// Outcome of one worker visit.
pub(crate) enum Visit<T> {
    /// Producer is gone or the worker is stopping.
    Skip,
    /// First visit; the worker owes downstream a `PadAdded`.
    Announce,
    Entry(QueueEntry<T>),
    /// Queue drained after EOS; the worker owes downstream a `SourceEos`.
    Eos,
    /// Already forwarded its EOS, nothing more will come.
    Drained,
    TimedOut,
}

/// Flags observed when a producer is closed for removal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClosedState {
    pub eos_forwarded: bool,
}

struct QueueState<T> {
    entries: VecDeque<QueueEntry<T>>,
    /// Time of the last pop, or of creation.
    last_activity: Instant,
    eos_received: bool,
    eos_forwarded: bool,
    announced: bool,
    /// The worker popped something and has not finished emitting it.
    in_flight: bool,
    flushing: bool,
    closed: bool,
}

pub(crate) struct ProducerQueue<T> {
    id: SourceId,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    cond: Condvar,
}

impl<T> ProducerQueue<T> {
    pub fn new(id: SourceId, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            state: Mutex::new(QueueState {
                entries: VecDeque::with_capacity(capacity),
                last_activity: Instant::now(),
                eos_received: false,
                eos_forwarded: false,
                announced: false,
                in_flight: false,
                flushing: false,
                closed: false,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Block while the queue is full, then append.
    ///
    /// Fails with `NotLinked` once the producer was removed, `Flushing` while
    /// the worker is stopped and `Eos` after [`ProducerQueue::mark_eos`].
    pub fn push(&self, entry: QueueEntry<T>) -> Result<(), FlowReturn> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(FlowReturn::NotLinked);
            }
            if state.flushing {
                return Err(FlowReturn::Flushing);
            }
            if state.eos_received {
                return Err(FlowReturn::Eos);
            }
            if state.entries.len() < self.capacity {
                break;
            }
            tracing::trace!("[funnel] {}: queue full, waiting", self.id.pad_name());
            self.cond.wait(&mut state);
        }
        state.entries.push_back(entry);
        self.cond.notify_all();
        Ok(())
    }

    /// Returns `false` if EOS was already marked.
    pub fn mark_eos(&self) -> bool {
        let mut state = self.state.lock();
        if state.eos_received {
            return false;
        }
        state.eos_received = true;
        self.cond.notify_all();
        true
    }

    pub fn eos_forwarded(&self) -> bool {
        self.state.lock().eos_forwarded
    }

    /// Worker side: take the next thing to do for this producer, waiting up
    /// to `timeout` measured from the producer's last activity.
    pub fn visit(&self, timeout: WaitTimeout, shutdown: &AtomicBool) -> Visit<T> {
        let mut state = self.state.lock();
        loop {
            if state.closed || state.flushing || shutdown.load(Ordering::Acquire) {
                return Visit::Skip;
            }
            if !state.announced {
                state.announced = true;
                state.in_flight = true;
                return Visit::Announce;
            }
            if let Some(entry) = state.entries.pop_front() {
                state.last_activity = Instant::now();
                state.in_flight = true;
                self.cond.notify_all();
                return Visit::Entry(entry);
            }
            if state.eos_received {
                if state.eos_forwarded {
                    return Visit::Drained;
                }
                state.in_flight = true;
                return Visit::Eos;
            }
            match timeout.deadline(state.last_activity) {
                None => self.cond.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Visit::TimedOut;
                    }
                    self.cond.wait_until(&mut state, deadline);
                }
            }
        }
    }

    /// Worker side: emission of whatever the last visit returned finished.
    pub fn finish_visit(&self, eos_forwarded: bool) {
        let mut state = self.state.lock();
        state.in_flight = false;
        if eos_forwarded {
            state.eos_forwarded = true;
        }
        self.cond.notify_all();
    }

    /// Stop accepting items, drop what is queued and wait until the worker
    /// has finished emitting anything it already took from this queue.
    pub fn close(&self) -> ClosedState {
        let mut state = self.state.lock();
        state.closed = true;
        let dropped = state.entries.len();
        state.entries.clear();
        self.cond.notify_all();
        while state.in_flight {
            self.cond.wait(&mut state);
        }
        if dropped > 0 {
            tracing::debug!(
                "[funnel] {}: dropped {} queued items on removal",
                self.id.pad_name(),
                dropped
            );
        }
        ClosedState {
            eos_forwarded: state.eos_forwarded,
        }
    }

    /// While flushing, pushes fail and queued items are discarded.
    pub fn set_flushing(&self, flushing: bool) {
        let mut state = self.state.lock();
        state.flushing = flushing;
        if flushing {
            state.entries.clear();
        } else {
            state.last_activity = Instant::now();
        }
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn data(value: u32) -> QueueEntry<u32> {
        QueueEntry::Data(TaggedItem::tagged(SourceId(0), 0, value))
    }

    fn take(queue: &ProducerQueue<u32>, shutdown: &AtomicBool) -> Option<u32> {
        match queue.visit(WaitTimeout::from_millis(5), shutdown) {
            Visit::Entry(QueueEntry::Data(item)) => {
                queue.finish_visit(false);
                Some(item.payload)
            }
            Visit::Announce => {
                queue.finish_visit(false);
                take(queue, shutdown)
            }
            _ => None,
        }
    }

    #[test]
    fn test_first_visit_announces() {
        let queue = ProducerQueue::<u32>::new(SourceId(0), 2);
        let shutdown = AtomicBool::new(false);
        assert!(matches!(
            queue.visit(WaitTimeout::from_millis(1), &shutdown),
            Visit::Announce
        ));
        queue.finish_visit(false);
        assert!(matches!(
            queue.visit(WaitTimeout::from_millis(1), &shutdown),
            Visit::TimedOut
        ));
    }

    #[test]
    fn test_push_blocks_until_slot_frees() {
        let queue = Arc::new(ProducerQueue::new(SourceId(0), 1));
        let shutdown = AtomicBool::new(false);
        queue.push(data(1)).unwrap();

        let pusher = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(data(2)))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!pusher.is_finished());
        assert_eq!(queue.len(), 1);

        assert_eq!(take(&queue, &shutdown), Some(1));
        assert!(pusher.join().unwrap().is_ok());
        assert_eq!(take(&queue, &shutdown), Some(2));
    }

    #[test]
    fn test_eos_after_drain() {
        let queue = ProducerQueue::new(SourceId(0), 2);
        let shutdown = AtomicBool::new(false);
        queue.push(data(1)).unwrap();
        assert!(queue.mark_eos());
        assert!(!queue.mark_eos());
        assert_eq!(queue.push(data(2)), Err(FlowReturn::Eos));

        assert_eq!(take(&queue, &shutdown), Some(1));
        assert!(matches!(
            queue.visit(WaitTimeout::Unbounded, &shutdown),
            Visit::Eos
        ));
        queue.finish_visit(true);
        assert!(queue.eos_forwarded());
        assert!(matches!(
            queue.visit(WaitTimeout::Unbounded, &shutdown),
            Visit::Drained
        ));
    }

    #[test]
    fn test_close_unblocks_pusher() {
        let queue = Arc::new(ProducerQueue::new(SourceId(0), 1));
        queue.push(data(1)).unwrap();
        let pusher = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(data(2)))
        };
        thread::sleep(Duration::from_millis(10));
        let closed = queue.close();
        assert!(!closed.eos_forwarded);
        assert_eq!(pusher.join().unwrap(), Err(FlowReturn::NotLinked));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_flushing_rejects_and_clears() {
        let queue = ProducerQueue::new(SourceId(0), 2);
        queue.push(data(1)).unwrap();
        queue.set_flushing(true);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.push(data(2)), Err(FlowReturn::Flushing));
        queue.set_flushing(false);
        assert!(queue.push(data(3)).is_ok());
    }
}
