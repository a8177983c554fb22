// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::VecDeque;

use crate::core::frames::{SourceId, TaggedItem};

/// Number of items buffered for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingItems {
    pub processed: usize,
    pub passthrough: usize,
}

impl PendingItems {
    pub fn total(&self) -> usize {
        self.processed + self.passthrough
    }
}

/// Unbounded queue pair plus ordering state for one source.
pub(super) struct SourceQueues<T> {
    id: SourceId,
    next_expected: u64,
    processed: VecDeque<TaggedItem<T>>,
    passthrough: VecDeque<TaggedItem<T>>,
    eos_received: bool,
}

impl<T> SourceQueues<T> {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            next_expected: 0,
            processed: VecDeque::new(),
            passthrough: VecDeque::new(),
            eos_received: false,
        }
    }

    pub fn push_processed(&mut self, item: TaggedItem<T>) {
        self.processed.push_back(item);
    }

    pub fn push_passthrough(&mut self, item: TaggedItem<T>) {
        self.passthrough.push_back(item);
    }

    pub fn mark_eos(&mut self) {
        self.eos_received = true;
    }

    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    pub fn pending(&self) -> PendingItems {
        PendingItems {
            processed: self.processed.len(),
            passthrough: self.passthrough.len(),
        }
    }

    /// EOS received and nothing left to emit.
    pub fn is_drained(&self) -> bool {
        self.eos_received && self.processed.is_empty() && self.passthrough.is_empty()
    }

    /// Pop whichever queue head carries the next expected sequence.
    ///
    /// Heads below the expected sequence can never be emitted in order and
    /// would block the source forever, so they are discarded.
    pub fn pop_ready(&mut self) -> Option<TaggedItem<T>> {
        self.discard_stale();
        let expected = self.next_expected;
        let queue = if self.processed.front().is_some_and(|i| i.sequence == expected) {
            &mut self.processed
        } else if self.passthrough.front().is_some_and(|i| i.sequence == expected) {
            &mut self.passthrough
        } else {
            return None;
        };
        let item = queue.pop_front()?;
        self.next_expected += 1;
        Some(item)
    }

    fn discard_stale(&mut self) {
        let expected = self.next_expected;
        for (path, queue) in [
            ("processed", &mut self.processed),
            ("pass-through", &mut self.passthrough),
        ] {
            while let Some(head) = queue.front() {
                if head.sequence >= expected {
                    break;
                }
                tracing::warn!(
                    "[reorder] source {}: dropping {} item {} already past (expecting {})",
                    self.id,
                    path,
                    head.sequence,
                    expected
                );
                queue.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(seq: u64) -> TaggedItem<u64> {
        TaggedItem::tagged(SourceId(7), seq, seq)
    }

    fn drain(queues: &mut SourceQueues<u64>) -> Vec<u64> {
        std::iter::from_fn(|| queues.pop_ready().map(|i| i.sequence)).collect()
    }

    #[test]
    fn test_interleaves_both_paths() {
        let mut queues = SourceQueues::new(SourceId(7));
        queues.push_processed(item(0));
        queues.push_passthrough(item(1));
        queues.push_processed(item(2));
        queues.push_passthrough(item(3));
        queues.push_passthrough(item(4));
        queues.push_processed(item(5));

        assert_eq!(drain(&mut queues), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(queues.next_expected(), 6);
    }

    #[test]
    fn test_gap_stalls_until_filled() {
        let mut queues = SourceQueues::new(SourceId(7));
        queues.push_processed(item(1));
        queues.push_processed(item(2));
        assert!(drain(&mut queues).is_empty());
        assert_eq!(queues.pending(), PendingItems { processed: 2, passthrough: 0 });

        queues.push_passthrough(item(0));
        assert_eq!(drain(&mut queues), vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicate_sequence_is_dropped() {
        let mut queues = SourceQueues::new(SourceId(7));
        queues.push_processed(item(0));
        assert_eq!(drain(&mut queues), vec![0]);

        queues.push_passthrough(item(0));
        queues.push_passthrough(item(1));
        assert_eq!(drain(&mut queues), vec![1]);
    }

    #[test]
    fn test_drained_requires_eos_and_empty() {
        let mut queues = SourceQueues::new(SourceId(7));
        queues.push_processed(item(0));
        queues.mark_eos();
        assert!(!queues.is_drained());
        drain(&mut queues);
        assert!(queues.is_drained());
    }
}
