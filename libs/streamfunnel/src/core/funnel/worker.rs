// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Fan-in worker thread.
//!
//! All downstream emission for data, announcements and per-producer EOS
//! happens here. Removal is the only event emitted from another thread.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::producer_queue::{ProducerQueue, QueueEntry, Visit};
use super::round_robin::FunnelShared;
use super::wait_timeout::WaitTimeout;
use crate::core::events::StreamEvent;
use crate::core::frames::Segment;

/// Sleep between passes that made no progress (no producers, or every
/// producer already past its deadline).
const IDLE_INTERVAL: Duration = Duration::from_millis(1);

pub(super) fn run<T: Send + 'static>(shared: Arc<FunnelShared<T>>) {
    tracing::info!("[funnel] Worker started");

    let mut segment_sent = false;

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            tracing::debug!("[funnel] Shutdown requested, abandoning queued items");
            break;
        }

        let producers = shared.snapshot();
        if producers.is_empty() {
            std::thread::sleep(IDLE_INTERVAL);
            continue;
        }

        let timeout = shared.wait_timeout();
        let mut progressed = false;
        for queue in &producers {
            if shared.shutdown.load(Ordering::Acquire) {
                break;
            }
            progressed |= service_producer(&shared, queue, timeout, &mut segment_sent);
        }

        if shared.shutdown.load(Ordering::Acquire) {
            continue;
        }

        if shared.all_eos_forwarded() && shared.emit_terminal_eos() {
            tracing::info!("[funnel] All producers reached EOS, stream finished");
            break;
        }

        if !progressed {
            std::thread::sleep(IDLE_INTERVAL);
        }
    }

    shared.running.store(false, Ordering::Release);
    tracing::info!("[funnel] Worker stopped");
}

/// One round-robin visit: at most one queued entry (or the pending EOS)
/// is forwarded for this producer.
fn service_producer<T: Send + 'static>(
    shared: &FunnelShared<T>,
    queue: &ProducerQueue<T>,
    timeout: WaitTimeout,
    segment_sent: &mut bool,
) -> bool {
    let id = queue.id();
    loop {
        match queue.visit(timeout, &shared.shutdown) {
            Visit::Announce => {
                tracing::debug!("[funnel] {}: pad added", id.pad_name());
                shared.emit(StreamEvent::PadAdded(id));
                queue.finish_visit(false);
            }
            Visit::Entry(QueueEntry::Data(item)) => {
                tracing::trace!("[funnel] {}: forwarding item", id.pad_name());
                let flow = {
                    let mut output = shared.output.lock();
                    if !*segment_sent {
                        let segment = StreamEvent::Segment(None, Segment::time());
                        *segment_sent = shared.emit_locked(&mut output, segment).is_ok();
                    }
                    shared.emit_locked(&mut output, StreamEvent::Data(item))
                };
                queue.finish_visit(false);
                return flow.is_ok();
            }
            Visit::Entry(QueueEntry::Segment(segment)) => {
                tracing::debug!("[funnel] {}: forwarding segment", id.pad_name());
                let flow = shared.emit(StreamEvent::Segment(Some(id), segment));
                queue.finish_visit(false);
                return flow.is_ok();
            }
            Visit::Eos => {
                let flow = shared.emit(StreamEvent::SourceEos(id));
                queue.finish_visit(flow.is_ok());
                if flow.is_ok() {
                    tracing::info!("[funnel] {}: EOS forwarded", id.pad_name());
                }
                return flow.is_ok();
            }
            Visit::TimedOut => {
                tracing::trace!("[funnel] {}: timeout, skipping", id.pad_name());
                return false;
            }
            Visit::Skip | Visit::Drained => return false,
        }
    }
}
