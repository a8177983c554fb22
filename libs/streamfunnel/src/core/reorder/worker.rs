// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Fan-out worker thread.
//!
//! Emission hands the event to downstream. A non-fatal refusal (flushing,
//! EOS, not linked) means downstream dropped it: the sequence stays
//! consumed, the source's scan ends for this pass and the worker carries
//! on. Only a fatal status stops the worker.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::reorderer::ReorderShared;
use crate::core::events::StreamEvent;
use crate::core::flow::FlowReturn;

/// Pause between rescans while processed items are buffered.
const RESCAN_INTERVAL: Duration = Duration::from_millis(1);

enum Pass {
    Progressed,
    /// Nothing emitted. `rescan` is set while processed items are buffered.
    Idle { rescan: bool },
    Finished,
    Aborted(FlowReturn),
}

pub(super) fn run<T: Send + 'static>(shared: Arc<ReorderShared<T>>) {
    tracing::info!("[reorder] Worker started");

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            tracing::debug!("[reorder] Shutdown requested");
            break;
        }

        let seen = *shared.generation.lock();
        match run_pass(&shared) {
            Pass::Progressed => continue,
            Pass::Finished => {
                tracing::info!("[reorder] All sources finished, stream finished");
                break;
            }
            Pass::Aborted(flow) => {
                tracing::error!("[reorder] Downstream returned {}, stopping", flow);
                *shared.aborted.lock() = Some(flow);
                break;
            }
            Pass::Idle { rescan } => {
                let mut generation = shared.generation.lock();
                while *generation == seen && !shared.shutdown.load(Ordering::Acquire) {
                    if rescan {
                        shared.wake.wait_for(&mut generation, RESCAN_INTERVAL);
                        break;
                    }
                    shared.wake.wait(&mut generation);
                }
            }
        }
    }

    shared.running.store(false, Ordering::Release);
    tracing::info!("[reorder] Worker stopped");
}

/// Visit every source once, emitting each one's in-order run.
fn run_pass<T: Send + 'static>(shared: &ReorderShared<T>) -> Pass {
    let mut progressed = false;

    for (id, queues) in shared.snapshot() {
        loop {
            let next = queues.lock().pop_ready();
            let Some(item) = next else { break };
            let sequence = item.sequence;
            tracing::trace!("[reorder] source {}: emitting {}", id, sequence);
            let flow = shared.output.emit(StreamEvent::Data(item));
            if flow.is_fatal() {
                return Pass::Aborted(flow);
            }
            progressed = true;
            if flow.is_failure() {
                tracing::debug!(
                    "[reorder] source {}: item {} dropped downstream ({}), next source",
                    id,
                    sequence,
                    flow
                );
                break;
            }
        }

        let drained = {
            let mut sources = shared.sources.lock();
            let current = sources
                .get(&id)
                .is_some_and(|registered| Arc::ptr_eq(registered, &queues));
            let drained = current && queues.lock().is_drained();
            if drained {
                sources.remove(&id);
            }
            drained
        };
        if drained {
            tracing::info!("[reorder] source {}: drained, forwarding EOS", id);
            let flow = shared.output.emit(StreamEvent::SourceEos(id));
            if flow.is_fatal() {
                return Pass::Aborted(flow);
            }
            progressed = true;
        }
    }

    if shared.end_of_stream.load(Ordering::Acquire) && shared.sources.lock().is_empty() {
        let flow = shared.output.emit(StreamEvent::Eos);
        if flow.is_fatal() {
            return Pass::Aborted(flow);
        }
        return Pass::Finished;
    }

    if progressed {
        Pass::Progressed
    } else {
        Pass::Idle {
            rescan: shared.processed_pending() > 0,
        }
    }
}
