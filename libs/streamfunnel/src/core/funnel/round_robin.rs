// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use super::producer::ProducerHandle;
use super::producer_queue::ProducerQueue;
use super::wait_timeout::WaitTimeout;
use super::worker;
use crate::core::config::FunnelConfig;
use crate::core::events::StreamEvent;
use crate::core::flow::{FlowCell, FlowReturn};
use crate::core::frames::{SourceId, VideoInfo};
use crate::core::output::{EventSink, OutputPort};
use crate::core::{Result, StreamError};

pub(super) struct Registry<T> {
    pub producers: BTreeMap<SourceId, Arc<ProducerQueue<T>>>,
    pub next_index: u32,
}

#[derive(Debug, Default)]
pub(super) struct TimeoutState {
    pub user_override: Option<Duration>,
    pub derived: WaitTimeout,
}

impl TimeoutState {
    fn effective(&self) -> WaitTimeout {
        match self.user_override {
            Some(timeout) => WaitTimeout::Bounded(timeout),
            None => self.derived,
        }
    }
}

/// State shared between the funnel, its producer handles and the worker.
///
/// Lock order is registry, then a producer queue. The output lock is never
/// taken while holding either.
pub(crate) struct FunnelShared<T> {
    pub(super) registry: Mutex<Registry<T>>,
    pub(super) output: OutputPort<T>,
    pub(super) last_flow: FlowCell,
    pub(super) shutdown: AtomicBool,
    pub(super) running: AtomicBool,
    pub(super) timeout: Mutex<TimeoutState>,
    pub(super) negotiated: Mutex<Option<VideoInfo>>,
    pub(super) queue_size: usize,
    pub(super) terminal_eos_sent: AtomicBool,
}

impl<T> FunnelShared<T> {
    pub(super) fn snapshot(&self) -> Vec<Arc<ProducerQueue<T>>> {
        self.registry.lock().producers.values().cloned().collect()
    }

    pub(super) fn wait_timeout(&self) -> WaitTimeout {
        self.timeout.lock().effective()
    }

    pub(super) fn emit(&self, event: StreamEvent<T>) -> FlowReturn {
        let mut output = self.output.lock();
        self.emit_locked(&mut output, event)
    }

    /// Emit while already holding the output lock; records the status for
    /// subsequent pushes.
    pub(super) fn emit_locked(
        &self,
        output: &mut MutexGuard<'_, Box<dyn EventSink<T>>>,
        event: StreamEvent<T>,
    ) -> FlowReturn {
        let kind = event.name();
        let flow = output.emit(event);
        self.last_flow.set(flow);
        if flow.is_failure() {
            tracing::warn!("[funnel] Downstream returned {} for {}", flow, kind);
        }
        flow
    }

    pub(super) fn all_eos_forwarded(&self) -> bool {
        let producers = self.snapshot();
        !producers.is_empty() && producers.iter().all(|queue| queue.eos_forwarded())
    }

    /// Returns `true` once the terminal EOS went out successfully.
    pub(super) fn emit_terminal_eos(&self) -> bool {
        let mut output = self.output.lock();
        if self.terminal_eos_sent.load(Ordering::Acquire) {
            return true;
        }
        let flow = self.emit_locked(&mut output, StreamEvent::Eos);
        if flow.is_ok() {
            self.terminal_eos_sent.store(true, Ordering::Release);
        }
        flow.is_ok()
    }

    pub(super) fn negotiate(&self, id: SourceId, info: &VideoInfo) -> Result<()> {
        let mut negotiated = self.negotiated.lock();
        match negotiated.as_ref() {
            Some(reference) if !reference.matches(info) => {
                let detail = reference.describe_mismatch(info);
                tracing::error!("[funnel] {}: caps mismatch: {}", id.pad_name(), detail);
                return Err(StreamError::CapabilityMismatch(format!(
                    "{}: {}",
                    id.pad_name(),
                    detail
                )));
            }
            Some(_) => {}
            None => {
                tracing::info!(
                    "[funnel] {}: reference caps {}x{} {} @ {}/{}",
                    id.pad_name(),
                    info.width,
                    info.height,
                    info.format,
                    info.framerate.num,
                    info.framerate.den
                );
                *negotiated = Some(info.clone());
            }
        }

        if info.is_live {
            let mut timeout = self.timeout.lock();
            if timeout.user_override.is_none() && timeout.derived == WaitTimeout::Unbounded {
                if let Some(reference) = negotiated.as_ref() {
                    timeout.derived = WaitTimeout::from_framerate(reference.framerate);
                    tracing::info!(
                        "[funnel] Live source {}, wait timeout {:?}",
                        id.pad_name(),
                        timeout.derived.as_duration()
                    );
                }
            }
        }
        Ok(())
    }
}

/// Fan-in round-robin scheduler.
///
/// ```ignore
/// let (sink, rx) = ChannelSink::unbounded();
/// let funnel = RoundRobinFunnel::new(FunnelConfig::default(), Box::new(sink))?;
/// let cam0 = funnel.register_producer(None)?;
/// funnel.start()?;
/// cam0.push(frame);
/// cam0.mark_eos();
/// ```
pub struct RoundRobinFunnel<T: Send + 'static> {
    shared: Arc<FunnelShared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> RoundRobinFunnel<T> {
    pub fn new(config: FunnelConfig, sink: Box<dyn EventSink<T>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(FunnelShared {
                registry: Mutex::new(Registry {
                    producers: BTreeMap::new(),
                    next_index: 0,
                }),
                output: OutputPort::new("funnel", sink),
                last_flow: FlowCell::default(),
                shutdown: AtomicBool::new(false),
                running: AtomicBool::new(false),
                timeout: Mutex::new(TimeoutState {
                    user_override: config.wait_timeout_override(),
                    derived: WaitTimeout::Unbounded,
                }),
                negotiated: Mutex::new(None),
                queue_size: config.queue_size,
                terminal_eos_sent: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Spawn the worker thread. A funnel whose stream already finished with
    /// the terminal EOS cannot be started again.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Err(StreamError::Runtime(
                "Funnel worker is already running".to_string(),
            ));
        }
        if self.shared.terminal_eos_sent.load(Ordering::Acquire) {
            self.shared.running.store(false, Ordering::Release);
            return Err(StreamError::Runtime(
                "Funnel stream already finished".to_string(),
            ));
        }
        if let Some(previous) = worker.take() {
            if previous.join().is_err() {
                tracing::error!("[funnel] Previous worker panicked");
            }
        }

        self.shared.shutdown.store(false, Ordering::Release);
        for queue in self.shared.snapshot() {
            queue.set_flushing(false);
        }

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("streamfunnel-funnel".to_string())
            .spawn(move || worker::run(shared))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                StreamError::Runtime(format!("Failed to spawn thread: {}", e))
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stop the worker and discard everything still queued. Blocked
    /// producers return `Flushing`.
    pub fn stop(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        for queue in self.shared.snapshot() {
            queue.set_flushing(true);
        }
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::error!("[funnel] Worker panicked");
            }
        }
        self.shared.running.store(false, Ordering::Release);
    }

    /// Wait for the worker to finish on its own after the terminal EOS.
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("[funnel] Worker panicked");
            }
        }
    }

    /// Add a producer. A requested id is used when it is not below the
    /// internal counter; otherwise the next free id is assigned.
    pub fn register_producer(&self, requested: Option<u32>) -> Result<ProducerHandle<T>> {
        let mut registry = self.shared.registry.lock();
        if registry.producers.len() >= FunnelConfig::MAX_PRODUCERS {
            return Err(StreamError::ResourceExhausted(format!(
                "Producer limit of {} reached",
                FunnelConfig::MAX_PRODUCERS
            )));
        }

        let index = match requested {
            Some(requested) if requested >= registry.next_index => requested,
            Some(requested) => {
                tracing::debug!(
                    "[funnel] Requested id {} already used, assigning {}",
                    requested,
                    registry.next_index
                );
                registry.next_index
            }
            None => registry.next_index,
        };
        registry.next_index = index.checked_add(1).ok_or_else(|| {
            StreamError::ResourceExhausted("Producer id space exhausted".to_string())
        })?;

        let id = SourceId(index);
        let queue = Arc::new(ProducerQueue::new(id, self.shared.queue_size));
        registry.producers.insert(id, Arc::clone(&queue));
        tracing::info!(
            "[funnel] {}: registered ({} producers)",
            id.pad_name(),
            registry.producers.len()
        );

        Ok(ProducerHandle {
            id,
            queue,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Remove a producer. A `SourceEos` is emitted first if its EOS has not
    /// been forwarded yet, then `PadRemoved`.
    pub fn unregister_producer(&self, handle: &ProducerHandle<T>) -> Result<()> {
        let registered = self
            .shared
            .registry
            .lock()
            .producers
            .get(&handle.id)
            .is_some_and(|queue| Arc::ptr_eq(queue, &handle.queue));
        if !registered {
            return Err(StreamError::NotFound(format!(
                "{} is not registered",
                handle.id.pad_name()
            )));
        }

        let closed = handle.queue.close();
        {
            let mut output = self.shared.output.lock();
            if !self.shared.terminal_eos_sent.load(Ordering::Acquire) {
                if !closed.eos_forwarded {
                    tracing::debug!("[funnel] {}: sending EOS before removal", handle.id.pad_name());
                    self.shared
                        .emit_locked(&mut output, StreamEvent::SourceEos(handle.id));
                }
                self.shared
                    .emit_locked(&mut output, StreamEvent::PadRemoved(handle.id));
            }
        }

        let remaining = {
            let mut registry = self.shared.registry.lock();
            registry.producers.remove(&handle.id);
            registry.producers.len()
        };
        tracing::info!(
            "[funnel] {}: removed ({} producers)",
            handle.id.pad_name(),
            remaining
        );
        Ok(())
    }

    /// Override the per-producer wait (`None` restores the derived policy).
    /// Only allowed while the worker is stopped.
    pub fn set_wait_timeout(&self, timeout_ms: Option<u64>) -> Result<()> {
        if self.is_running() {
            return Err(StreamError::Configuration(
                "Wait timeout can only be changed while the funnel is stopped".to_string(),
            ));
        }
        if let Some(ms) = timeout_ms {
            crate::core::config::validate_wait_timeout_ms(ms)?;
        }
        self.shared.timeout.lock().user_override = timeout_ms.map(Duration::from_millis);
        Ok(())
    }

    /// Wait currently applied to silent producers.
    pub fn wait_timeout(&self) -> WaitTimeout {
        self.shared.wait_timeout()
    }

    pub fn negotiated_caps(&self) -> Option<VideoInfo> {
        self.shared.negotiated.lock().clone()
    }

    /// Last status returned by downstream.
    pub fn last_flow(&self) -> FlowReturn {
        self.shared.last_flow.get()
    }

    pub fn producer_count(&self) -> usize {
        self.shared.registry.lock().producers.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Drop for RoundRobinFunnel<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
