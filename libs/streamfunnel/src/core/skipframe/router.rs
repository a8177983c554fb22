// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Skip-frame routing between the funnel output and the accelerator.
//!
//! The merged stream arrives in round-robin batches (one item per source,
//! ascending source id). Only one batch in every `infer_interval` is sent
//! through the accelerator; the rest bypass it. Every item is stamped with
//! its per-source sequence so the reorderer can put both paths back
//! together.

use std::collections::BTreeMap;

use crate::core::config::SkipFrameConfig;
use crate::core::frames::{SourceId, TaggedItem};
use crate::core::{Result, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the accelerator, back on the reorderer's processed input.
    Processed,
    /// Straight to the reorderer's pass-through input.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Routed<T> {
    pub route: Route,
    pub item: TaggedItem<T>,
}

#[derive(Debug, Default)]
struct SourceRouting {
    next_sequence: u64,
    /// The source missed the last inference batch and gets its next item
    /// processed regardless.
    inference_pending: bool,
}

#[derive(Debug)]
pub struct InferenceRouter {
    infer_interval: u32,
    prev_source: Option<SourceId>,
    batch_id: Option<u32>,
    sources: BTreeMap<SourceId, SourceRouting>,
}

impl InferenceRouter {
    pub fn new(config: SkipFrameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            infer_interval: config.infer_interval,
            prev_source: None,
            batch_id: None,
            sources: BTreeMap::new(),
        })
    }

    pub fn on_stream_start(&mut self, source: SourceId) {
        if self.sources.insert(source, SourceRouting::default()).is_some() {
            tracing::warn!("[skipframe] source {}: restarted, sequence reset", source);
        }
    }

    pub fn on_source_eos(&mut self, source: SourceId) {
        if self.sources.remove(&source).is_none() {
            tracing::debug!("[skipframe] source {}: EOS for unknown source", source);
        }
    }

    /// Stamp the item's sequence and pick its path.
    pub fn route<T>(&mut self, mut item: TaggedItem<T>) -> Result<Routed<T>> {
        let source = item.source_id.ok_or_else(|| {
            StreamError::ProtocolViolation("item carries no source id".to_string())
        })?;
        if !self.sources.contains_key(&source) {
            return Err(StreamError::ProtocolViolation(format!(
                "item for unknown source {}",
                source
            )));
        }

        if self.prev_source.is_none_or(|prev| source <= prev) {
            self.start_batch();
        }
        self.prev_source = Some(source);
        let inference_batch = self.batch_id == Some(0);

        let state = self.sources.get_mut(&source).ok_or_else(|| {
            StreamError::ProtocolViolation(format!("item for unknown source {}", source))
        })?;
        item.sequence = state.next_sequence;
        state.next_sequence += 1;

        let route = if inference_batch || state.inference_pending {
            state.inference_pending = false;
            Route::Processed
        } else {
            Route::Passthrough
        };
        tracing::trace!(
            "[skipframe] source {}: item {} -> {:?}",
            source,
            item.sequence,
            route
        );
        Ok(Routed { route, item })
    }

    fn start_batch(&mut self) {
        let batch_id = self
            .batch_id
            .map_or(0, |batch_id| (batch_id + 1) % self.infer_interval);
        self.batch_id = Some(batch_id);
        if batch_id == 0 {
            for state in self.sources.values_mut() {
                state.inference_pending = true;
            }
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}
