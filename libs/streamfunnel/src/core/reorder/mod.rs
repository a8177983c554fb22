// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Fan-out sequence reorderer.
//!
//! Results come back from the accelerator on the processed path while
//! skipped frames travel the pass-through path. Both carry
//! `{source, sequence}` tags from one per-source sequence space; the
//! worker re-serializes them so each source is emitted gapless and in
//! order.

mod inputs;
mod reorderer;
mod source_queues;
mod worker;

pub use inputs::{PassthroughInput, ProcessedInput};
pub use reorderer::SequenceReorderer;
pub use source_queues::PendingItems;
