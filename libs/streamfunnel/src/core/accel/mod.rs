// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Contract with the shared hardware stage.
//!
//! The accelerator itself lives outside this crate. It is seen only through
//! [`BatchProcessor`]: a capability query and a K-in, K-out batch call.

mod batch_stage;

pub use batch_stage::BatchStage;

use crate::core::frames::{TaggedItem, VideoInfo};
use crate::core::Result;

/// What the accelerator accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorCaps {
    pub video: VideoInfo,
    /// Largest batch accepted by one `process_batch` call.
    pub max_batch: usize,
}

pub trait BatchProcessor<T>: Send {
    fn capabilities(&self) -> AcceleratorCaps;

    /// Process up to `max_batch` items. Returns one item per input, tags
    /// preserved.
    fn process_batch(&mut self, batch: Vec<TaggedItem<T>>) -> Result<Vec<TaggedItem<T>>>;
}
