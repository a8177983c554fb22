// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod router;
mod stage;

pub use router::{InferenceRouter, Route, Routed};
pub use stage::SkipFrameStage;
