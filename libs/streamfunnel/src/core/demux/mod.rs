// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod source_demuxer;

pub use source_demuxer::{SourceDemuxer, SourceSinkFactory};
