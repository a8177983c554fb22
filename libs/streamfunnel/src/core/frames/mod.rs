// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod segment;
pub mod tagged_item;
pub mod video_info;

pub use segment::{Segment, SegmentFormat};
pub use tagged_item::{SourceId, TaggedItem};
pub use video_info::{Fraction, VideoInfo};
