// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Events carried on an ordered output.
//!
//! Control events travel on the same channel as data so that their position
//! relative to data items survives the trip downstream. There is no side
//! channel for control.

use crate::core::frames::{Segment, SourceId, TaggedItem};

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent<T> {
    /// A data item, tagged with its source (and sequence, after routing).
    Data(TaggedItem<T>),
    /// A producer joined the merged stream.
    PadAdded(SourceId),
    /// A producer left the merged stream.
    PadRemoved(SourceId),
    /// One source finished. Every item it produced precedes this event.
    SourceEos(SourceId),
    /// Segment for one source, or the global segment when `None`.
    Segment(Option<SourceId>, Segment),
    /// Terminal end-of-stream for the whole merged stream.
    Eos,
}

impl<T> StreamEvent<T> {
    /// Source the event belongs to, if any.
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            StreamEvent::Data(item) => item.source_id,
            StreamEvent::PadAdded(id) | StreamEvent::PadRemoved(id) | StreamEvent::SourceEos(id) => {
                Some(*id)
            }
            StreamEvent::Segment(id, _) => *id,
            StreamEvent::Eos => None,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, StreamEvent::Data(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Data(_) => "data",
            StreamEvent::PadAdded(_) => "pad-added",
            StreamEvent::PadRemoved(_) => "pad-removed",
            StreamEvent::SourceEos(_) => "pad-eos",
            StreamEvent::Segment(_, _) => "segment",
            StreamEvent::Eos => "eos",
        }
    }

    pub fn into_data(self) -> Option<TaggedItem<T>> {
        match self {
            StreamEvent::Data(item) => Some(item),
            _ => None,
        }
    }
}
