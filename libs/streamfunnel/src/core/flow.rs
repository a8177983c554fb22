// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Downstream flow status.
//!
//! Every emission onto an ordered output reports a [`FlowReturn`]. The
//! fan-in scheduler records the most recent one and hands it back from
//! `push()`, so producers learn about downstream trouble without the
//! scheduler ever failing on their behalf.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::core::error::{Result, StreamError};

/// Result of handing one event to a downstream sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowReturn {
    #[default]
    Ok,
    /// Nothing is connected to receive the event.
    NotLinked,
    /// Downstream is flushing and dropped the event.
    Flushing,
    /// Downstream already reached end-of-stream.
    Eos,
    /// Downstream cannot handle the event for this source.
    NotNegotiated,
    /// Fatal downstream error.
    Error,
}

impl FlowReturn {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == FlowReturn::Ok
    }

    #[inline]
    pub fn is_failure(self) -> bool {
        !self.is_ok()
    }

    /// A worker stops for good on a fatal status. Any other failure means
    /// downstream dropped the event and emission carries on.
    #[inline]
    pub fn is_fatal(self) -> bool {
        matches!(self, FlowReturn::Error | FlowReturn::NotNegotiated)
    }

    pub fn name(self) -> &'static str {
        match self {
            FlowReturn::Ok => "ok",
            FlowReturn::NotLinked => "not-linked",
            FlowReturn::Flushing => "flushing",
            FlowReturn::Eos => "eos",
            FlowReturn::NotNegotiated => "not-negotiated",
            FlowReturn::Error => "error",
        }
    }

    /// Convert into a `Result`, mapping every non-ok status to
    /// [`StreamError::DownstreamFailure`].
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(StreamError::DownstreamFailure(self))
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            FlowReturn::Ok => 0,
            FlowReturn::NotLinked => 1,
            FlowReturn::Flushing => 2,
            FlowReturn::Eos => 3,
            FlowReturn::NotNegotiated => 4,
            FlowReturn::Error => 5,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => FlowReturn::Ok,
            1 => FlowReturn::NotLinked,
            2 => FlowReturn::Flushing,
            3 => FlowReturn::Eos,
            4 => FlowReturn::NotNegotiated,
            _ => FlowReturn::Error,
        }
    }
}

impl fmt::Display for FlowReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lock-free cell holding the last observed [`FlowReturn`].
#[derive(Debug, Default)]
pub struct FlowCell(AtomicU8);

impl FlowCell {
    #[inline]
    pub fn get(&self) -> FlowReturn {
        FlowReturn::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, flow: FlowReturn) {
        self.0.store(flow.to_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        assert!(FlowReturn::Ok.into_result().is_ok());
        match FlowReturn::Flushing.into_result() {
            Err(StreamError::DownstreamFailure(flow)) => assert_eq!(flow, FlowReturn::Flushing),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_flow_cell_tracks_last_value() {
        let cell = FlowCell::default();
        assert_eq!(cell.get(), FlowReturn::Ok);
        cell.set(FlowReturn::Eos);
        assert_eq!(cell.get(), FlowReturn::Eos);
        cell.set(FlowReturn::Ok);
        assert_eq!(cell.get(), FlowReturn::Ok);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(FlowReturn::Error.is_fatal());
        assert!(FlowReturn::NotNegotiated.is_fatal());
        assert!(!FlowReturn::Flushing.is_fatal());
        assert!(!FlowReturn::Eos.is_fatal());
    }
}
