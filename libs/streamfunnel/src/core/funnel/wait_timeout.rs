// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::{Duration, Instant};

use crate::core::frames::Fraction;

/// How long the worker waits on an empty producer before moving on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitTimeout {
    /// Wait until the producer delivers, reaches EOS, or is removed.
    #[default]
    Unbounded,
    Bounded(Duration),
}

impl WaitTimeout {
    /// One frame interval plus a 10% margin, in whole milliseconds.
    pub fn from_framerate(framerate: Fraction) -> Self {
        if framerate.num == 0 || framerate.den == 0 {
            tracing::warn!(
                "[funnel] framerate {}/{} has no frame interval, wait stays unbounded",
                framerate.num,
                framerate.den
            );
            return WaitTimeout::Unbounded;
        }
        let frame_ms = (u64::from(framerate.den) * 1000) / u64::from(framerate.num);
        let timeout_ms = (frame_ms + frame_ms / 10).max(1);
        WaitTimeout::Bounded(Duration::from_millis(timeout_ms))
    }

    pub fn from_millis(ms: u64) -> Self {
        WaitTimeout::Bounded(Duration::from_millis(ms))
    }

    /// Deadline for a producer whose last activity was at `since`.
    pub fn deadline(&self, since: Instant) -> Option<Instant> {
        match self {
            WaitTimeout::Unbounded => None,
            WaitTimeout::Bounded(timeout) => Some(since + *timeout),
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            WaitTimeout::Unbounded => None,
            WaitTimeout::Bounded(timeout) => Some(*timeout),
        }
    }
}
