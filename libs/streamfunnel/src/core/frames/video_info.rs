// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// Rational number, used for framerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub num: u32,
    pub den: u32,
}

impl Fraction {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self { num: 0, den: 1 }
    }
}

/// Negotiated stream capabilities of one producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Pixel format name, e.g. `"NV12"`.
    pub format: String,
    pub framerate: Fraction,
    /// Real-time source (camera, network feed) rather than a file.
    #[serde(default)]
    pub is_live: bool,
}

impl VideoInfo {
    pub fn new(width: u32, height: u32, format: impl Into<String>, framerate: Fraction) -> Self {
        Self {
            width,
            height,
            format: format.into(),
            framerate,
            is_live: false,
        }
    }

    pub fn live(mut self, is_live: bool) -> Self {
        self.is_live = is_live;
        self
    }

    /// Whether two producers can share one merged stream. Liveness does not
    /// take part in the comparison.
    pub fn matches(&self, other: &VideoInfo) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.format == other.format
            && self.framerate == other.framerate
    }

    /// Human readable list of the fields that differ, for error messages.
    pub fn describe_mismatch(&self, other: &VideoInfo) -> String {
        let mut diffs = Vec::new();
        if self.width != other.width || self.height != other.height {
            diffs.push(format!(
                "resolution {}x{} != {}x{}",
                other.width, other.height, self.width, self.height
            ));
        }
        if self.format != other.format {
            diffs.push(format!("format {} != {}", other.format, self.format));
        }
        if self.framerate != other.framerate {
            diffs.push(format!(
                "framerate {}/{} != {}/{}",
                other.framerate.num, other.framerate.den, self.framerate.num, self.framerate.den
            ));
        }
        diffs.join(", ")
    }
}
