// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Quality tiers and per-kind budgets
//!
//! Tiers are ordered least to most aggressive and tried one at a time.
//! Later tiers are expected to produce smaller output for the same input,
//! though nothing enforces it at runtime.

use crate::error::Result;
use crate::kind::MediaKind;
use crate::source::Budget;
use serde::{Deserialize, Serialize};

/// 1 MiB
pub const DEFAULT_BUDGET_BYTES: u64 = 1024 * 1024;

/// Output format for an image tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierFormat {
    /// Keep the source format; skipped when the source is not re-encodable
    Source,
    /// Canonical lossy target
    Jpeg,
}

/// One image encoding attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageTier {
    /// Longest edge in pixels
    pub max_dimension: u32,

    /// Encoder quality in `(0, 1]`
    pub quality: f32,

    /// Target format
    pub format: TierFormat,
}

impl ImageTier {
    /// JPEG tier
    pub const fn jpeg(max_dimension: u32, quality: f32) -> Self {
        ImageTier {
            max_dimension,
            quality,
            format: TierFormat::Jpeg,
        }
    }

    /// Same-format tier
    pub const fn source(max_dimension: u32, quality: f32) -> Self {
        ImageTier {
            max_dimension,
            quality,
            format: TierFormat::Source,
        }
    }

    /// Quality as the 1..=100 scale used by the JPEG encoder
    pub fn quality_percent(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Image compression policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePolicy {
    /// Client-side byte budget for images
    pub max_bytes: u64,

    /// Attempts in order; the last one is the floor
    pub tiers: Vec<ImageTier>,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        ImagePolicy {
            max_bytes: DEFAULT_BUDGET_BYTES,
            tiers: vec![
                ImageTier::source(1920, 0.8),
                ImageTier::jpeg(1920, 0.8),
                ImageTier::jpeg(1280, 0.6),
                ImageTier::jpeg(800, 0.4),
            ],
        }
    }
}

/// One video transcode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTier {
    /// Longest edge in pixels
    pub max_dimension: u32,

    /// Target video bitrate in bits per second
    pub bitrate: u32,
}

impl VideoTier {
    /// Create a tier
    pub const fn new(max_dimension: u32, bitrate: u32) -> Self {
        VideoTier {
            max_dimension,
            bitrate,
        }
    }
}

impl std::fmt::Display for VideoTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}p@{}kbps", self.max_dimension, self.bitrate / 1000)
    }
}

/// Video compression policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPolicy {
    /// Client-side byte budget for videos
    pub max_bytes: u64,

    /// Transcode attempts, high to low
    pub tiers: Vec<VideoTier>,

    /// Output frame rate
    pub frame_rate: u32,

    /// Longest edge of a fallback still frame
    pub frame_max_dimension: u32,

    /// JPEG quality of the captured still frame
    pub frame_quality: f32,
}

impl Default for VideoPolicy {
    fn default() -> Self {
        VideoPolicy {
            max_bytes: DEFAULT_BUDGET_BYTES,
            tiers: vec![
                VideoTier::new(720, 1_000_000),
                VideoTier::new(480, 500_000),
                VideoTier::new(360, 250_000),
                VideoTier::new(240, 125_000),
            ],
            frame_rate: 15,
            frame_max_dimension: 720,
            frame_quality: 0.8,
        }
    }
}

/// Budgets and tiers for both kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionPolicy {
    /// Image settings
    pub image: ImagePolicy,

    /// Video settings
    pub video: VideoPolicy,
}

impl CompressionPolicy {
    /// Byte budget configured for a media kind
    pub fn budget_for(&self, kind: MediaKind) -> Result<Budget> {
        match kind {
            MediaKind::Image => Budget::new(self.image.max_bytes),
            MediaKind::Video => Budget::new(self.video.max_bytes),
        }
    }
}
