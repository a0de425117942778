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

//! Image compressor
//!
//! Re-encodes an image through the configured tiers until one fits the
//! budget. The source is decoded once; each tier resizes (never upscaling)
//! and encodes from that decoded image on a blocking thread.
//!
//! With the default policy the attempts are:
//!
//! 1. same format (JPEG, PNG or WebP sources only), 1920px, quality 0.8
//! 2. JPEG, 1920px, quality 0.8
//! 3. JPEG, 1280px, quality 0.6
//! 4. JPEG, 800px, quality 0.4, returned unconditionally
//!
//! A decode or encode failure is fatal and surfaces as
//! [`MediaError::Compression`]; images get no cross-strategy retry.

use crate::error::{MediaError, Result};
use crate::geometry::fit_within;
use crate::kind::RasterFormat;
use crate::policy::{ImagePolicy, ImageTier, TierFormat};
use crate::progress::Progress;
use crate::source::{Budget, MediaFile};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, instrument, warn};

/// A concrete encode: tier settings resolved against the source format
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageAttempt {
    /// Index of the tier in the policy
    pub tier: usize,

    /// Output format
    pub format: RasterFormat,

    /// Longest edge in pixels
    pub max_dimension: u32,

    /// Encoder quality, 1..=100
    pub quality: u8,
}

/// Result of running the tier list
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    /// First attempt whose output met the budget
    Accepted {
        /// Encoded bytes
        data: Vec<u8>,
        /// The accepted attempt
        attempt: ImageAttempt,
    },

    /// No attempt met the budget; `floor` is the last (most aggressive) output
    Exhausted {
        /// Encoded bytes of the final attempt
        floor: Vec<u8>,
        /// The final attempt
        attempt: ImageAttempt,
    },
}

/// Tiered image compressor
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    policy: ImagePolicy,
}

impl ImageCompressor {
    /// Create a compressor for a policy
    pub fn new(policy: ImagePolicy) -> Self {
        ImageCompressor { policy }
    }

    /// Policy in use
    pub fn policy(&self) -> &ImagePolicy {
        &self.policy
    }

    /// Resolve tiers for a source MIME type
    ///
    /// `Source` tiers are dropped when the source is not in the
    /// re-encodable allow-list.
    pub fn plan(&self, source_mime: &str) -> Vec<ImageAttempt> {
        let source = RasterFormat::from_mime(source_mime);
        self.policy
            .tiers
            .iter()
            .enumerate()
            .filter_map(|(index, tier)| {
                let format = match tier.format {
                    TierFormat::Source => source?,
                    TierFormat::Jpeg => RasterFormat::Jpeg,
                };
                Some(resolve(index, tier, format))
            })
            .collect()
    }

    /// Compress `file` toward `budget`
    ///
    /// Always returns a file unless decoding or encoding fails. When no tier
    /// fits, the floor tier's output is returned, or the source itself if the
    /// floor came out larger than the source.
    #[instrument(skip(self, file, progress), fields(name = %file.name, size = file.len(), budget = budget.bytes()))]
    pub async fn compress(
        &self,
        file: &MediaFile,
        budget: Budget,
        progress: &Progress,
    ) -> Result<MediaFile> {
        progress.report(10.0);

        let outcome = self.attempt_tiers(file, budget, progress).await?;
        let output = match outcome {
            ImageOutcome::Accepted { data, attempt } => {
                info!(tier = attempt.tier, size = data.len(), "image tier accepted");
                file.derive(attempt.format.extension(), attempt.format.mime(), data)
            }
            ImageOutcome::Exhausted { floor, attempt } => {
                if floor.len() as u64 >= file.len() {
                    warn!(
                        floor = floor.len(),
                        "most aggressive tier did not shrink the image, keeping source"
                    );
                    file.clone()
                } else {
                    warn!(
                        size = floor.len(),
                        "no image tier met the budget, returning most aggressive output"
                    );
                    file.derive(attempt.format.extension(), attempt.format.mime(), floor)
                }
            }
        };

        progress.complete();
        Ok(output)
    }

    /// Run the tier list and report which attempt won
    ///
    /// Progress moves across `[10, 90]` as attempts finish.
    pub async fn attempt_tiers(
        &self,
        file: &MediaFile,
        budget: Budget,
        progress: &Progress,
    ) -> Result<ImageOutcome> {
        let attempts = self.plan(&file.mime);
        if attempts.is_empty() {
            return Err(MediaError::compression("no image tiers configured"));
        }

        let image = Arc::new(decode(file).await?);
        let (width, height) = image.dimensions();
        debug!(width, height, attempts = attempts.len(), "decoded image");

        let total = attempts.len() as f32;
        let mut floor = None;
        for (done, attempt) in attempts.into_iter().enumerate() {
            let data = encode_blocking(Arc::clone(&image), attempt).await?;
            progress.report(10.0 + 80.0 * (done as f32 + 1.0) / total);

            if budget.admits(data.len() as u64) {
                return Ok(ImageOutcome::Accepted { data, attempt });
            }
            debug!(
                tier = attempt.tier,
                format = ?attempt.format,
                size = data.len(),
                "image tier over budget"
            );
            floor = Some((data, attempt));
        }

        match floor {
            Some((floor, attempt)) => Ok(ImageOutcome::Exhausted { floor, attempt }),
            None => Err(MediaError::compression("no image attempt produced output")),
        }
    }

    /// Encode `file` with a single attempt, outside the tier loop
    pub async fn encode_attempt(&self, file: &MediaFile, attempt: ImageAttempt) -> Result<Vec<u8>> {
        let image = Arc::new(decode(file).await?);
        encode_blocking(image, attempt).await
    }
}

impl Default for ImageCompressor {
    fn default() -> Self {
        Self::new(ImagePolicy::default())
    }
}

fn resolve(tier: usize, settings: &ImageTier, format: RasterFormat) -> ImageAttempt {
    ImageAttempt {
        tier,
        format,
        max_dimension: settings.max_dimension,
        quality: settings.quality_percent(),
    }
}

async fn decode(file: &MediaFile) -> Result<DynamicImage> {
    let data = file.data.clone();
    task::spawn_blocking(move || {
        image::load_from_memory(&data)
            .map_err(|e| MediaError::compression(format!("failed to decode image: {e}")))
    })
    .await
    .map_err(|e| MediaError::compression(format!("image task failed: {e}")))?
}

async fn encode_blocking(image: Arc<DynamicImage>, attempt: ImageAttempt) -> Result<Vec<u8>> {
    task::spawn_blocking(move || encode(&image, attempt))
        .await
        .map_err(|e| MediaError::compression(format!("image task failed: {e}")))?
}

/// Resize and encode one attempt
pub(crate) fn encode(image: &DynamicImage, attempt: ImageAttempt) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = fit_within(width, height, attempt.max_dimension);
    let resized;
    let image = if (target_w, target_h) == (width, height) {
        image
    } else {
        resized = image.resize_exact(target_w, target_h, FilterType::Lanczos3);
        &resized
    };

    let mut output = Vec::new();
    let encoded = match attempt.format {
        RasterFormat::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut output, attempt.quality).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
        }
        RasterFormat::Png => {
            let rgba = image.to_rgba8();
            PngEncoder::new_with_quality(&mut output, CompressionType::Best, PngFilter::Adaptive)
                .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        }
        RasterFormat::WebP => {
            let rgba = image.to_rgba8();
            WebPEncoder::new_lossless(&mut output).write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )
        }
    };
    encoded.map_err(|e| MediaError::compression(format!("{:?} encoding failed: {e}", attempt.format)))?;

    Ok(output)
}
