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

//! Video compressor
//!
//! Per call the compressor walks a small state machine:
//!
//! ```text
//! Idle -> Probing(tier 0) -> Accepted | NextTier | EngineFailed
//!         NextTier -> Probing(tier i+1) ... -> Exhausted
//! Exhausted | EngineFailed -> FrameExtraction -> Accepted(image)
//! ```
//!
//! Tiers run one at a time on the shared engine. Any engine error, including
//! a failure to load or to probe the source, abandons the transcode path and
//! falls back to a still frame; only a failing frame extraction surfaces as
//! an error.

use crate::engine::{EngineSlot, TranscodeJob};
use crate::error::{MediaError, Result};
use crate::frame::{FrameExtractor, StagedInput};
use crate::geometry::fit_within_even;
use crate::policy::{VideoPolicy, VideoTier};
use crate::progress::Progress;
use crate::source::{Budget, MediaFile};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of the transcode stage
#[derive(Debug)]
pub enum VideoOutcome {
    /// First tier whose output met the budget
    Accepted {
        /// WebM output
        output: MediaFile,
        /// Index of the accepted tier
        tier: usize,
        /// Tier settings
        settings: VideoTier,
    },

    /// Every tier produced output over budget
    Exhausted,

    /// The engine could not be used or errored mid-run
    EngineFailed(MediaError),
}

/// Tiered video compressor with frame fallback
#[derive(Debug, Clone)]
pub struct VideoCompressor {
    policy: VideoPolicy,
    engine: Arc<EngineSlot>,
    frames: FrameExtractor,
}

impl VideoCompressor {
    /// Create a compressor
    pub fn new(policy: VideoPolicy, engine: Arc<EngineSlot>, frames: FrameExtractor) -> Self {
        VideoCompressor {
            policy,
            engine,
            frames,
        }
    }

    /// Policy in use
    pub fn policy(&self) -> &VideoPolicy {
        &self.policy
    }

    /// Compress `file` toward `budget`
    ///
    /// Returns a WebM video when a tier fits, otherwise a JPEG still frame.
    /// Fails only with [`MediaError::Decode`] (or an IO error while staging)
    /// when the frame fallback cannot read the video either.
    #[instrument(skip(self, file, progress), fields(name = %file.name, size = file.len(), budget = budget.bytes()))]
    pub async fn compress(&self, file: &MediaFile, budget: Budget, progress: &Progress) -> Result<MediaFile> {
        progress.report(5.0);
        if budget.admits(file.len()) {
            progress.complete();
            return Ok(file.clone());
        }

        // Dropped on every return path, removing the staged source and scratch outputs
        let staged = StagedInput::stage(file).await?;

        match self.transcode_tiers(file, &staged, budget, progress).await {
            VideoOutcome::Accepted { output, tier, settings } => {
                info!(tier, %settings, size = output.len(), "video tier accepted");
                progress.complete();
                Ok(output)
            }
            VideoOutcome::Exhausted => {
                warn!("no video tier met the budget, falling back to a still frame");
                self.frames.extract_staged(file, &staged, budget, progress).await
            }
            VideoOutcome::EngineFailed(e) => {
                warn!(error = %e, "transcoding unavailable, falling back to a still frame");
                self.frames.extract_staged(file, &staged, budget, progress).await
            }
        }
    }

    /// Run the tier list against a staged source
    ///
    /// Progress: 10 once the engine is ready, 20 after probing, then tier
    /// `i` of `n` reports over `[20 + 70i/n, 20 + 70(i+1)/n]`.
    pub async fn transcode_tiers(
        &self,
        file: &MediaFile,
        staged: &StagedInput,
        budget: Budget,
        progress: &Progress,
    ) -> VideoOutcome {
        if let Err(e) = self.engine.init().await {
            return VideoOutcome::EngineFailed(e);
        }
        progress.report(10.0);

        let probe = match self.frames.probe(staged.path()).await {
            Ok(p) => p,
            Err(e) => return VideoOutcome::EngineFailed(e),
        };
        progress.report(20.0);

        let tiers = &self.policy.tiers;
        let n = tiers.len() as f32;
        for (i, tier) in tiers.iter().enumerate() {
            let (width, height) = fit_within_even(probe.width, probe.height, tier.max_dimension);
            let job = TranscodeJob {
                input: staged.path().to_path_buf(),
                output: staged.scratch(&format!("tier-{i}.webm")),
                width,
                height,
                bitrate: tier.bitrate,
                frame_rate: self.policy.frame_rate,
                duration_seconds: probe.duration_seconds,
            };
            let tier_progress = progress.span(20.0 + 70.0 * i as f32 / n, 20.0 + 70.0 * (i as f32 + 1.0) / n);

            if let Err(e) = self.engine.transcode(&job, &tier_progress).await {
                return VideoOutcome::EngineFailed(e);
            }
            let data = match tokio::fs::read(&job.output).await {
                Ok(d) => d,
                Err(e) => return VideoOutcome::EngineFailed(MediaError::from(e)),
            };
            // One candidate on disk at a time
            let _ = tokio::fs::remove_file(&job.output).await;

            tier_progress.complete();
            if budget.admits(data.len() as u64) {
                return VideoOutcome::Accepted {
                    output: file.derive("webm", "video/webm", data),
                    tier: i,
                    settings: *tier,
                };
            }
            debug!(tier = i, %tier, size = data.len(), "video tier over budget");
        }

        VideoOutcome::Exhausted
    }
}
