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

//! Compression orchestrator
//!
//! [`MediaCompressor::compress`] is the single entry point: it enforces the
//! passthrough fast path, dispatches on the declared MIME prefix and makes
//! sure the caller sees a terminal 100 on every successful return.

use crate::engine::EngineSlot;
use crate::error::Result;
use crate::ffmpeg::FfmpegConfig;
use crate::frame::{FrameExtractor, FrameSource};
use crate::image::ImageCompressor;
use crate::kind::MediaKind;
use crate::policy::CompressionPolicy;
use crate::progress::Progress;
use crate::source::{Budget, MediaFile};
use crate::video::VideoCompressor;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Adaptive media compressor
#[derive(Debug, Clone)]
pub struct MediaCompressor {
    policy: CompressionPolicy,
    engine: Arc<EngineSlot>,
    images: ImageCompressor,
    videos: VideoCompressor,
}

impl MediaCompressor {
    /// Assemble a compressor from a policy, an engine slot and a frame source
    pub fn new(policy: CompressionPolicy, engine: Arc<EngineSlot>, frames: Arc<dyn FrameSource>) -> Self {
        let images = ImageCompressor::new(policy.image.clone());
        let extractor = FrameExtractor::new(frames, images.clone(), &policy.video);
        let videos = VideoCompressor::new(policy.video.clone(), Arc::clone(&engine), extractor);
        MediaCompressor {
            policy,
            engine,
            images,
            videos,
        }
    }

    /// Compressor backed by the process-wide ffmpeg engine
    ///
    /// Transcoding and frame capture use the same engine.
    pub fn with_ffmpeg(policy: CompressionPolicy, config: FfmpegConfig) -> Self {
        let (engine, ffmpeg) = EngineSlot::shared_with(config);
        Self::new(policy, engine, ffmpeg)
    }

    /// Policy in use
    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// Engine slot shared with the video compressor
    pub fn engine(&self) -> &Arc<EngineSlot> {
        &self.engine
    }

    /// Load the transcoding engine ahead of the first video
    ///
    /// Optional: the video path initializes on demand. A load failure is
    /// returned here but only means videos will become still frames.
    pub async fn init_engine(&self) -> Result<()> {
        self.engine.init().await
    }

    /// Whether video transcoding is usable right now
    pub async fn video_compression_available(&self) -> bool {
        self.engine.is_ready().await
    }

    /// Configured budget for a media kind
    pub fn budget_for(&self, kind: MediaKind) -> Result<Budget> {
        self.policy.budget_for(kind)
    }

    /// Compress `file` to at most `max_bytes`, best effort
    ///
    /// - `file.len() <= max_bytes`: returned unchanged, progress 100 once.
    /// - `image/*`: tiered re-encode; decode or encode failures are errors.
    /// - `video/*`: tiered transcode, still-frame fallback.
    /// - anything else: returned unchanged.
    ///
    /// `max_bytes` must be at least 1.
    #[instrument(skip(self, file, progress), fields(name = %file.name, mime = %file.mime, size = file.len()))]
    pub async fn compress(&self, file: &MediaFile, max_bytes: u64, progress: &Progress) -> Result<MediaFile> {
        let budget = Budget::new(max_bytes)?;

        if budget.admits(file.len()) {
            debug!("within budget, passing through");
            progress.finish();
            return Ok(file.clone());
        }

        let output = match file.kind() {
            Some(MediaKind::Image) => self.images.compress(file, budget, progress).await?,
            Some(MediaKind::Video) => self.videos.compress(file, budget, progress).await?,
            None => {
                debug!("not an image or video, passing through");
                file.clone()
            }
        };

        progress.finish();
        Ok(output)
    }

    /// Compress with the policy budget for the file's kind
    ///
    /// Files of unknown kind pass through untouched.
    pub async fn compress_for_kind(&self, file: &MediaFile, progress: &Progress) -> Result<MediaFile> {
        match file.kind() {
            Some(kind) => {
                let budget = self.budget_for(kind)?;
                self.compress(file, budget.bytes(), progress).await
            }
            None => {
                progress.finish();
                Ok(file.clone())
            }
        }
    }
}
