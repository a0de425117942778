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

//! Still-frame fallback for videos
//!
//! When no transcode tier fits, or transcoding is unavailable, a video is
//! replaced by one JPEG frame taken at the middle of its duration. The
//! captured frame goes through the [`ImageCompressor`] with the same budget.

use crate::error::{MediaError, Result};
use crate::image::ImageCompressor;
use crate::policy::VideoPolicy;
use crate::probe::VideoProbe;
use crate::progress::Progress;
use crate::source::{Budget, MediaFile};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, instrument};

/// Decodes videos enough to measure them and grab single frames
///
/// Kept apart from [`TranscodeEngine`](crate::engine::TranscodeEngine) so a
/// frame can still be captured when the transcoder failed to load.
#[async_trait]
pub trait FrameSource: Send + Sync + fmt::Debug {
    /// Duration and dimensions of a video
    async fn probe(&self, input: &Path) -> Result<VideoProbe>;

    /// JPEG bytes of the frame at `at_seconds`, scaled so the longest edge
    /// is at most `max_dimension`
    async fn capture(
        &self,
        input: &Path,
        at_seconds: f64,
        max_dimension: u32,
        quality: f32,
    ) -> Result<Vec<u8>>;
}

/// A source video written to a private temporary directory
///
/// The directory and everything in it is removed on drop.
#[derive(Debug)]
pub struct StagedInput {
    dir: TempDir,
    path: PathBuf,
}

impl StagedInput {
    /// Write `file` into a fresh temporary directory
    pub async fn stage(file: &MediaFile) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("mems-").tempdir()?;
        let extension = Path::new(&file.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let path = dir.path().join(format!("source.{extension}"));
        tokio::fs::write(&path, &file.data).await?;
        Ok(StagedInput { dir, path })
    }

    /// Staged source path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a scratch file next to the source
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Midpoint frame extractor
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    frames: Arc<dyn FrameSource>,
    images: ImageCompressor,
    max_dimension: u32,
    quality: f32,
}

impl FrameExtractor {
    /// Create an extractor using the frame settings of a video policy
    pub fn new(frames: Arc<dyn FrameSource>, images: ImageCompressor, policy: &VideoPolicy) -> Self {
        FrameExtractor {
            frames,
            images,
            max_dimension: policy.frame_max_dimension,
            quality: policy.frame_quality,
        }
    }

    /// Probe a staged video through the frame source
    pub async fn probe(&self, input: &Path) -> Result<VideoProbe> {
        self.frames.probe(input).await
    }

    /// Stage `video` and extract its midpoint frame
    pub async fn extract(&self, video: &MediaFile, budget: Budget, progress: &Progress) -> Result<MediaFile> {
        let staged = StagedInput::stage(video).await?;
        self.extract_staged(video, &staged, budget, progress).await
    }

    /// Extract from an already staged copy of `video`
    ///
    /// Progress: 50 on entry, 70 after probing, 80 after capture, then the
    /// image compressor runs on `[80, 100]`. Probe or capture failures are
    /// [`MediaError::Decode`].
    #[instrument(skip_all, fields(name = %video.name, budget = budget.bytes()))]
    pub async fn extract_staged(
        &self,
        video: &MediaFile,
        staged: &StagedInput,
        budget: Budget,
        progress: &Progress,
    ) -> Result<MediaFile> {
        progress.report(50.0);

        let probe = self
            .frames
            .probe(staged.path())
            .await
            .map_err(into_decode)?;
        progress.report(70.0);

        let at = probe.midpoint();
        debug!(at, duration = probe.duration_seconds, "capturing frame");
        let jpeg = self
            .frames
            .capture(staged.path(), at, self.max_dimension, self.quality)
            .await
            .map_err(into_decode)?;
        if jpeg.is_empty() {
            return Err(MediaError::decode("captured frame is empty"));
        }
        progress.report(80.0);

        let frame = video.derive("jpg", "image/jpeg", jpeg);
        if budget.admits(frame.len()) {
            info!(size = frame.len(), "captured frame within budget");
            progress.complete();
            return Ok(frame);
        }

        let image_progress = progress.span(80.0, 100.0);
        let output = self.images.compress(&frame, budget, &image_progress).await?;
        info!(size = output.len(), "frame compressed");
        Ok(output)
    }
}

fn into_decode(err: MediaError) -> MediaError {
    match err {
        MediaError::Decode(_) => err,
        other => MediaError::decode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mems_test_utils::images;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct StillSource {
        probe: Result<VideoProbe>,
        frame: Vec<u8>,
        captured_at: Mutex<Option<f64>>,
    }

    #[async_trait]
    impl FrameSource for StillSource {
        async fn probe(&self, input: &Path) -> Result<VideoProbe> {
            assert!(input.exists());
            match &self.probe {
                Ok(p) => Ok(*p),
                Err(e) => Err(MediaError::compression(e.to_string())),
            }
        }

        async fn capture(&self, _input: &Path, at: f64, _max: u32, _q: f32) -> Result<Vec<u8>> {
            *self.captured_at.lock().unwrap() = Some(at);
            Ok(self.frame.clone())
        }
    }

    fn video() -> MediaFile {
        MediaFile::new("party.mov", "video/quicktime", vec![7u8; 4096])
    }

    fn extractor(source: Arc<StillSource>) -> FrameExtractor {
        FrameExtractor::new(source, ImageCompressor::default(), &VideoPolicy::default())
    }

    #[tokio::test]
    async fn test_captures_midpoint() {
        let source = Arc::new(StillSource {
            probe: Ok(VideoProbe {
                duration_seconds: 9.0,
                width: 1280,
                height: 720,
            }),
            frame: images::jpeg(images::gradient(64, 36), 80),
            captured_at: Mutex::new(None),
        });
        let out = extractor(Arc::clone(&source))
            .extract(&video(), Budget::new(1024 * 1024).unwrap(), &Progress::silent())
            .await
            .unwrap();

        assert_eq!(*source.captured_at.lock().unwrap(), Some(4.5));
        assert_eq!(out.name, "party.jpg");
        assert_eq!(out.mime, "image/jpeg");
    }

    #[tokio::test]
    async fn test_probe_failure_becomes_decode_error() {
        let source = Arc::new(StillSource {
            probe: Err(MediaError::compression("moov atom missing")),
            frame: Vec::new(),
            captured_at: Mutex::new(None),
        });
        let err = extractor(source)
            .extract(&video(), Budget::new(10).unwrap(), &Progress::silent())
            .await
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_staged_input_removed_on_drop() {
        let staged = StagedInput::stage(&video()).await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "mov");
        drop(staged);
        assert!(!path.exists());
    }
}
