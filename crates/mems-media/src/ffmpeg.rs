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

//! ffmpeg-backed transcoder and frame source
//!
//! Shells out to the `ffmpeg` and `ffprobe` binaries. Transcodes produce
//! VP8 in WebM with audio dropped. Frames are captured as a single MJPEG
//! image on stdout.

use crate::engine::{TranscodeEngine, TranscodeJob};
use crate::error::{MediaError, Result};
use crate::frame::FrameSource;
use crate::probe::{self, VideoProbe};
use crate::progress::Progress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Binary locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    /// `ffmpeg` executable
    pub ffmpeg_path: PathBuf,

    /// `ffprobe` executable
    pub ffprobe_path: PathBuf,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        FfmpegConfig {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

/// ffmpeg subprocess engine
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    config: FfmpegConfig,
}

impl FfmpegEngine {
    /// Create an engine for the given binaries
    pub fn new(config: FfmpegConfig) -> Self {
        FfmpegEngine { config }
    }

    /// Binary locations in use
    pub fn config(&self) -> &FfmpegConfig {
        &self.config
    }

    fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.kill_on_drop(true).stdin(Stdio::null());
        cmd
    }
}

/// Arguments for a VP8/WebM transcode
pub fn transcode_args(job: &TranscodeJob) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-y".into(),
        "-i".into(),
        job.input.display().to_string(),
        "-vf".into(),
        format!("scale={}:{},fps={}", job.width, job.height, job.frame_rate),
        "-an".into(),
        "-c:v".into(),
        "libvpx".into(),
        "-b:v".into(),
        job.bitrate.to_string(),
        "-deadline".into(),
        "realtime".into(),
        "-cpu-used".into(),
        "8".into(),
        "-f".into(),
        "webm".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
        job.output.display().to_string(),
    ]
}

/// Arguments to write one scaled JPEG frame to stdout
pub fn capture_args(input: &Path, at_seconds: f64, max_dimension: u32, quality: f32) -> Vec<String> {
    // Fit inside a max_dimension square without upscaling
    let scale = format!(
        "scale='min({m},iw)':'min({m},ih)':force_original_aspect_ratio=decrease",
        m = max_dimension
    );
    vec![
        "-hide_banner".into(),
        "-ss".into(),
        format!("{at_seconds:.3}"),
        "-i".into(),
        input.display().to_string(),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        scale,
        "-q:v".into(),
        mjpeg_qscale(quality).to_string(),
        "-f".into(),
        "image2".into(),
        "-c:v".into(),
        "mjpeg".into(),
        "pipe:1".into(),
    ]
}

/// Map quality in `[0, 1]` onto the MJPEG `-q:v` scale (2 best, 31 worst)
pub fn mjpeg_qscale(quality: f32) -> u8 {
    let quality = quality.clamp(0.0, 1.0);
    (2.0 + (1.0 - quality) * 29.0).round() as u8
}

/// Encoded position in seconds from one `-progress` line, if it carries one
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    // Both keys are microseconds; out_time_ms is misnamed upstream
    match key {
        "out_time_us" | "out_time_ms" => value.trim().parse::<i64>().ok().map(|us| us.max(0) as f64 / 1_000_000.0),
        _ => None,
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    #[instrument(skip(self), fields(path = %self.config.ffmpeg_path.display()))]
    async fn load(&self) -> Result<()> {
        let output = self
            .ffmpeg()
            .args(["-hide_banner", "-encoders"])
            .output()
            .await
            .map_err(|e| MediaError::engine_unavailable(format!("cannot run ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(MediaError::engine_unavailable(format!(
                "ffmpeg exited with {}",
                output.status
            )));
        }
        let encoders = String::from_utf8_lossy(&output.stdout);
        if !encoders.lines().any(|l| l.split_whitespace().nth(1) == Some("libvpx")) {
            return Err(MediaError::engine_unavailable("ffmpeg was built without libvpx"));
        }
        debug!("ffmpeg has libvpx");
        Ok(())
    }

    #[instrument(skip(self, progress), fields(width = job.width, height = job.height, bitrate = job.bitrate))]
    async fn transcode(&self, job: &TranscodeJob, progress: &Progress) -> Result<()> {
        let mut child = self
            .ffmpeg()
            .args(transcode_args(job))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::compression(format!("cannot spawn ffmpeg: {e}")))?;

        // Drain stderr concurrently so a chatty encoder cannot block on a full pipe
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text).await;
            }
            text
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(seconds) = parse_progress_line(&line) {
                    if job.duration_seconds > 0.0 {
                        progress.report((seconds / job.duration_seconds * 100.0) as f32);
                    }
                }
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
            warn!(%status, stderr = %tail, "ffmpeg transcode failed");
            return Err(MediaError::compression(format!("ffmpeg exited with {status}: {tail}")));
        }
        progress.complete();
        Ok(())
    }
}

#[async_trait]
impl FrameSource for FfmpegEngine {
    #[instrument(skip(self))]
    async fn probe(&self, input: &Path) -> Result<VideoProbe> {
        let data = tokio::fs::read(input).await?;
        if probe::is_iso_bmff(&data) {
            match probe::probe_iso_bmff(&data) {
                Ok(found) => return Ok(found),
                Err(e) => debug!(error = %e, "in-process probe failed, trying ffprobe"),
            }
        }
        drop(data);

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,duration:format=duration",
                "-of",
                "default=noprint_wrappers=1",
            ])
            .arg(input)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::decode(format!("cannot run ffprobe: {e}")))?;
        if !output.status.success() {
            return Err(MediaError::decode(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        probe::parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout))
    }

    #[instrument(skip(self))]
    async fn capture(&self, input: &Path, at_seconds: f64, max_dimension: u32, quality: f32) -> Result<Vec<u8>> {
        let output = self
            .ffmpeg()
            .args(capture_args(input, at_seconds, max_dimension, quality))
            .output()
            .await
            .map_err(|e| MediaError::decode(format!("cannot run ffmpeg: {e}")))?;
        if !output.status.success() || output.stdout.is_empty() {
            return Err(MediaError::decode(format!(
                "frame capture at {at_seconds:.3}s failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}
