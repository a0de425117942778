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

use super::AppContext;
use crate::output;
use anyhow::{Context, Result};
use clap::Parser;
use mems_media::probe::{is_iso_bmff, probe_iso_bmff};
use mems_media::{FfmpegEngine, FrameSource};
use std::path::PathBuf;

/// Check the video transcoder and optionally measure a video
#[derive(Parser, Debug)]
pub struct ProbeCmd {
    /// Video to measure
    #[arg(value_name = "VIDEO")]
    pub video: Option<PathBuf>,
}

impl ProbeCmd {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let ffmpeg = &ctx.config.compression.ffmpeg;
        let compressor = ctx.compressor();
        let engine = compressor.engine();

        match compressor.init_engine().await {
            Ok(()) => output::success(&format!("Transcoder ready ({})", engine.engine_name())),
            Err(e) => output::warning(&format!(
                "Transcoder unavailable: {e}. Videos will be replaced by a still frame"
            )),
        }
        output::detail("State", &engine.state().await.to_string());
        output::detail("ffmpeg", &ffmpeg.ffmpeg_path.display().to_string());
        output::detail("ffprobe", &ffmpeg.ffprobe_path.display().to_string());

        let Some(path) = &self.video else {
            return Ok(());
        };
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let probe = if is_iso_bmff(&data) {
            probe_iso_bmff(&data)?
        } else {
            FfmpegEngine::new(ffmpeg.clone()).probe(path).await?
        };

        output::header(&path.display().to_string());
        output::detail("Duration", &format!("{:.2}s", probe.duration_seconds));
        output::detail("Dimensions", &format!("{}x{}", probe.width, probe.height));
        output::detail("Still frame at", &format!("{:.2}s", probe.midpoint()));
        Ok(())
    }
}
