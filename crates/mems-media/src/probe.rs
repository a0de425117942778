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

//! Video container probing
//!
//! ISO-BMFF containers (MP4, MOV, M4V) are read in-process with `mp4parse`.
//! Anything else is left to `ffprobe`, whose `key=value` output is parsed by
//! [`parse_ffprobe_output`].

use crate::error::{MediaError, Result};
use mp4parse::{read_mp4, SampleEntry, TrackType};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, instrument};

/// Duration and display size of a video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoProbe {
    /// Duration in seconds, always positive
    pub duration_seconds: f64,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl VideoProbe {
    /// Timestamp of the representative frame
    pub fn midpoint(&self) -> f64 {
        self.duration_seconds / 2.0
    }

    fn validated(self) -> Result<Self> {
        if !(self.duration_seconds.is_finite() && self.duration_seconds > 0.0) {
            return Err(MediaError::decode("video has zero or unknown duration"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::decode("video has no visible dimensions"));
        }
        Ok(self)
    }
}

/// Whether the bytes start like an ISO-BMFF file (`ftyp` box at offset 4)
pub fn is_iso_bmff(data: &[u8]) -> bool {
    data.len() >= 12 && &data[4..8] == b"ftyp"
}

/// Probe an ISO-BMFF container from memory
#[instrument(skip(data), fields(size = data.len()))]
pub fn probe_iso_bmff(data: &[u8]) -> Result<VideoProbe> {
    let mut cursor = Cursor::new(data);
    let context = read_mp4(&mut cursor)
        .map_err(|e| MediaError::decode(format!("failed to parse container: {:?}", e)))?;

    let track = context
        .tracks
        .iter()
        .find(|t| t.track_type == TrackType::Video)
        .ok_or_else(|| MediaError::decode("container has no video track"))?;

    let timescale = track.timescale.map(|ts| ts.0).unwrap_or(0);
    let duration = track.duration.map(|d| d.0).unwrap_or(0);
    let duration_seconds = if timescale == 0 {
        0.0
    } else {
        duration as f64 / timescale as f64
    };

    // Sample entry carries integer pixels; tkhd is 16.16 fixed point
    let from_entry = track
        .stsd
        .as_ref()
        .and_then(|stsd| stsd.descriptions.first())
        .and_then(|entry| match entry {
            SampleEntry::Video(video) => Some((u32::from(video.width), u32::from(video.height))),
            _ => None,
        });
    let (width, height) = from_entry
        .or_else(|| track.tkhd.as_ref().map(|tkhd| (tkhd.width >> 16, tkhd.height >> 16)))
        .unwrap_or((0, 0));

    debug!(duration_seconds, width, height, "probed container");
    VideoProbe {
        duration_seconds,
        width,
        height,
    }
    .validated()
}

/// Parse `ffprobe -of default=noprint_wrappers=1` output
///
/// Expects `width`, `height` and `duration` keys. Values of `N/A` count as
/// missing.
pub fn parse_ffprobe_output(output: &str) -> Result<VideoProbe> {
    let mut width = None;
    let mut height = None;
    let mut duration = None;

    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "width" => width = width.or_else(|| value.parse::<u32>().ok()),
            "height" => height = height.or_else(|| value.parse::<u32>().ok()),
            "duration" => duration = duration.or_else(|| value.parse::<f64>().ok()),
            _ => {}
        }
    }

    VideoProbe {
        duration_seconds: duration.unwrap_or(0.0),
        width: width.unwrap_or(0),
        height: height.unwrap_or(0),
    }
    .validated()
}
