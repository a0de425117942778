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

//! Adaptive media compression for mems uploads
//!
//! Shrinks user-supplied images and videos under a byte budget before they
//! are uploaded to a mem:
//!
//! - [`ImageCompressor`]: re-encodes at decreasing quality and resolution
//! - [`VideoCompressor`]: transcodes to VP8/WebM at decreasing bitrate tiers
//! - [`FrameExtractor`]: replaces an untranscodable video with its midpoint frame
//! - [`MediaCompressor`]: dispatches by MIME type and reports progress
//!
//! ```no_run
//! use mems_media::{CompressionPolicy, FfmpegConfig, MediaCompressor, MediaFile, Progress};
//!
//! # async fn run() -> mems_media::Result<()> {
//! let compressor = MediaCompressor::with_ffmpeg(CompressionPolicy::default(), FfmpegConfig::default());
//! let file = MediaFile::read("beach.mov").await?;
//! let progress = Progress::new(|p| println!("{p}%"));
//! let small = compressor.compress(&file, 1024 * 1024, &progress).await?;
//! println!("{} -> {} ({} bytes)", file.name, small.name, small.len());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod geometry;
pub mod image;
pub mod kind;
pub mod pipeline;
pub mod policy;
pub mod probe;
pub mod progress;
pub mod source;
pub mod video;

pub use engine::{EngineSlot, EngineState, TranscodeEngine, TranscodeJob};
pub use error::{MediaError, Result};
pub use ffmpeg::{FfmpegConfig, FfmpegEngine};
pub use frame::{FrameExtractor, FrameSource, StagedInput};
pub use image::{ImageAttempt, ImageCompressor, ImageOutcome};
pub use kind::{estimated_compression_ratio, mime_from_extension, MediaKind, RasterFormat};
pub use pipeline::MediaCompressor;
pub use policy::{CompressionPolicy, ImagePolicy, ImageTier, TierFormat, VideoPolicy, VideoTier};
pub use probe::VideoProbe;
pub use progress::{Progress, ProgressCallback};
pub use source::{Budget, MediaFile};
pub use video::{VideoCompressor, VideoOutcome};
