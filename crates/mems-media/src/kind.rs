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

//! Media kind and raster format detection
//!
//! Dispatch is driven by the declared MIME type only. Nothing here sniffs
//! magic bytes: a file declared `image/png` is routed to the image
//! compressor even if its bytes say otherwise, and decoding decides.

use serde::{Deserialize, Serialize};

/// Media kind used for pipeline dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// `image/*`
    Image,
    /// `video/*`
    Video,
}

impl MediaKind {
    /// Detect kind from a MIME type prefix (`image/*`, `video/*`)
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = essence(mime);
        if essence.starts_with("image/") {
            Some(MediaKind::Image)
        } else if essence.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Detect kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        mime_from_extension(ext).and_then(Self::from_mime)
    }

    /// Lowercase name, as stored on media records
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raster formats the image compressor can write
///
/// `Jpeg` is the canonical lossy target. `Png` and `WebP` are only used
/// when the source already is one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// JPEG
    Jpeg,
    /// PNG, lossless
    Png,
    /// WebP, written lossless
    WebP,
}

impl RasterFormat {
    /// Re-encodable format for a declared MIME type
    pub fn from_mime(mime: &str) -> Option<Self> {
        match essence(mime).as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// MIME type written on output files
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Output file extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

/// Guess a MIME type from a file extension
pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.trim_start_matches('.').to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" | "heif" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "3gp" => "video/3gpp",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Rough output/input size ratio expected from compression
///
/// Used for pre-upload size estimates only; the pipeline never relies on it.
pub fn estimated_compression_ratio(mime: &str) -> f64 {
    let essence = essence(mime);
    match MediaKind::from_mime(&essence) {
        Some(MediaKind::Image) => match essence.as_str() {
            "image/png" => 0.2,
            "image/gif" => 0.3,
            "image/webp" => 0.4,
            _ => 0.25,
        },
        Some(MediaKind::Video) => 0.3,
        None => 1.0,
    }
}

/// Lowercased MIME type without parameters (`video/webm;codecs=vp8` -> `video/webm`)
pub(crate) fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_lowercase()
}
