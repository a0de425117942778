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

//! Files flowing through the pipeline and the byte budget they must meet

use crate::error::{MediaError, Result};
use crate::kind::MediaKind;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::path::Path;

/// An in-memory media file: name, declared MIME type and bytes
///
/// Used both for caller-supplied sources and for pipeline output. The
/// pipeline only ever reads a source; outputs are new values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// File name including extension
    pub name: String,

    /// Declared MIME type
    pub mime: String,

    /// Raw content
    pub data: Bytes,
}

impl MediaFile {
    /// Create a file from its parts
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        MediaFile {
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing the MIME type from its extension
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(crate::kind::mime_from_extension)
            .unwrap_or("application/octet-stream");
        Ok(MediaFile::new(name, mime, data))
    }

    /// Size in bytes
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// True for zero-length files
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Kind derived from the declared MIME type
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime)
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// Build an output file that keeps this file's stem under a new format
    pub fn derive(&self, extension: &str, mime: &str, data: impl Into<Bytes>) -> MediaFile {
        MediaFile::new(format!("{}.{}", self.stem(), extension), mime, data)
    }
}

/// Positive byte ceiling a compressed file should meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Budget(NonZeroU64);

impl Budget {
    /// Create a budget, rejecting zero
    pub fn new(bytes: u64) -> Result<Self> {
        NonZeroU64::new(bytes)
            .map(Budget)
            .ok_or(MediaError::InvalidBudget(bytes))
    }

    /// Ceiling in bytes
    pub fn bytes(self) -> u64 {
        self.0.get()
    }

    /// Whether a file of `len` bytes fits
    pub fn admits(self, len: u64) -> bool {
        len <= self.bytes()
    }
}

impl TryFrom<u64> for Budget {
    type Error = MediaError;

    fn try_from(bytes: u64) -> Result<Self> {
        Budget::new(bytes)
    }
}

impl From<Budget> for u64 {
    fn from(budget: Budget) -> u64 {
        budget.bytes()
    }
}

impl std::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bytes", self.bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_rejects_zero() {
        assert!(matches!(Budget::new(0), Err(MediaError::InvalidBudget(0))));
        assert_eq!(Budget::new(1).unwrap().bytes(), 1);
    }

    #[test]
    fn test_budget_admits_inclusive() {
        let budget = Budget::new(200).unwrap();
        assert!(budget.admits(199));
        assert!(budget.admits(200));
        assert!(!budget.admits(201));
    }

    #[test]
    fn test_budget_serde() {
        let budget: Budget = serde_json::from_str("1048576").unwrap();
        assert_eq!(budget.bytes(), 1_048_576);
        assert!(serde_json::from_str::<Budget>("0").is_err());
    }

    #[test]
    fn test_stem_and_derive() {
        let file = MediaFile::new("beach.day.mov", "video/quicktime", vec![0u8; 4]);
        assert_eq!(file.stem(), "beach.day");
        let out = file.derive("webm", "video/webm", vec![1u8]);
        assert_eq!(out.name, "beach.day.webm");
        assert_eq!(out.mime, "video/webm");

        let dotfile = MediaFile::new(".hidden", "image/png", Bytes::new());
        assert_eq!(dotfile.stem(), ".hidden");
    }

    #[test]
    fn test_kind_of_file() {
        let file = MediaFile::new("a.pdf", "application/pdf", vec![1, 2, 3]);
        assert_eq!(file.kind(), None);
        assert_eq!(file.len(), 3);
    }

    #[tokio::test]
    async fn test_read_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.MOV");
        std::fs::write(&path, b"not really a movie").unwrap();

        let file = MediaFile::read(&path).await.unwrap();
        assert_eq!(file.name, "clip.MOV");
        assert_eq!(file.mime, "video/quicktime");
        assert_eq!(file.kind(), Some(MediaKind::Video));
    }
}
