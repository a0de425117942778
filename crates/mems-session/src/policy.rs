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

//! Server-side upload limits
//!
//! These are enforced independently of client compression: every commit
//! re-checks size, type and quota against the stored blob.

use mems_media::MediaKind;
use serde::{Deserialize, Serialize};

/// 1 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024;

/// Default flat per-mem media limit
pub const DEFAULT_MAX_MEDIA_PER_MEM: usize = 50;

/// Upload slots and uncommitted blobs expire after an hour
pub const DEFAULT_UPLOAD_SLOT_TTL_SECS: u64 = 60 * 60;

/// How many media files a mem may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaQuota {
    /// Fixed ceiling per mem
    PerMem {
        /// Maximum media files
        max: usize,
    },
    /// Ceiling scaled by the number of participants
    PerParticipant {
        /// Media files allowed per participant
        per_participant: usize,
    },
}

impl MediaQuota {
    /// Effective limit for a mem with `participants` members
    pub fn limit(&self, participants: usize) -> usize {
        match *self {
            MediaQuota::PerMem { max } => max,
            MediaQuota::PerParticipant { per_participant } => per_participant.saturating_mul(participants.max(1)),
        }
    }

    /// Whether the configured value is usable
    pub fn is_positive(&self) -> bool {
        match *self {
            MediaQuota::PerMem { max } => max > 0,
            MediaQuota::PerParticipant { per_participant } => per_participant > 0,
        }
    }
}

impl Default for MediaQuota {
    fn default() -> Self {
        MediaQuota::PerMem {
            max: DEFAULT_MAX_MEDIA_PER_MEM,
        }
    }
}

/// Upload allow-list, size cap and quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    /// Largest accepted blob
    pub max_file_bytes: u64,

    /// Accepted image content types
    pub image_types: Vec<String>,

    /// Accepted video content types
    pub video_types: Vec<String>,

    /// Media count limit
    pub quota: MediaQuota,

    /// Seconds an issued upload slot stays usable
    pub slot_ttl_secs: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            max_file_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            image_types: ["image/jpeg", "image/png", "image/webp", "image/gif"]
                .map(String::from)
                .to_vec(),
            video_types: ["video/mp4", "video/webm", "video/mov", "video/quicktime"]
                .map(String::from)
                .to_vec(),
            quota: MediaQuota::default(),
            slot_ttl_secs: DEFAULT_UPLOAD_SLOT_TTL_SECS,
        }
    }
}

impl UploadPolicy {
    /// Kind of an allowed content type, `None` when it is not allowed
    ///
    /// Parameters such as `;codecs=vp8` and letter case are ignored.
    pub fn classify(&self, content_type: &str) -> Option<MediaKind> {
        let essence = essence(content_type);
        let listed = |types: &[String]| types.iter().any(|t| t.eq_ignore_ascii_case(&essence));
        if listed(&self.image_types) {
            Some(MediaKind::Image)
        } else if listed(&self.video_types) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Whether a stored size is acceptable
    pub fn size_ok(&self, size: u64) -> bool {
        size >= 1 && size <= self.max_file_bytes
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.classify("image/gif"), Some(MediaKind::Image));
        assert_eq!(policy.classify("video/webm;codecs=vp8"), Some(MediaKind::Video));
        assert_eq!(policy.classify("VIDEO/QUICKTIME"), Some(MediaKind::Video));
        assert_eq!(policy.classify("image/heic"), None);
        assert_eq!(policy.classify("application/pdf"), None);
    }

    #[test]
    fn test_size_bounds() {
        let policy = UploadPolicy::default();
        assert!(!policy.size_ok(0));
        assert!(policy.size_ok(1));
        assert!(policy.size_ok(DEFAULT_MAX_UPLOAD_BYTES));
        assert!(!policy.size_ok(DEFAULT_MAX_UPLOAD_BYTES + 1));
    }

    #[test]
    fn test_quota_limits() {
        assert_eq!(MediaQuota::default().limit(7), 50);
        let scaled = MediaQuota::PerParticipant { per_participant: 20 };
        assert_eq!(scaled.limit(3), 60);
        assert_eq!(scaled.limit(0), 20);
        assert!(!MediaQuota::PerMem { max: 0 }.is_positive());
    }

    #[test]
    fn test_quota_serde() {
        let quota: MediaQuota = serde_json::from_str(r#"{"kind":"per_participant","per_participant":20}"#).unwrap();
        assert_eq!(quota, MediaQuota::PerParticipant { per_participant: 20 });
    }
}
