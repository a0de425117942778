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

//! Records and request/response shapes

#![allow(missing_docs)]

use crate::ids::{BlobRef, CommentId, MediaId, MemId, NoteId, UploadTargetId, UserId};
use crate::join_code::JoinCode;
use crate::reactions::{EmojiKey, ReactionCounts};
use chrono::{DateTime, Utc};
use mems_media::MediaKind;
use serde::{Deserialize, Serialize};

/// Participant role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Created the mem
    Creator,
    /// Joined with the code
    Participant,
}

/// A shared event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mem {
    pub id: MemId,
    pub name: String,
    pub description: String,
    pub place: String,
    pub is_public: bool,
    pub creator_id: UserId,
    pub join_code: JoinCode,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Mem {
    /// Whether the creator ended the mem
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Membership of a user in a mem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub mem_id: MemId,
    pub user_id: UserId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

/// Free-text note on a mem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub mem_id: MemId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

/// A committed upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: MediaId,
    pub mem_id: MemId,
    pub blob: BlobRef,
    pub uploaded_by: UserId,
    pub file_name: String,
    pub content_type: String,
    /// Size of the stored blob
    pub file_size: u64,
    pub format: MediaKind,
    pub uploaded_at: DateTime<Utc>,
    pub reaction_counts: ReactionCounts,
    pub score: u64,
    #[serde(skip)]
    pub(crate) seq: u64,
}

/// A comment on a media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub media_id: MediaId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

/// One user's reaction of one kind on one media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reaction {
    pub media_id: MediaId,
    pub user_id: UserId,
    pub key: EmojiKey,
}

/// Input to `create_mem`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMem {
    pub name: String,
    pub description: String,
    pub place: String,
    pub is_public: bool,
}

/// Returned by `create_mem`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedMem {
    pub mem_id: MemId,
    pub name: String,
    pub join_code: JoinCode,
    pub join_url: String,
}

/// Returned by `join_mem`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedMem {
    pub mem_id: MemId,
    pub name: String,
}

/// What a visitor holding a join code may see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemSummary {
    pub id: MemId,
    pub name: String,
    pub description: String,
    pub place: String,
}

/// One of the caller's mems with activity counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMem {
    pub id: MemId,
    pub name: String,
    pub description: String,
    pub place: String,
    pub join_code: JoinCode,
    pub created_at: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
    pub is_creator: bool,
    pub media_count: usize,
    pub participant_count: usize,
}

impl TopMem {
    /// Most recent of creation and joining
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.created_at.max(self.joined_at)
    }
}

/// Single-use slot returned by `request_upload_slot`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub id: UploadTargetId,
    pub mem_id: MemId,
    pub content_type: String,
}

/// Client-supplied metadata for `commit_upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub file_name: String,
    pub content_type: String,
    /// Size reported by the client; the stored blob is authoritative
    pub file_size: u64,
}

/// Result of toggling a reaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionToggle {
    /// True when the reaction was added, false when removed
    pub added: bool,
    pub counts: ReactionCounts,
    pub score: u64,
}
