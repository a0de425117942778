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

//! Mems session backend
//!
//! A mem is a shared event: its creator hands out a six-character join code,
//! participants upload compressed photos and clips, react with emoji and
//! comment. This crate holds that state and enforces the server-side rules
//! (membership, type allow-list, size cap, media quota) independently of
//! any client-side compression.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use mems_session::{NewMem, SessionConfig, SessionService, UploadMetadata, UserId};
//!
//! # async fn example() -> mems_session::SessionResult<()> {
//! let service = SessionService::new(SessionConfig::default());
//! let alice = UserId::new();
//! let created = service
//!     .create_mem(alice, NewMem { name: "Beach day".into(), ..Default::default() })
//!     .await?;
//!
//! let target = service.request_upload_slot(alice, created.mem_id, "image/jpeg").await?;
//! let blob = service.upload_bytes(&target, Bytes::from_static(b"...")).await?;
//! let media = service
//!     .commit_upload(
//!         alice,
//!         created.mem_id,
//!         blob,
//!         UploadMetadata { file_name: "beach.jpg".into(), content_type: "image/jpeg".into(), file_size: 3 },
//!     )
//!     .await?;
//! service.toggle_reaction(alice, media.id, "heart").await?;
//! # Ok(())
//! # }
//! ```

pub mod blob;
mod engagement;
pub mod error;
pub mod ids;
pub mod join_code;
pub mod model;
pub mod policy;
pub mod reactions;
pub mod service;
mod upload;

pub use blob::{BlobStore, MemoryBlobStore};
pub use error::{SessionError, SessionResult};
pub use ids::{BlobRef, CommentId, MediaId, MemId, NoteId, UploadTargetId, UserId};
pub use join_code::{JoinCode, JoinCodeSource, RandomJoinCodes};
pub use model::{
    Comment, CreatedMem, JoinedMem, MediaRecord, Mem, MemSummary, NewMem, Note, Participant, Reaction,
    ReactionToggle, Role, TopMem, UploadMetadata, UploadTarget,
};
pub use policy::{
    MediaQuota, UploadPolicy, DEFAULT_MAX_MEDIA_PER_MEM, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_SLOT_TTL_SECS,
};
pub use reactions::{EmojiKey, ReactionCounts};
pub use service::{SessionConfig, SessionService, DEFAULT_TOP_MEMS};
