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

use thiserror::Error;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by the session service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Mem, media or blob does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// No mem uses this join code
    #[error("invalid join code: {0}")]
    InvalidJoinCode(String),

    /// Every generated join code collided with an existing one
    #[error("could not generate a unique join code after {0} attempts")]
    JoinCodeExhausted(usize),

    /// Caller is not a participant of the mem
    #[error("not a participant")]
    NotParticipant,

    /// Caller participates but may not perform this action
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Content type is outside the upload allow-list
    #[error("unsupported file type {0}; only images and videos are allowed")]
    UnsupportedType(String),

    /// Stored blob is empty or over the server-side cap
    #[error("invalid file size {size} bytes (limit {max} bytes)")]
    InvalidFileSize {
        /// Measured size
        size: u64,
        /// Server-side cap
        max: u64,
    },

    /// Mem already holds its maximum number of media files
    #[error("maximum of {0} media files per mem")]
    QuotaExceeded(usize),

    /// Mem was ended by its creator
    #[error("mem has ended")]
    MemEnded,

    /// Reaction key is not one of the known emoji keys
    #[error("invalid emoji key: {0}")]
    InvalidEmoji(String),

    /// Rejected user input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Upload slot or blob is not usable by this caller
    #[error("unknown upload target")]
    UnknownUploadTarget,

    /// Blob storage failure
    #[error("blob storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// Create a NotFound error for an entity description
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        SessionError::NotFound(what.into())
    }

    /// Create a NotAuthorized error with context
    pub fn not_authorized<S: Into<String>>(msg: S) -> Self {
        SessionError::NotAuthorized(msg.into())
    }

    /// Create an InvalidInput error with context
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        SessionError::InvalidInput(msg.into())
    }

    /// Create a Storage error with context
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        SessionError::Storage(msg.into())
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound(_))
    }

    /// Whether the error is caused by the caller's permissions
    pub fn is_permission(&self) -> bool {
        matches!(self, SessionError::NotParticipant | SessionError::NotAuthorized(_))
    }
}
