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

//! Error types for the compression pipeline
//!
//! Only three failures ever reach a caller: a fatal image encode
//! ([`MediaError::Compression`]), an undecodable video
//! ([`MediaError::Decode`]) and an invalid budget. Everything else is
//! absorbed by the tier loops. There is no "budget unreachable"
//! variant: the most aggressive tier's output is returned
//! even when it is still over budget.

use thiserror::Error;

/// Media pipeline errors
#[derive(Debug, Error)]
pub enum MediaError {
    /// Declared MIME type is neither image nor video
    #[error("unsupported media type: {0}")]
    UnsupportedType(String),

    /// An encode attempt failed for a reason other than output size
    #[error("compression failed: {0}")]
    Compression(String),

    /// Source media could not be decoded or seeked
    #[error("decode failed: {0}")]
    Decode(String),

    /// The transcoding engine could not be loaded in this environment
    #[error("transcoding engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Byte budget must be at least one byte
    #[error("invalid byte budget: {0}")]
    InvalidBudget(u64),

    /// IO error while staging temporary files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an unsupported type error
    pub fn unsupported_type<S: Into<String>>(mime: S) -> Self {
        MediaError::UnsupportedType(mime.into())
    }

    /// Create a compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        MediaError::Compression(msg.into())
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        MediaError::Decode(msg.into())
    }

    /// Create an engine-unavailable error
    pub fn engine_unavailable<S: Into<String>>(msg: S) -> Self {
        MediaError::EngineUnavailable(msg.into())
    }

    /// Check if this is a compression error
    pub fn is_compression(&self) -> bool {
        matches!(self, MediaError::Compression(_))
    }

    /// Check if this is a decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, MediaError::Decode(_))
    }

    /// Check if this is an engine-unavailable error
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, MediaError::EngineUnavailable(_))
    }
}

/// Result type for media operations
pub type Result<T> = std::result::Result<T, MediaError>;
