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

//! Client side of mems uploads
//!
//! The [`queue`] module holds the upload queue the `mems` binary drives:
//! files are checked against the upload policy and the mem's quota when
//! added, then compressed to their kind's budget and stored through an
//! [`UploadSink`](queue::UploadSink).

pub mod queue;

pub use queue::{
    DirectorySink, NoopObserver, QueueError, QueueObserver, QueueSummary, QueuedFile, SessionSink, UploadQueue,
    UploadSink, UploadState, Uploaded, DEFAULT_CONCURRENCY,
};
