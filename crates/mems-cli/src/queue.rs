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

//! Client-side upload queue
//!
//! Files are enqueued, then [`UploadQueue::run`] compresses each one to its
//! kind's budget and hands the result to an [`UploadSink`]. Files run
//! concurrently and fail independently: an error marks only that file.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mems_media::{MediaCompressor, MediaError, MediaFile, Progress};
use mems_session::{MediaQuota, MemId, SessionError, SessionService, UploadMetadata, UploadPolicy, UserId};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Files compressed and uploaded at once unless configured otherwise
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Errors raised by the queue and its sinks
#[derive(Error, Debug)]
pub enum QueueError {
    /// Enqueueing would take the mem past its media quota
    #[error("maximum of {limit} media files per mem ({existing} uploaded, {queued} queued, {adding} selected)")]
    QuotaExceeded {
        /// Limit for the mem
        limit: usize,
        /// Media already committed
        existing: usize,
        /// Files already in the queue
        queued: usize,
        /// Files being added
        adding: usize,
    },

    /// Compression failed
    #[error(transparent)]
    Media(#[from] MediaError),

    /// The session service rejected the upload
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Writing the output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle of a queued file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Waiting for [`UploadQueue::run`]
    Idle,
    /// Being compressed
    Compressing,
    /// Being handed to the sink
    Uploading,
    /// Stored by the sink
    Success,
    /// Rejected or failed; see [`QueuedFile::error`]
    Error,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadState::Idle => "idle",
            UploadState::Compressing => "compressing",
            UploadState::Uploading => "uploading",
            UploadState::Success => "done",
            UploadState::Error => "failed",
        })
    }
}

/// Where a sink put a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    /// Sink-specific location: media id or output path
    pub location: String,
    /// Stored file name
    pub file_name: String,
    /// Stored content type
    pub content_type: String,
    /// Stored size
    pub bytes: u64,
}

/// One entry of the queue
#[derive(Debug, Clone)]
pub struct QueuedFile {
    /// Display name
    pub name: String,
    /// Original bytes as selected
    pub source: MediaFile,
    /// Current state
    pub state: UploadState,
    /// Last reported compression progress
    pub progress: u8,
    /// Failure message when `state` is `Error`
    pub error: Option<String>,
    /// Upload outcome when `state` is `Success`
    pub result: Option<Uploaded>,
}

impl QueuedFile {
    fn new(source: MediaFile) -> Self {
        QueuedFile {
            name: source.name.clone(),
            source,
            state: UploadState::Idle,
            progress: 0,
            error: None,
            result: None,
        }
    }

    fn fail(&mut self, message: String) {
        self.state = UploadState::Error;
        self.error = Some(message);
        self.result = None;
    }
}

/// Receives queue events while [`UploadQueue::run`] is in progress
pub trait QueueObserver: Send + Sync {
    /// A file moved to `state`; `message` carries the error text
    fn state_changed(&self, _index: usize, _state: UploadState, _message: Option<&str>) {}

    /// Compression progress of a file
    fn progress(&self, _index: usize, _percent: u8) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QueueObserver for NoopObserver {}

/// Destination for compressed files
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Store one file
    async fn upload(&self, file: &MediaFile) -> Result<Uploaded, QueueError>;
}

/// Two-phase upload into a mem
#[derive(Debug, Clone)]
pub struct SessionSink {
    service: SessionService,
    user: UserId,
    mem: MemId,
}

impl SessionSink {
    /// Upload as `user` into `mem`
    pub fn new(service: SessionService, user: UserId, mem: MemId) -> Self {
        SessionSink { service, user, mem }
    }
}

#[async_trait]
impl UploadSink for SessionSink {
    async fn upload(&self, file: &MediaFile) -> Result<Uploaded, QueueError> {
        let target = self
            .service
            .request_upload_slot(self.user, self.mem, &file.mime)
            .await?;
        let blob = self.service.upload_bytes(&target, file.data.clone()).await?;
        let record = self
            .service
            .commit_upload(
                self.user,
                self.mem,
                blob,
                UploadMetadata {
                    file_name: file.name.clone(),
                    content_type: file.mime.clone(),
                    file_size: file.len(),
                },
            )
            .await?;

        Ok(Uploaded {
            location: record.id.to_string(),
            file_name: record.file_name,
            content_type: record.content_type,
            bytes: record.file_size,
        })
    }
}

/// Writes files into a directory, never overwriting
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink writing into `dir`, created on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySink { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `name`, then `stem-1.ext`, `stem-2.ext`, ...
fn candidate_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{attempt}.{ext}"),
        _ => format!("{name}-{attempt}"),
    }
}

#[async_trait]
impl UploadSink for DirectorySink {
    async fn upload(&self, file: &MediaFile) -> Result<Uploaded, QueueError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut attempt = 0;
        let (path, mut handle) = loop {
            let path = self.dir.join(candidate_name(&file.name, attempt));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(handle) => break (path, handle),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };
        handle.write_all(&file.data).await?;
        handle.flush().await?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&file.name)
            .to_string();
        Ok(Uploaded {
            location: path.display().to_string(),
            file_name,
            content_type: file.mime.clone(),
            bytes: file.len(),
        })
    }
}

/// Counts after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    /// Files stored by the sink
    pub succeeded: usize,
    /// Files that ended in `Error`
    pub failed: usize,
}

struct Quota {
    quota: MediaQuota,
    participants: usize,
    existing: usize,
}

/// Ordered list of files waiting to be compressed and uploaded
pub struct UploadQueue {
    files: Vec<QueuedFile>,
    uploads: UploadPolicy,
    quota: Option<Quota>,
    concurrency: usize,
}

impl UploadQueue {
    /// Queue checking content types against `uploads`, with no quota
    pub fn new(uploads: UploadPolicy) -> Self {
        UploadQueue {
            files: Vec::new(),
            uploads,
            quota: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Refuse files beyond the mem's quota
    ///
    /// `existing` media are already committed to a mem with `participants`
    /// members.
    pub fn with_quota(mut self, participants: usize, existing: usize) -> Self {
        self.quota = Some(Quota {
            quota: self.uploads.quota,
            participants,
            existing,
        });
        self
    }

    /// Files processed at once; at least one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Add files in order
    ///
    /// The whole selection is refused when it would exceed the quota. Files
    /// outside the content type allow-list are added already failed.
    pub fn enqueue(&mut self, selection: Vec<MediaFile>) -> Result<(), QueueError> {
        if let Some(q) = &self.quota {
            let limit = q.quota.limit(q.participants);
            let queued = self.files.len();
            if q.existing + queued + selection.len() > limit {
                return Err(QueueError::QuotaExceeded {
                    limit,
                    existing: q.existing,
                    queued,
                    adding: selection.len(),
                });
            }
        }

        for source in selection {
            let mut entry = QueuedFile::new(source);
            if self.uploads.classify(&entry.source.mime).is_none() {
                entry.fail(SessionError::UnsupportedType(entry.source.mime.clone()).to_string());
            }
            self.files.push(entry);
        }
        Ok(())
    }

    /// Drop a file and whatever result it had
    pub fn remove(&mut self, index: usize) -> Option<QueuedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Entries in order
    pub fn files(&self) -> &[QueuedFile] {
        &self.files
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Compress and upload every idle file
    ///
    /// Files already in `Success` or `Error` are left alone.
    pub async fn run(
        &mut self,
        compressor: &MediaCompressor,
        sink: &dyn UploadSink,
        observer: Arc<dyn QueueObserver>,
    ) -> QueueSummary {
        let idle: Vec<(usize, MediaFile)> = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.state == UploadState::Idle)
            .map(|(i, f)| (i, f.source.clone()))
            .collect();
        debug!(files = idle.len(), concurrency = self.concurrency, "starting upload queue");

        let outcomes: Vec<(usize, Result<Uploaded, QueueError>)> = stream::iter(idle)
            .map(|(index, source)| {
                let observer = &observer;
                async move {
                    let outcome = process(index, &source, compressor, sink, observer).await;
                    (index, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = QueueSummary::default();
        for (index, outcome) in outcomes {
            let entry = &mut self.files[index];
            match outcome {
                Ok(uploaded) => {
                    entry.state = UploadState::Success;
                    entry.progress = 100;
                    entry.error = None;
                    entry.result = Some(uploaded);
                    summary.succeeded += 1;
                }
                Err(e) => {
                    entry.fail(e.to_string());
                    summary.failed += 1;
                }
            }
        }

        info!(succeeded = summary.succeeded, failed = summary.failed, "upload queue finished");
        summary
    }
}

async fn process(
    index: usize,
    source: &MediaFile,
    compressor: &MediaCompressor,
    sink: &dyn UploadSink,
    observer: &Arc<dyn QueueObserver>,
) -> Result<Uploaded, QueueError> {
    observer.state_changed(index, UploadState::Compressing, None);
    let reporter = Arc::clone(observer);
    let progress = Progress::new(move |percent| reporter.progress(index, percent));

    let result: Result<Uploaded, QueueError> = async {
        let output = compressor.compress_for_kind(source, &progress).await?;
        observer.state_changed(index, UploadState::Uploading, None);
        sink.upload(&output).await
    }
    .await;

    match &result {
        Ok(_) => observer.state_changed(index, UploadState::Success, None),
        Err(e) => {
            warn!(file = %source.name, error = %e, "upload failed");
            let message = e.to_string();
            observer.state_changed(index, UploadState::Error, Some(&message));
        }
    }
    result
}
