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

//! Transcoding engine lifecycle
//!
//! The video transcoder is a process-wide resource with an explicit
//! lifecycle:
//!
//! ```text
//! Uninitialized --init()--> Initializing --ok--> Ready
//!                                        \--err-> Failed (sticky)
//! ```
//!
//! [`EngineSlot::init`] is called by the orchestrator before first use and
//! caches the outcome; concurrent callers wait on the same initialization.
//! A failed load is not retried for the life of the slot. Every transcode
//! holds the slot's exclusive lock, so no two tier attempts ever run on the
//! engine at the same time.

use crate::error::{MediaError, Result};
use crate::ffmpeg::{FfmpegConfig, FfmpegEngine};
use crate::progress::Progress;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

/// One transcode attempt at a fixed tier
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    /// Staged source file
    pub input: PathBuf,

    /// Destination of the encoded file
    pub output: PathBuf,

    /// Output width in pixels (even)
    pub width: u32,

    /// Output height in pixels (even)
    pub height: u32,

    /// Target bitrate in bits per second
    pub bitrate: u32,

    /// Output frame rate
    pub frame_rate: u32,

    /// Source duration, used to turn encoder timestamps into a ratio
    pub duration_seconds: f64,
}

/// A video transcoder
#[async_trait]
pub trait TranscodeEngine: Send + Sync + fmt::Debug {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Load the engine and check it can produce web-playable output
    async fn load(&self) -> Result<()>;

    /// Encode `job.input` into `job.output`
    ///
    /// Progress is reported over the full `[0, 100]` of `progress`.
    async fn transcode(&self, job: &TranscodeJob, progress: &Progress) -> Result<()>;
}

/// Lifecycle state of an [`EngineSlot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// `init` has not been called
    Uninitialized,
    /// A load is in flight
    Initializing,
    /// Loaded and usable
    Ready,
    /// Load failed; carries the reason
    Failed(String),
}

impl EngineState {
    /// Whether the engine can transcode
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Uninitialized => f.write_str("uninitialized"),
            EngineState::Initializing => f.write_str("initializing"),
            EngineState::Ready => f.write_str("ready"),
            EngineState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Lazily initialized, exclusively used transcoding engine
pub struct EngineSlot {
    engine: Arc<dyn TranscodeEngine>,
    state: RwLock<EngineState>,
    init_lock: Mutex<()>,
    exclusive: Mutex<()>,
}

struct SharedFfmpeg {
    slot: Arc<EngineSlot>,
    ffmpeg: Arc<FfmpegEngine>,
}

static SHARED: OnceLock<SharedFfmpeg> = OnceLock::new();

impl EngineSlot {
    /// Wrap an engine; nothing is loaded until [`EngineSlot::init`]
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        EngineSlot {
            engine,
            state: RwLock::new(EngineState::Uninitialized),
            init_lock: Mutex::new(()),
            exclusive: Mutex::new(()),
        }
    }

    /// Process-wide ffmpeg engine and the slot wrapping it
    ///
    /// The first call's `config` builds the engine; later calls get the same
    /// pair and a warning when their config differs.
    pub fn shared_with(config: FfmpegConfig) -> (Arc<EngineSlot>, Arc<FfmpegEngine>) {
        let shared = SHARED.get_or_init(|| {
            let ffmpeg = Arc::new(FfmpegEngine::new(config.clone()));
            let slot = Arc::new(EngineSlot::new(Arc::clone(&ffmpeg) as Arc<dyn TranscodeEngine>));
            SharedFfmpeg { slot, ffmpeg }
        });
        if shared.ffmpeg.config() != &config {
            warn!(
                requested = %config.ffmpeg_path.display(),
                in_use = %shared.ffmpeg.config().ffmpeg_path.display(),
                "ffmpeg engine already created with a different config"
            );
        }
        (Arc::clone(&shared.slot), Arc::clone(&shared.ffmpeg))
    }

    /// Name of the wrapped engine
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Current lifecycle state
    pub async fn state(&self) -> EngineState {
        self.state.read().await.clone()
    }

    /// Whether the engine reached `Ready`
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.is_ready()
    }

    /// Load the engine once
    ///
    /// Returns immediately when already `Ready` or `Failed`. A failure is
    /// reported as [`MediaError::EngineUnavailable`].
    #[instrument(skip(self), fields(engine = self.engine.name()))]
    pub async fn init(&self) -> Result<()> {
        if let Some(result) = self.settled().await {
            return result;
        }

        let _guard = self.init_lock.lock().await;
        // Another caller may have finished while we waited
        if let Some(result) = self.settled().await {
            return result;
        }

        *self.state.write().await = EngineState::Initializing;
        let next = match self.engine.load().await {
            Ok(()) => {
                info!("transcoding engine ready");
                EngineState::Ready
            }
            Err(e) => {
                warn!(error = %e, "transcoding engine failed to load");
                EngineState::Failed(e.to_string())
            }
        };
        *self.state.write().await = next;

        self.settled()
            .await
            .unwrap_or_else(|| Err(MediaError::engine_unavailable("engine left initializing")))
    }

    /// Run one transcode with exclusive use of the engine
    pub async fn transcode(&self, job: &TranscodeJob, progress: &Progress) -> Result<()> {
        if !self.is_ready().await {
            return Err(MediaError::engine_unavailable(format!(
                "{} is {}",
                self.engine.name(),
                self.state().await
            )));
        }
        let _exclusive = self.exclusive.lock().await;
        self.engine.transcode(job, progress).await
    }

    async fn settled(&self) -> Option<Result<()>> {
        match &*self.state.read().await {
            EngineState::Ready => Some(Ok(())),
            EngineState::Failed(reason) => Some(Err(MediaError::engine_unavailable(reason.clone()))),
            EngineState::Uninitialized | EngineState::Initializing => None,
        }
    }
}

impl fmt::Debug for EngineSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSlot")
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}
