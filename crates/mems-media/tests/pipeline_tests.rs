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

//! End-to-end pipeline behaviour with scripted engines
//!
//! Transcoding and frame capture are replaced by in-test implementations of
//! the engine traits, so no external binary is needed.

use async_trait::async_trait;
use mems_media::{
    CompressionPolicy, EngineSlot, EngineState, ImageAttempt, ImageCompressor, MediaCompressor, MediaError,
    MediaFile, Progress, RasterFormat, TranscodeEngine, TranscodeJob, VideoProbe,
};
use mems_media::{FrameSource, Result};
use mems_test_utils::images;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct ScriptedEngine {
    load_error: Option<String>,
    /// Output size written by each successive transcode
    sizes: Vec<usize>,
    /// Transcode index that errors instead of writing output
    fail_at: Option<usize>,
    jobs: Mutex<Vec<TranscodeJob>>,
}

#[async_trait]
impl TranscodeEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn load(&self) -> Result<()> {
        match &self.load_error {
            Some(reason) => Err(MediaError::engine_unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    async fn transcode(&self, job: &TranscodeJob, progress: &Progress) -> Result<()> {
        let index = {
            let mut jobs = self.jobs.lock().unwrap();
            jobs.push(job.clone());
            jobs.len() - 1
        };
        progress.report(50.0);
        if self.fail_at == Some(index) {
            return Err(MediaError::compression("encoder crashed"));
        }
        let size = self.sizes.get(index).copied().unwrap_or(1);
        tokio::fs::write(&job.output, vec![0u8; size]).await?;
        progress.complete();
        Ok(())
    }
}

#[derive(Debug)]
struct ScriptedFrames {
    probe: Option<VideoProbe>,
    frame: Vec<u8>,
    captures: Mutex<Vec<f64>>,
}

impl ScriptedFrames {
    fn new(frame: Vec<u8>) -> Self {
        ScriptedFrames {
            probe: Some(VideoProbe {
                duration_seconds: 12.0,
                width: 1920,
                height: 1080,
            }),
            frame,
            captures: Mutex::new(Vec::new()),
        }
    }

    fn undecodable() -> Self {
        ScriptedFrames {
            probe: None,
            frame: Vec::new(),
            captures: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FrameSource for ScriptedFrames {
    async fn probe(&self, _input: &Path) -> Result<VideoProbe> {
        self.probe.ok_or_else(|| MediaError::decode("moov atom not found"))
    }

    async fn capture(&self, _input: &Path, at_seconds: f64, _max: u32, _quality: f32) -> Result<Vec<u8>> {
        self.captures.lock().unwrap().push(at_seconds);
        Ok(self.frame.clone())
    }
}

struct Harness {
    compressor: MediaCompressor,
    engine: Arc<ScriptedEngine>,
    frames: Arc<ScriptedFrames>,
}

fn harness(engine: ScriptedEngine, frames: ScriptedFrames) -> Harness {
    let engine = Arc::new(engine);
    let frames = Arc::new(frames);
    let slot = Arc::new(EngineSlot::new(Arc::clone(&engine) as Arc<dyn TranscodeEngine>));
    let compressor = MediaCompressor::new(
        CompressionPolicy::default(),
        slot,
        Arc::clone(&frames) as Arc<dyn FrameSource>,
    );
    Harness {
        compressor,
        engine,
        frames,
    }
}

fn small_frame() -> Vec<u8> {
    images::jpeg(images::gradient(128, 72), 80)
}

fn recording() -> (Progress, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (Progress::new(move |p| sink.lock().unwrap().push(p)), seen)
}

fn assert_progress_ok(seen: &[u8]) {
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "progress not increasing: {seen:?}");
    assert_eq!(seen.last().copied(), Some(100), "progress did not finish: {seen:?}");
}

fn video(name: &str, mime: &str, len: usize) -> MediaFile {
    MediaFile::new(name, mime, vec![0x42u8; len])
}

#[tokio::test]
async fn test_within_budget_is_identity() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("tiny.png", "image/png", images::png(images::gradient(32, 32)));
    let (progress, seen) = recording();

    let out = h
        .compressor
        .compress(&source, source.len(), &progress)
        .await
        .unwrap();

    assert_eq!(out, source);
    assert_eq!(*seen.lock().unwrap(), vec![100]);
}

#[tokio::test]
async fn test_already_compressed_output_is_stable() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("photo.jpg", "image/jpeg", images::jpeg(images::noise(900, 600, 3), 95));
    let budget = source.len() / 2;

    let once = h.compressor.compress(&source, budget, &Progress::silent()).await.unwrap();
    assert!(once.len() <= budget);
    let twice = h.compressor.compress(&once, budget, &Progress::silent()).await.unwrap();
    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_unknown_type_passes_through() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("agenda.pdf", "application/pdf", vec![9u8; 50_000]);
    let (progress, seen) = recording();

    let out = h.compressor.compress(&source, 1_000, &progress).await.unwrap();

    assert_eq!(out, source);
    assert_eq!(*seen.lock().unwrap(), vec![100]);
}

#[tokio::test]
async fn test_zero_budget_rejected() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("a.jpg", "image/jpeg", vec![1u8; 10]);
    let err = h.compressor.compress(&source, 0, &Progress::silent()).await.unwrap_err();
    assert!(matches!(err, MediaError::InvalidBudget(0)));
}

#[tokio::test]
async fn test_image_first_fitting_tier_wins() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("beach.jpg", "image/jpeg", images::jpeg(images::noise(1600, 1200, 11), 95));

    let images = ImageCompressor::default();
    let plan = images.plan(&source.mime);
    let mut sizes = Vec::new();
    for attempt in &plan {
        sizes.push(images.encode_attempt(&source, *attempt).await.unwrap());
    }
    // Budget lands exactly on the 1280px tier
    let budget = sizes[2].len() as u64;
    assert!(sizes[0].len() as u64 > budget && sizes[1].len() as u64 > budget);

    let (progress, seen) = recording();
    let out = h.compressor.compress(&source, budget, &progress).await.unwrap();

    assert_eq!(out.data.as_ref(), sizes[2].as_slice());
    assert_eq!(out.mime, "image/jpeg");
    assert_eq!(out.name, "beach.jpg");
    assert_progress_ok(&seen.lock().unwrap());
}

#[tokio::test]
async fn test_png_keeps_format_when_it_fits() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let big = images::gradient(2400, 1600);
    let source = MediaFile::new("chart.png", "image/png", images::png(big));

    let first = ImageCompressor::default()
        .encode_attempt(
            &source,
            ImageAttempt {
                tier: 0,
                format: RasterFormat::Png,
                max_dimension: 1920,
                quality: 80,
            },
        )
        .await
        .unwrap();
    assert!((first.len() as u64) < source.len());

    let out = h
        .compressor
        .compress(&source, first.len() as u64, &Progress::silent())
        .await
        .unwrap();
    assert_eq!(out.mime, "image/png");
    assert_eq!(out.name, "chart.png");
    assert_eq!(out.data.as_ref(), first.as_slice());
}

#[tokio::test]
async fn test_image_floor_returned_when_nothing_fits() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("crowd.jpg", "image/jpeg", images::jpeg(images::noise(1600, 1200, 5), 95));
    let (progress, seen) = recording();

    let out = h.compressor.compress(&source, 1, &progress).await.unwrap();

    let images = ImageCompressor::default();
    let floor_attempt = *images.plan(&source.mime).last().unwrap();
    let floor = images.encode_attempt(&source, floor_attempt).await.unwrap();
    assert_eq!(out.data.as_ref(), floor.as_slice());
    assert!(out.len() < source.len());
    assert_progress_ok(&seen.lock().unwrap());
}

#[tokio::test]
async fn test_image_never_grows() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    // Already at minimum quality: every tier re-encodes larger
    let source = MediaFile::new("thumb.jpg", "image/jpeg", images::jpeg(images::gradient(96, 96), 1));

    let out = h.compressor.compress(&source, 1, &Progress::silent()).await.unwrap();
    assert_eq!(out, source);
}

#[tokio::test]
async fn test_corrupt_image_is_compression_error() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("broken.jpg", "image/jpeg", images::corrupt_bytes(100_000));
    let (progress, seen) = recording();

    let err = h.compressor.compress(&source, 10_000, &progress).await.unwrap_err();

    assert!(err.is_compression());
    assert!(!seen.lock().unwrap().contains(&100));
}

#[tokio::test]
async fn test_video_first_tier_that_fits() {
    let h = harness(
        ScriptedEngine {
            sizes: vec![3_000_000, 900_000, 400_000, 100_000],
            ..Default::default()
        },
        ScriptedFrames::new(small_frame()),
    );
    let source = video("clip.mp4", "video/mp4", 10_000_000);
    let (progress, seen) = recording();

    let out = h.compressor.compress(&source, 1_000_000, &progress).await.unwrap();

    assert_eq!(out.mime, "video/webm");
    assert_eq!(out.name, "clip.webm");
    assert_eq!(out.len(), 900_000);

    let jobs = h.engine.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!((jobs[0].width, jobs[0].height, jobs[0].bitrate), (720, 404, 1_000_000));
    assert_eq!((jobs[1].width, jobs[1].height, jobs[1].bitrate), (480, 270, 500_000));
    assert!(jobs.iter().all(|j| j.frame_rate == 15));
    assert!(h.frames.captures.lock().unwrap().is_empty());
    assert_progress_ok(&seen.lock().unwrap());
}

#[tokio::test]
async fn test_video_tiers_exhausted_becomes_still_frame() {
    let h = harness(
        ScriptedEngine {
            sizes: vec![5_000_000; 4],
            ..Default::default()
        },
        ScriptedFrames::new(small_frame()),
    );
    let source = video("party.mp4", "video/mp4", 10_000_000);
    let (progress, seen) = recording();

    let out = h.compressor.compress(&source, 1_000_000, &progress).await.unwrap();

    assert_eq!(out.mime, "image/jpeg");
    assert_eq!(out.name, "party.jpg");
    assert_eq!(h.engine.jobs.lock().unwrap().len(), 4);
    assert_eq!(*h.frames.captures.lock().unwrap(), vec![6.0]);
    assert_progress_ok(&seen.lock().unwrap());
}

#[tokio::test]
async fn test_engine_load_failure_becomes_still_frame() {
    let h = harness(
        ScriptedEngine {
            load_error: Some("wasm core failed to load".into()),
            ..Default::default()
        },
        ScriptedFrames::new(small_frame()),
    );
    let source = video("holiday.mov", "video/quicktime", 50_000_000);
    let (progress, seen) = recording();

    let out = h.compressor.compress(&source, 1_000_000, &progress).await.unwrap();

    assert_eq!(out.mime, "image/jpeg");
    assert_eq!(out.name, "holiday.jpg");
    assert!(out.len() <= 1_000_000);
    assert_eq!(*h.frames.captures.lock().unwrap(), vec![6.0]);
    assert!(h.engine.jobs.lock().unwrap().is_empty());
    assert!(matches!(h.compressor.engine().state().await, EngineState::Failed(_)));
    assert!(!h.compressor.video_compression_available().await);
    assert_progress_ok(&seen.lock().unwrap());
}

#[tokio::test]
async fn test_engine_error_mid_run_becomes_still_frame() {
    let h = harness(
        ScriptedEngine {
            sizes: vec![5_000_000; 4],
            fail_at: Some(1),
            ..Default::default()
        },
        ScriptedFrames::new(small_frame()),
    );
    let source = video("clip.webm", "video/webm", 4_000_000);

    let out = h.compressor.compress(&source, 1_000_000, &Progress::silent()).await.unwrap();

    assert_eq!(out.mime, "image/jpeg");
    assert_eq!(h.engine.jobs.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_oversized_frame_goes_through_image_tiers() {
    let frame = images::jpeg(images::noise(720, 405, 9), 100);
    let frame_len = frame.len() as u64;
    let h = harness(
        ScriptedEngine {
            load_error: Some("unsupported".into()),
            ..Default::default()
        },
        ScriptedFrames::new(frame),
    );
    let source = video("night.mov", "video/quicktime", 20_000_000);

    let out = h
        .compressor
        .compress(&source, frame_len / 3, &Progress::silent())
        .await
        .unwrap();

    assert_eq!(out.mime, "image/jpeg");
    assert!(out.len() < frame_len);
}

#[tokio::test]
async fn test_undecodable_video_is_decode_error() {
    let h = harness(
        ScriptedEngine {
            load_error: Some("unsupported".into()),
            ..Default::default()
        },
        ScriptedFrames::undecodable(),
    );
    let source = video("broken.mp4", "video/mp4", 2_000_000);

    let err = h
        .compressor
        .compress(&source, 1_000_000, &Progress::silent())
        .await
        .unwrap_err();
    assert!(err.is_decode());
}

#[tokio::test]
async fn test_budget_for_kind_uses_policy() {
    let h = harness(ScriptedEngine::default(), ScriptedFrames::new(small_frame()));
    let source = MediaFile::new("notes.txt", "text/plain", vec![1u8; 5_000_000]);
    let (progress, seen) = recording();

    let out = h.compressor.compress_for_kind(&source, &progress).await.unwrap();
    assert_eq!(out, source);
    assert_eq!(*seen.lock().unwrap(), vec![100]);
}
