//! Fingerprint-engine orchestration.
//!
//! One engine instance serves a whole process. Fingerprinting a single piece
//! of media is sequential and blocking - probe, extract, compose, hash, one
//! external tool at a time - while computations for different messages run
//! concurrently, each in its own scratch workspace, capped by a semaphore so
//! subprocess fan-out stays bounded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::collage::{build_collage, COLLAGE_WIDTH};
use crate::command::{CommandRunner, SystemRunner};
use crate::error::{CoreError, Result};
use crate::fingerprint::audio::{phash_audio, MAX_FINGERPRINT_SECS};
use crate::fingerprint::phash::{phash_bytes, phash_file, phash_image};
use crate::fingerprint::{Fingerprint, VideoFingerprint};
use crate::media::audio::{extract_audio, pad_audio, MIN_AUDIO_SECS};
use crate::media::frames::{sample_frames, DEFAULT_FRAME_COUNT};
use crate::workspace::Workspace;

/// Engine configuration.
///
/// The chromaprint tool location is an explicit field rather than ambient
/// process state so tests can point it at a stub.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the chromaprint tool binary.
    pub fpcalc_path: PathBuf,
    /// Frames sampled per video (default: 12).
    pub frame_count: usize,
    /// Collage output width in pixels (default: 1024).
    pub collage_width: u32,
    /// Minimum audio duration before fingerprinting, seconds (default: 3).
    pub min_audio_secs: u32,
    /// Fingerprint-length cap passed to the chromaprint tool (default: 60).
    pub max_fingerprint_secs: u32,
    /// Maximum simultaneously running video-fingerprint computations
    /// (default: 4).
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fpcalc_path: PathBuf::from("fpcalc"),
            frame_count: DEFAULT_FRAME_COUNT,
            collage_width: COLLAGE_WIDTH,
            min_audio_secs: MIN_AUDIO_SECS,
            max_fingerprint_secs: MAX_FINGERPRINT_SECS,
            max_concurrent: 4,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized: `FPCALC_PATH`, `MEMEWATCH_MAX_CONCURRENT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("FPCALC_PATH") {
            if !path.is_empty() {
                config.fpcalc_path = PathBuf::from(path);
            }
        }

        if let Some(max) = std::env::var("MEMEWATCH_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_concurrent = max;
        }

        config
    }
}

/// Computes perceptual fingerprints for still images and video/audio pairs.
pub struct FingerprintEngine {
    config: EngineConfig,
    runner: Arc<dyn CommandRunner>,
    limiter: Arc<Semaphore>,
}

impl FingerprintEngine {
    /// Create an engine backed by real subprocesses.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Create an engine with a custom command runner (test doubles).
    pub fn with_runner(config: EngineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            runner,
            limiter,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fingerprint a still image file.
    #[instrument(level = "info", skip(self), fields(path = %path.display()))]
    pub fn fingerprint_image(&self, path: &Path) -> Result<Fingerprint> {
        phash_file(path)
    }

    /// Fingerprint a still image from raw bytes.
    pub fn fingerprint_image_bytes(&self, data: &[u8]) -> Result<Fingerprint> {
        phash_bytes(data)
    }

    /// Fingerprint a video file: collage hash plus, when an audio stream is
    /// present, the audio-track hash.
    ///
    /// A missing audio stream is not an error - the audio fingerprint is
    /// simply unset. Every other failure aborts the whole computation and no
    /// fingerprint must be persisted for the media.
    #[instrument(level = "info", skip(self), fields(path = %path.display()))]
    pub async fn fingerprint_video(&self, path: &Path) -> Result<VideoFingerprint> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| CoreError::Workspace(format!("fingerprint limiter closed: {e}")))?;

        let workspace = Workspace::acquire()?;

        let video = self.video_phash(&workspace, path).await?;
        let audio = match self.audio_phash(&workspace, path).await {
            Ok(hash) => Some(hash),
            Err(CoreError::NoAudioStream) => {
                warn!(path = %path.display(), "no audio stream, skipping audio fingerprint");
                None
            }
            Err(e) => return Err(e),
        };

        workspace.close();
        Ok(VideoFingerprint { video, audio })
    }

    async fn video_phash(&self, workspace: &Workspace, video_path: &Path) -> Result<Fingerprint> {
        let frames_dir = workspace.subdir("frames")?;
        let frames = sample_frames(
            self.runner.as_ref(),
            video_path,
            &frames_dir,
            self.config.frame_count,
        )
        .await?;

        let collage = build_collage(&frames, self.config.collage_width)?;
        phash_image(&image::DynamicImage::ImageRgba8(collage))
    }

    async fn audio_phash(&self, workspace: &Workspace, video_path: &Path) -> Result<Fingerprint> {
        let extracted = workspace.file(&format!("{}.mp3", Uuid::new_v4()));
        extract_audio(self.runner.as_ref(), video_path, &extracted).await?;

        let padded = workspace.file(&format!("{}.mp3", Uuid::new_v4()));
        pad_audio(
            self.runner.as_ref(),
            &extracted,
            &padded,
            self.config.min_audio_secs,
        )
        .await?;

        phash_audio(
            self.runner.as_ref(),
            &self.config.fpcalc_path,
            &padded,
            self.config.max_fingerprint_secs,
        )
        .await
    }
}
