//! Memewatch Core - perceptual fingerprinting for chat media
//!
//! This crate generates compact, rotation/compression-tolerant fingerprints
//! for images and video+audio pairs so a moderator bot can flag reposts.
//!
//! # Pipeline
//!
//! - Still image: decode and compute a 64-bit DCT perceptual hash.
//! - Video: probe duration/frame rate, extract evenly-spaced frames, tile
//!   them into a single collage still, hash the collage; separately extract
//!   the audio track, pad short clips with silence, run the chromaprint tool,
//!   project the raw fingerprint integers into an image and hash that too.
//!
//! All subprocess work happens in ephemeral scratch workspaces that are
//! removed on every exit path, and goes through the [`command::CommandRunner`]
//! seam so tests can substitute canned tool outputs.
//!
//! # Example
//!
//! ```no_run
//! use memewatch_core::{EngineConfig, FingerprintEngine};
//!
//! # async fn example() -> memewatch_core::Result<()> {
//! let engine = FingerprintEngine::new(EngineConfig::from_env());
//!
//! let image_hash = engine.fingerprint_image(std::path::Path::new("meme.jpg"))?;
//!
//! let video = engine.fingerprint_video(std::path::Path::new("meme.mp4")).await?;
//! println!("video {} audio {:?}", video.video, video.audio);
//! # Ok(())
//! # }
//! ```

pub mod collage;
pub mod command;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod media;
pub mod workspace;

// Re-export main types for convenience
pub use collage::{build_collage, COLLAGE_WIDTH};
pub use command::{CommandRunner, MockRunner, SystemRunner};
pub use engine::{EngineConfig, FingerprintEngine};
pub use error::{CoreError, Result};
pub use fingerprint::{
    phash_bytes, phash_file, phash_image, Fingerprint, MediaFingerprint, VideoFingerprint,
};
pub use media::{DEFAULT_FRAME_COUNT, MIN_AUDIO_SECS};
pub use workspace::Workspace;
