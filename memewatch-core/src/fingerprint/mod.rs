//! Perceptual fingerprints and their generators.
//!
//! A fingerprint is a 64-bit value compared by Hamming distance, never by
//! equality: collisions and near-collisions are expected and desired. One
//! DCT-based hashing algorithm serves both visual and acoustic content - audio
//! fingerprints are projected into an image first (see [`audio`]).

pub mod audio;
pub mod phash;

pub use audio::{chromaprint_fingerprint, fingerprint_to_image, phash_audio, MAX_FINGERPRINT_SECS};
pub use phash::{phash_bytes, phash_file, phash_image};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A 64-bit perceptual fingerprint.
///
/// Two fingerprints are "similar" iff the population count of their bitwise
/// XOR is at most a per-chat threshold. Outputs of distinct hash functions
/// (image vs audio) are never compared against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Hamming distance: number of differing bits.
    pub fn distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Whether `other` lies within `threshold` bits of `self`.
    pub fn is_within(self, other: Self, threshold: u32) -> bool {
        self.distance(other) <= threshold
    }

    /// Hex rendering, e.g. for logs and moderator replies.
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }

    /// Parse a fingerprint from its 16-digit hex rendering.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CoreError::Image(format!("invalid fingerprint hex: {e}")))?;
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| CoreError::Image("fingerprint hex must be 8 bytes".into()))?;
        Ok(Self(u64::from_be_bytes(bytes)))
    }
}

impl From<u64> for Fingerprint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Fingerprints of one video: the collage hash plus, when the source has an
/// audio stream, the audio-track hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFingerprint {
    pub video: Fingerprint,
    /// Unset when the source video has no audio stream.
    pub audio: Option<Fingerprint>,
}

/// Fingerprints attached to one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFingerprint {
    Image(Fingerprint),
    Video(VideoFingerprint),
}
