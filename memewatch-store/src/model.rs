//! Message and chat-settings entities.

use chrono::{DateTime, Utc};
use memewatch_core::{Fingerprint, VideoFingerprint};
use serde::{Deserialize, Serialize};

/// Default per-chat threshold for image matches, in bits.
pub const DEFAULT_IMAGE_HAMMING_DISTANCE: u32 = 3;
/// Default per-chat threshold for video matches, in bits.
pub const DEFAULT_VIDEO_HAMMING_DISTANCE: u32 = 11;

/// A stored chat message with its fingerprints.
///
/// Per message, at most one of `image_hash` or the `{video_hash, audio_hash}`
/// pair is populated (text-only messages carry neither). `audio_hash` stays
/// unset for a silent video; such messages never match video queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned insertion sequence, also the stable tie-breaker for
    /// equal creation times.
    pub id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub image_hash: Option<Fingerprint>,
    pub video_hash: Option<Fingerprint>,
    pub audio_hash: Option<Fingerprint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for inserting (or re-fingerprinting) a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub image_hash: Option<Fingerprint>,
    pub video_hash: Option<Fingerprint>,
    pub audio_hash: Option<Fingerprint>,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// A message carrying a still image.
    pub fn image(
        chat_id: i64,
        message_id: i64,
        hash: Fingerprint,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id,
            message_id,
            image_hash: Some(hash),
            video_hash: None,
            audio_hash: None,
            created_at,
        }
    }

    /// A message carrying a video.
    pub fn video(
        chat_id: i64,
        message_id: i64,
        fingerprint: VideoFingerprint,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id,
            message_id,
            image_hash: None,
            video_hash: Some(fingerprint.video),
            audio_hash: fingerprint.audio,
            created_at,
        }
    }

    /// A text-only message, persisted without fingerprints.
    pub fn text(chat_id: i64, message_id: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            message_id,
            image_hash: None,
            video_hash: None,
            audio_hash: None,
            created_at,
        }
    }
}

/// Per-chat matching configuration, keyed by chat id.
///
/// Created lazily with defaults on first need, mutated by moderator commands,
/// read on every fingerprint comparison for that chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub chat_id: i64,
    pub image_hamming_distance: u32,
    pub video_hamming_distance: u32,
}

impl ChatSettings {
    pub fn defaults(chat_id: i64) -> Self {
        Self {
            chat_id,
            image_hamming_distance: DEFAULT_IMAGE_HAMMING_DISTANCE,
            video_hamming_distance: DEFAULT_VIDEO_HAMMING_DISTANCE,
        }
    }
}

/// Which qualifying prior message a duplicate query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOrder {
    /// Earliest by creation time: the canonical original.
    First,
    /// Most recent by creation time: the immediately preceding occurrence.
    Last,
}
