//! Memewatch Store - duplicate matching over perceptual fingerprints
//!
//! Persists chat messages with their fingerprints and answers the one
//! question the moderator layer asks: "has something this similar been seen
//! before in this chat, and when (first or most recent)?"
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process, backed by a BK-tree Hamming index per chat.
//! - [`PostgresStore`]: sqlx/PostgreSQL, matching in SQL via `bit_count`.
//!
//! Both implement [`MessageStore`] and produce identical results; small
//! deployments can start in memory and upgrade without changing callers.
//!
//! # Matching contract
//!
//! An image query matches stored messages whose image hash lies within the
//! chat's threshold. A video query requires the video AND audio hashes to
//! both lie within the threshold, so reposting just the audio of an unrelated
//! video (or vice versa) is not flagged. `Ok(None)` is the normal negative
//! result, never an error. A message can match itself; suppressing the
//! self-match is the caller's responsibility.

pub mod bktree;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;

pub use bktree::BkTree;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use model::{
    ChatSettings, MatchOrder, Message, NewMessage, DEFAULT_IMAGE_HAMMING_DISTANCE,
    DEFAULT_VIDEO_HAMMING_DISTANCE,
};
pub use postgres::PostgresStore;

use async_trait::async_trait;
use memewatch_core::Fingerprint;

/// Message persistence plus bounded-Hamming duplicate lookup, scoped per
/// chat.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a message, or refresh its fingerprints if `(chat_id,
    /// message_id)` is already stored (edited media). The original creation
    /// time is preserved on refresh.
    async fn upsert_message(&self, message: NewMessage) -> Result<Message>;

    /// Fetch one message by its chat-scoped id.
    async fn get_message(&self, chat_id: i64, message_id: i64) -> Result<Option<Message>>;

    /// The first or last stored message whose image hash lies within
    /// `threshold` bits of `hash`.
    async fn find_matching_by_image_hash(
        &self,
        chat_id: i64,
        hash: Fingerprint,
        threshold: u32,
        order: MatchOrder,
    ) -> Result<Option<Message>>;

    /// The first or last stored message whose video AND audio hashes both
    /// lie within `threshold` bits of the query pair. Messages with only one
    /// of the two hashes set never match.
    async fn find_matching_by_video_hash(
        &self,
        chat_id: i64,
        video_hash: Fingerprint,
        audio_hash: Fingerprint,
        threshold: u32,
        order: MatchOrder,
    ) -> Result<Option<Message>>;

    /// Per-chat thresholds, created lazily with defaults on first need.
    async fn get_chat_settings(&self, chat_id: i64) -> Result<ChatSettings>;

    /// Persist moderator-adjusted thresholds.
    async fn upsert_chat_settings(&self, settings: ChatSettings) -> Result<()>;

    async fn get_first_matching_message_by_image_hash(
        &self,
        chat_id: i64,
        hash: Fingerprint,
        threshold: u32,
    ) -> Result<Option<Message>> {
        self.find_matching_by_image_hash(chat_id, hash, threshold, MatchOrder::First)
            .await
    }

    async fn get_last_matching_message_by_image_hash(
        &self,
        chat_id: i64,
        hash: Fingerprint,
        threshold: u32,
    ) -> Result<Option<Message>> {
        self.find_matching_by_image_hash(chat_id, hash, threshold, MatchOrder::Last)
            .await
    }

    async fn get_first_matching_message_by_video_hash(
        &self,
        chat_id: i64,
        video_hash: Fingerprint,
        audio_hash: Fingerprint,
        threshold: u32,
    ) -> Result<Option<Message>> {
        self.find_matching_by_video_hash(chat_id, video_hash, audio_hash, threshold, MatchOrder::First)
            .await
    }

    async fn get_last_matching_message_by_video_hash(
        &self,
        chat_id: i64,
        video_hash: Fingerprint,
        audio_hash: Fingerprint,
        threshold: u32,
    ) -> Result<Option<Message>> {
        self.find_matching_by_video_hash(chat_id, video_hash, audio_hash, threshold, MatchOrder::Last)
            .await
    }
}
