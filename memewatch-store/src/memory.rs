//! In-memory store with a per-chat BK-tree Hamming index.
//!
//! The reference backend: results define the contract the PostgreSQL backend
//! must reproduce. Indexes are prefilters only - every candidate is verified
//! against the message's current hashes. Re-fingerprinting a message rebuilds
//! the shard's trees, keeping index size proportional to the message count.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use memewatch_core::Fingerprint;
use tracing::debug;

use crate::bktree::BkTree;
use crate::error::Result;
use crate::model::{ChatSettings, MatchOrder, Message, NewMessage};
use crate::MessageStore;

#[derive(Default)]
struct ChatShard {
    /// Messages in insertion order; the vector index doubles as the BK-tree
    /// entry id.
    messages: Vec<Message>,
    by_message_id: HashMap<i64, usize>,
    image_index: BkTree,
    video_index: BkTree,
}

impl ChatShard {
    fn index_message(&mut self, idx: usize, message: &Message) {
        if let Some(hash) = message.image_hash {
            self.image_index.insert(hash.0, idx as u64);
        }
        if let Some(hash) = message.video_hash {
            self.video_index.insert(hash.0, idx as u64);
        }
    }

    /// Re-derive both trees from the current messages. The BK-tree has no
    /// removal operation, so hash refreshes rebuild instead of leaving stale
    /// entries behind.
    fn rebuild_indexes(&mut self) {
        let mut image_index = BkTree::new();
        let mut video_index = BkTree::new();
        for (idx, message) in self.messages.iter().enumerate() {
            if let Some(hash) = message.image_hash {
                image_index.insert(hash.0, idx as u64);
            }
            if let Some(hash) = message.video_hash {
                video_index.insert(hash.0, idx as u64);
            }
        }
        self.image_index = image_index;
        self.video_index = video_index;
    }

    fn select(
        &self,
        mut indices: Vec<u64>,
        order: MatchOrder,
        matches: impl Fn(&Message) -> bool,
    ) -> Option<Message> {
        indices.sort_unstable();
        indices.dedup();

        let qualifying = indices
            .into_iter()
            .filter_map(|idx| self.messages.get(idx as usize))
            .filter(|m| matches(m));

        let found = match order {
            MatchOrder::First => qualifying.min_by_key(|m| (m.created_at, m.id)),
            MatchOrder::Last => qualifying.max_by_key(|m| (m.created_at, m.id)),
        };
        found.cloned()
    }
}

/// In-process [`MessageStore`] for tests and small deployments.
#[derive(Default)]
pub struct MemoryStore {
    chats: DashMap<i64, ChatShard>,
    settings: DashMap<i64, ChatSettings>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn upsert_message(&self, message: NewMessage) -> Result<Message> {
        let mut shard = self.chats.entry(message.chat_id).or_default();

        let stored = if let Some(&idx) = shard.by_message_id.get(&message.message_id) {
            debug!(
                chat_id = message.chat_id,
                message_id = message.message_id,
                "overwriting message"
            );
            let existing = &mut shard.messages[idx];
            existing.image_hash = message.image_hash;
            existing.video_hash = message.video_hash;
            existing.audio_hash = message.audio_hash;
            existing.updated_at = message.created_at;
            let stored = existing.clone();
            shard.rebuild_indexes();
            stored
        } else {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            let idx = shard.messages.len();
            let stored = Message {
                id,
                chat_id: message.chat_id,
                message_id: message.message_id,
                image_hash: message.image_hash,
                video_hash: message.video_hash,
                audio_hash: message.audio_hash,
                created_at: message.created_at,
                updated_at: message.created_at,
            };
            shard.messages.push(stored.clone());
            shard.by_message_id.insert(message.message_id, idx);
            shard.index_message(idx, &stored);
            stored
        };

        Ok(stored)
    }

    async fn get_message(&self, chat_id: i64, message_id: i64) -> Result<Option<Message>> {
        let Some(shard) = self.chats.get(&chat_id) else {
            return Ok(None);
        };
        Ok(shard
            .by_message_id
            .get(&message_id)
            .and_then(|&idx| shard.messages.get(idx))
            .cloned())
    }

    async fn find_matching_by_image_hash(
        &self,
        chat_id: i64,
        hash: Fingerprint,
        threshold: u32,
        order: MatchOrder,
    ) -> Result<Option<Message>> {
        let Some(shard) = self.chats.get(&chat_id) else {
            return Ok(None);
        };

        let candidates = shard.image_index.find_within(hash.0, threshold);
        Ok(shard.select(candidates, order, |m| {
            m.image_hash.is_some_and(|h| h.is_within(hash, threshold))
        }))
    }

    async fn find_matching_by_video_hash(
        &self,
        chat_id: i64,
        video_hash: Fingerprint,
        audio_hash: Fingerprint,
        threshold: u32,
        order: MatchOrder,
    ) -> Result<Option<Message>> {
        let Some(shard) = self.chats.get(&chat_id) else {
            return Ok(None);
        };

        let candidates = shard.video_index.find_within(video_hash.0, threshold);
        Ok(shard.select(candidates, order, |m| {
            let video_ok = m
                .video_hash
                .is_some_and(|h| h.is_within(video_hash, threshold));
            let audio_ok = m
                .audio_hash
                .is_some_and(|h| h.is_within(audio_hash, threshold));
            video_ok && audio_ok
        }))
    }

    async fn get_chat_settings(&self, chat_id: i64) -> Result<ChatSettings> {
        Ok(*self
            .settings
            .entry(chat_id)
            .or_insert_with(|| ChatSettings::defaults(chat_id)))
    }

    async fn upsert_chat_settings(&self, settings: ChatSettings) -> Result<()> {
        self.settings.insert(settings.chat_id, settings);
        Ok(())
    }
}
