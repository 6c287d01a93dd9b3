//! PostgreSQL-backed [`MessageStore`].
//!
//! Hashes are stored as `BIGINT` (the bit pattern of the u64 fingerprint) and
//! matched in SQL: `bit_count((hash # $query)::bit(64))` is the Hamming
//! distance, so candidate selection, threshold filtering and first/last
//! ordering all happen in one query. Requires PostgreSQL 14+ for
//! `bit_count`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memewatch_core::Fingerprint;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};

use crate::error::Result;
use crate::model::{ChatSettings, MatchOrder, Message, NewMessage};
use crate::MessageStore;

const CREATE_MESSAGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS message (
    id          BIGSERIAL PRIMARY KEY,
    chat_id     BIGINT NOT NULL,
    message_id  BIGINT NOT NULL,
    image_hash  BIGINT,
    video_hash  BIGINT,
    audio_hash  BIGINT,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL,
    UNIQUE (chat_id, message_id)
)
"#;

const CREATE_MESSAGE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS message_chat_created_idx ON message (chat_id, created_at)";

const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chat_settings (
    chat_id                BIGINT PRIMARY KEY,
    image_hamming_distance INT NOT NULL,
    video_hamming_distance INT NOT NULL
)
"#;

#[derive(FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    message_id: i64,
    image_hash: Option<i64>,
    video_hash: Option<i64>,
    audio_hash: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            chat_id: row.chat_id,
            message_id: row.message_id,
            image_hash: row.image_hash.map(|h| Fingerprint(h as u64)),
            video_hash: row.video_hash.map(|h| Fingerprint(h as u64)),
            audio_hash: row.audio_hash.map(|h| Fingerprint(h as u64)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ChatSettingsRow {
    chat_id: i64,
    image_hamming_distance: i32,
    video_hamming_distance: i32,
}

impl From<ChatSettingsRow> for ChatSettings {
    fn from(row: ChatSettingsRow) -> Self {
        ChatSettings {
            chat_id: row.chat_id,
            image_hamming_distance: row.image_hamming_distance as u32,
            video_hamming_distance: row.video_hamming_distance as u32,
        }
    }
}

fn as_signed(hash: Fingerprint) -> i64 {
    hash.0 as i64
}

/// PostgreSQL implementation of [`MessageStore`].
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Call [`PostgresStore::migrate`] before first
    /// use.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_MESSAGE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_MESSAGE_INDEX).execute(&self.pool).await?;
        sqlx::query(CREATE_SETTINGS_TABLE).execute(&self.pool).await?;
        info!("database schema ready");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for PostgresStore {
    #[instrument(skip(self, message), fields(chat_id = message.chat_id, message_id = message.message_id))]
    async fn upsert_message(&self, message: NewMessage) -> Result<Message> {
        // On conflict the original created_at is kept; only the hashes and
        // updated_at are refreshed.
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO message
                (chat_id, message_id, image_hash, video_hash, audio_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (chat_id, message_id) DO UPDATE SET
                image_hash = EXCLUDED.image_hash,
                video_hash = EXCLUDED.video_hash,
                audio_hash = EXCLUDED.audio_hash,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(message.chat_id)
        .bind(message.message_id)
        .bind(message.image_hash.map(as_signed))
        .bind(message.video_hash.map(as_signed))
        .bind(message.audio_hash.map(as_signed))
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_message(&self, chat_id: i64, message_id: i64) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM message WHERE chat_id = $1 AND message_id = $2",
        )
        .bind(chat_id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Message::from))
    }

    #[instrument(skip(self, hash))]
    async fn find_matching_by_image_hash(
        &self,
        chat_id: i64,
        hash: Fingerprint,
        threshold: u32,
        order: MatchOrder,
    ) -> Result<Option<Message>> {
        // ORDER BY direction cannot be bound as a parameter.
        let query = match order {
            MatchOrder::First => {
                r#"
                SELECT * FROM message
                WHERE chat_id = $1
                  AND image_hash IS NOT NULL
                  AND bit_count((image_hash # $2)::bit(64)) <= $3
                ORDER BY created_at ASC, id ASC
                LIMIT 1
                "#
            }
            MatchOrder::Last => {
                r#"
                SELECT * FROM message
                WHERE chat_id = $1
                  AND image_hash IS NOT NULL
                  AND bit_count((image_hash # $2)::bit(64)) <= $3
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#
            }
        };

        let row = sqlx::query_as::<_, MessageRow>(query)
            .bind(chat_id)
            .bind(as_signed(hash))
            .bind(threshold as i64)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Message::from))
    }

    #[instrument(skip(self, video_hash, audio_hash))]
    async fn find_matching_by_video_hash(
        &self,
        chat_id: i64,
        video_hash: Fingerprint,
        audio_hash: Fingerprint,
        threshold: u32,
        order: MatchOrder,
    ) -> Result<Option<Message>> {
        let query = match order {
            MatchOrder::First => {
                r#"
                SELECT * FROM message
                WHERE chat_id = $1
                  AND video_hash IS NOT NULL
                  AND audio_hash IS NOT NULL
                  AND bit_count((video_hash # $2)::bit(64)) <= $4
                  AND bit_count((audio_hash # $3)::bit(64)) <= $4
                ORDER BY created_at ASC, id ASC
                LIMIT 1
                "#
            }
            MatchOrder::Last => {
                r#"
                SELECT * FROM message
                WHERE chat_id = $1
                  AND video_hash IS NOT NULL
                  AND audio_hash IS NOT NULL
                  AND bit_count((video_hash # $2)::bit(64)) <= $4
                  AND bit_count((audio_hash # $3)::bit(64)) <= $4
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#
            }
        };

        let row = sqlx::query_as::<_, MessageRow>(query)
            .bind(chat_id)
            .bind(as_signed(video_hash))
            .bind(as_signed(audio_hash))
            .bind(threshold as i64)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Message::from))
    }

    async fn get_chat_settings(&self, chat_id: i64) -> Result<ChatSettings> {
        let defaults = ChatSettings::defaults(chat_id);
        let row = sqlx::query_as::<_, ChatSettingsRow>(
            r#"
            INSERT INTO chat_settings (chat_id, image_hamming_distance, video_hamming_distance)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(chat_id)
        .bind(defaults.image_hamming_distance as i32)
        .bind(defaults.video_hamming_distance as i32)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        // The row already existed; DO NOTHING returns nothing, so read it.
        let row = sqlx::query_as::<_, ChatSettingsRow>(
            "SELECT * FROM chat_settings WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn upsert_chat_settings(&self, settings: ChatSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_settings (chat_id, image_hamming_distance, video_hamming_distance)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id) DO UPDATE SET
                image_hamming_distance = EXCLUDED.image_hamming_distance,
                video_hamming_distance = EXCLUDED.video_hamming_distance
            "#,
        )
        .bind(settings.chat_id)
        .bind(settings.image_hamming_distance as i32)
        .bind(settings.video_hamming_distance as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
