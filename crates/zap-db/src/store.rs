use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::error::{Result, StoreError};
use crate::models::{NewMessage, StoredMessage};
use crate::schema::SCHEMA;

/// Sqlite-backed persistence for contacts, chats and messages.
///
/// Every mutation runs in its own transaction: it either commits fully or
/// leaves no trace, so concurrent connection handlers can share one store.
pub struct MessageStore {
    pool: Pool<Sqlite>,
}

impl MessageStore {
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let store = Self::open(&path).await?;
        tracing::info!("database initialized at {}", path.display());
        Ok(store)
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&url).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com.br", "zesmoi", "zap").ok_or(StoreError::NoDataDir)?;
        Ok(dirs.data_dir().join("zap.db"))
    }

    /// Insert a contact or update its name, keeping the known name when the
    /// incoming one is empty. Returns the row id either way.
    pub async fn upsert_contact(&self, jid: &str, name: &str) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO contact (jid, name) VALUES (?, ?)
               ON CONFLICT(jid) DO UPDATE SET
                   name = CASE
                       WHEN excluded.name <> '' THEN excluded.name
                       ELSE contact.name
                   END
               RETURNING id"#,
        )
        .bind(jid)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Same contract as [`Self::upsert_contact`]; `is_group` is written on
    /// insert only and never part of the conflict key.
    pub async fn upsert_chat(&self, jid: &str, name: &str, is_group: bool) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO chat (jid, name, is_group) VALUES (?, ?, ?)
               ON CONFLICT(jid) DO UPDATE SET
                   name = CASE
                       WHEN excluded.name <> '' THEN excluded.name
                       ELSE chat.name
                   END
               RETURNING id"#,
        )
        .bind(jid)
        .bind(name)
        .bind(is_group)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Idempotent on `external_id`: a re-delivered event returns the id of
    /// the row stored the first time, never a second row.
    pub async fn insert_message(&self, message: &NewMessage) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"INSERT INTO message
                   (chat_id, author_id, external_id, kind, media_type, body,
                    media_url, quoted_message_id, timestamp)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(external_id) DO NOTHING
               RETURNING id"#,
        )
        .bind(message.chat_id)
        .bind(message.author_id)
        .bind(&message.external_id)
        .bind(&message.kind)
        .bind(&message.media_type)
        .bind(&message.body)
        .bind(&message.media_url)
        .bind(message.quoted_message_id)
        .bind(message.timestamp)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match inserted {
            Some((id,)) => id,
            None => {
                let (id,): (i64,) = sqlx::query_as("SELECT id FROM message WHERE external_id = ?")
                    .bind(&message.external_id)
                    .fetch_one(&mut *tx)
                    .await?;
                id
            }
        };

        tx.commit().await?;
        Ok(id)
    }

    /// The `tail` most recent messages of a chat, oldest first. Unknown chat
    /// JIDs simply yield an empty history.
    pub async fn get_messages(&self, chat_jid: &str, tail: i64) -> Result<Vec<StoredMessage>> {
        let mut rows: Vec<StoredMessage> = sqlx::query_as(
            r#"SELECT m.*, a.jid AS author_jid, a.name AS author_name
               FROM message m
               JOIN contact a ON a.id = m.author_id
               JOIN chat c ON c.id = m.chat_id
               WHERE c.jid = ?
               ORDER BY m.timestamp DESC, m.id DESC
               LIMIT ?"#,
        )
        .bind(chat_jid)
        .bind(tail.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        Ok(rows)
    }

    /// Fast-path hint for `check`: has this JID ever been seen locally?
    pub async fn contact_known(&self, jid: &str) -> Result<bool> {
        let (known,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM contact WHERE jid = ?)")
                .bind(jid)
                .fetch_one(&self.pool)
                .await?;
        Ok(known)
    }

    /// Resolve a service-side message id to our row id, if we stored it.
    pub async fn message_id_by_external(&self, external_id: &str) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM message WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch_store() -> (tempfile::TempDir, MessageStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MessageStore::open(&dir.path().join("zap.db")).await.unwrap();
        (dir, store)
    }

    fn text_message(chat_id: i64, author_id: i64, external_id: &str, timestamp: i64) -> NewMessage {
        NewMessage {
            chat_id,
            author_id,
            external_id: external_id.to_string(),
            kind: "text".to_string(),
            media_type: None,
            body: Some(format!("body of {external_id}")),
            media_url: None,
            quoted_message_id: None,
            timestamp,
        }
    }

    #[tokio::test]
    async fn empty_name_never_overwrites() {
        let (_dir, store) = scratch_store().await;

        let id = store.upsert_contact("a@s.whatsapp.net", "Alice").await.unwrap();
        let again = store.upsert_contact("a@s.whatsapp.net", "").await.unwrap();
        assert_eq!(id, again);

        let (name,): (String,) = sqlx::query_as("SELECT name FROM contact WHERE id = ?")
            .bind(id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(name, "Alice");
    }

    #[tokio::test]
    async fn late_name_fills_in() {
        let (_dir, store) = scratch_store().await;

        let id = store.upsert_contact("a@s.whatsapp.net", "").await.unwrap();
        store.upsert_contact("a@s.whatsapp.net", "Alice").await.unwrap();

        let (name,): (String,) = sqlx::query_as("SELECT name FROM contact WHERE id = ?")
            .bind(id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(name, "Alice");
    }

    #[tokio::test]
    async fn chat_upsert_follows_the_same_rule() {
        let (_dir, store) = scratch_store().await;

        let id = store.upsert_chat("g@g.us", "Família", true).await.unwrap();
        let again = store.upsert_chat("g@g.us", "", true).await.unwrap();
        assert_eq!(id, again);

        let (name, is_group): (String, bool) =
            sqlx::query_as("SELECT name, is_group FROM chat WHERE id = ?")
                .bind(id)
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(name, "Família");
        assert!(is_group);
    }

    #[tokio::test]
    async fn duplicate_external_id_is_one_row() {
        let (_dir, store) = scratch_store().await;

        let chat = store.upsert_chat("a@s.whatsapp.net", "", false).await.unwrap();
        let author = store.upsert_contact("a@s.whatsapp.net", "Alice").await.unwrap();

        let first = store
            .insert_message(&text_message(chat, author, "EXT-1", 1704103200))
            .await
            .unwrap();
        let second = store
            .insert_message(&text_message(chat, author, "EXT-1", 1704103200))
            .await
            .unwrap();
        assert_eq!(first, second);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM message")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn tail_returns_most_recent_ascending() {
        let (_dir, store) = scratch_store().await;

        let chat = store.upsert_chat("a@s.whatsapp.net", "", false).await.unwrap();
        let author = store.upsert_contact("a@s.whatsapp.net", "Alice").await.unwrap();

        for n in 0..5 {
            store
                .insert_message(&text_message(chat, author, &format!("EXT-{n}"), 1000 + n))
                .await
                .unwrap();
        }

        let messages = store.get_messages("a@s.whatsapp.net", 2).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].external_id, "EXT-3");
        assert_eq!(messages[1].external_id, "EXT-4");
        assert!(messages[0].timestamp < messages[1].timestamp);
        assert_eq!(messages[0].author_name, "Alice");
    }

    #[tokio::test]
    async fn unknown_chat_has_empty_history() {
        let (_dir, store) = scratch_store().await;
        let messages = store.get_messages("nobody@s.whatsapp.net", 20).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn contact_known_only_after_upsert() {
        let (_dir, store) = scratch_store().await;

        assert!(!store.contact_known("a@s.whatsapp.net").await.unwrap());
        store.upsert_contact("a@s.whatsapp.net", "Alice").await.unwrap();
        assert!(store.contact_known("a@s.whatsapp.net").await.unwrap());
    }

    #[tokio::test]
    async fn quoted_message_resolves_by_external_id() {
        let (_dir, store) = scratch_store().await;

        let chat = store.upsert_chat("a@s.whatsapp.net", "", false).await.unwrap();
        let author = store.upsert_contact("a@s.whatsapp.net", "Alice").await.unwrap();

        let original = store
            .insert_message(&text_message(chat, author, "EXT-1", 1000))
            .await
            .unwrap();

        assert_eq!(
            store.message_id_by_external("EXT-1").await.unwrap(),
            Some(original)
        );
        assert_eq!(store.message_id_by_external("EXT-404").await.unwrap(), None);

        let mut reply = text_message(chat, author, "EXT-2", 1001);
        reply.quoted_message_id = Some(original);
        let reply_id = store.insert_message(&reply).await.unwrap();

        let messages = store.get_messages("a@s.whatsapp.net", 10).await.unwrap();
        assert_eq!(messages[1].id, reply_id);
        assert_eq!(messages[1].quoted_message_id, Some(original));
    }
}
