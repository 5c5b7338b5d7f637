use crate::core::chatter::{ChatterError, MemoryEntry, MemoryStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

/// SQLite-backed chat memory. Rows carry their creation time so the TTL
/// purge is a single DELETE.
pub struct SqliteMemoryStore {
    pool: Pool<Sqlite>,
}

impl SqliteMemoryStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_memory (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_chat_memory_guild_created
            ON chat_memory(guild_id, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn record(&self, entry: MemoryEntry) -> Result<(), ChatterError> {
        sqlx::query(
            r#"
            INSERT INTO chat_memory (guild_id, channel_id, user_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.guild_id as i64)
        .bind(entry.channel_id as i64)
        .bind(entry.user_id as i64)
        .bind(entry.content)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ChatterError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn message_count(&self, guild_id: u64) -> Result<u64, ChatterError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM chat_memory WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ChatterError::StorageError(e.to_string()))?;

        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ChatterError> {
        let result = sqlx::query("DELETE FROM chat_memory WHERE created_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| ChatterError::StorageError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> SqliteMemoryStore {
        SqliteMemoryStore::new("sqlite::memory:").await.unwrap()
    }

    fn entry(guild_id: u64, content: &str) -> MemoryEntry {
        MemoryEntry {
            guild_id,
            channel_id: 5,
            user_id: 9,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn record_and_count_per_guild() {
        let store = store().await;
        store.record(entry(1, "first")).await.unwrap();
        store.record(entry(1, "second")).await.unwrap();
        store.record(entry(2, "elsewhere")).await.unwrap();

        assert_eq!(store.message_count(1).await.unwrap(), 2);
        assert_eq!(store.message_count(2).await.unwrap(), 1);
        assert_eq!(store.message_count(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let store = store().await;
        store.record(entry(1, "fresh")).await.unwrap();

        // A cutoff in the past removes nothing
        let purged = store
            .purge_older_than(Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(purged, 0);
        assert_eq!(store.message_count(1).await.unwrap(), 1);

        // A cutoff in the future removes everything
        let purged = store
            .purge_older_than(Utc::now() + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.message_count(1).await.unwrap(), 0);
    }
}
