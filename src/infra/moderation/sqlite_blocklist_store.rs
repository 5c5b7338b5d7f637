use crate::core::moderation::{BlockedUser, BlocklistStore, ModerationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

/// SQLite-backed blocklist. One row per (guild, user).
pub struct SqliteBlocklistStore {
    pool: Pool<Sqlite>,
}

impl SqliteBlocklistStore {
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
            CREATE TABLE IF NOT EXISTS blocklist (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                added_by INTEGER NOT NULL,
                added_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BlocklistStore for SqliteBlocklistStore {
    async fn add(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
        added_by: u64,
    ) -> Result<bool, ModerationError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO blocklist (guild_id, user_id, reason, added_by, added_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(reason)
        .bind(added_by as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        let result = sqlx::query("DELETE FROM blocklist WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, guild_id: u64) -> Result<Vec<BlockedUser>, ModerationError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, reason, added_by, added_at
            FROM blocklist
            WHERE guild_id = ?
            ORDER BY added_at ASC
            "#,
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let entries = rows
            .iter()
            .filter_map(|row| {
                let added_at_str: String = row.get("added_at");
                let added_at = DateTime::parse_from_rfc3339(&added_at_str)
                    .ok()?
                    .with_timezone(&Utc);

                Some(BlockedUser {
                    user_id: row.get::<i64, _>("user_id") as u64,
                    reason: row.get::<String, _>("reason"),
                    added_by: row.get::<i64, _>("added_by") as u64,
                    added_at,
                })
            })
            .collect();

        Ok(entries)
    }

    async fn is_blocked(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        let row = sqlx::query("SELECT 1 FROM blocklist WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteBlocklistStore {
        SqliteBlocklistStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn add_is_idempotent_per_guild_and_user() {
        let store = store().await;

        assert!(store.add(1, 10, "spam", 5).await.unwrap());
        assert!(!store.add(1, 10, "spam again", 5).await.unwrap());
        // Same user in another guild is a separate row
        assert!(store.add(2, 10, "other guild", 5).await.unwrap());

        assert!(store.is_blocked(1, 10).await.unwrap());
        assert!(store.is_blocked(2, 10).await.unwrap());
        assert!(!store.is_blocked(1, 11).await.unwrap());
    }

    #[tokio::test]
    async fn list_returns_guild_entries_with_fields() {
        let store = store().await;
        store.add(1, 10, "first", 5).await.unwrap();
        store.add(1, 20, "second", 6).await.unwrap();
        store.add(2, 30, "elsewhere", 5).await.unwrap();

        let list = store.list(1).await.unwrap();
        assert_eq!(list.len(), 2);
        let first = list.iter().find(|b| b.user_id == 10).unwrap();
        assert_eq!(first.reason, "first");
        assert_eq!(first.added_by, 5);
    }

    #[tokio::test]
    async fn remove_reports_whether_anything_went() {
        let store = store().await;
        store.add(1, 10, "spam", 5).await.unwrap();

        assert!(store.remove(1, 10).await.unwrap());
        assert!(!store.remove(1, 10).await.unwrap());
        assert!(!store.is_blocked(1, 10).await.unwrap());
    }
}
