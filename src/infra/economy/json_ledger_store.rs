use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::economy::{EconomyError, LedgerBook, LedgerStore};

/// JSON file store for the economy ledger.
///
/// Saves go through a sibling temp file and a rename, so a crash mid-write
/// leaves the previous ledger intact rather than a truncated one.
pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl LedgerStore for JsonLedgerStore {
    async fn load(&self) -> Result<LedgerBook, EconomyError> {
        if !self.path.exists() {
            return Ok(LedgerBook::default());
        }

        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| EconomyError::Store(e.to_string()))?;

        let book: LedgerBook =
            serde_json::from_str(&text).map_err(|e| EconomyError::Store(e.to_string()))?;
        Ok(book)
    }

    async fn save(&self, book: &LedgerBook) -> Result<(), EconomyError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| EconomyError::Store(e.to_string()))?;
        }

        let text =
            serde_json::to_string_pretty(book).map_err(|e| EconomyError::Store(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, text)
            .await
            .map_err(|e| EconomyError::Store(e.to_string()))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| EconomyError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::economy::{GuildLedger, PlayerAccount};

    #[tokio::test]
    async fn missing_file_loads_an_empty_book() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLedgerStore::new(dir.path().join("economy.json"));
        let book = store.load().await.unwrap();
        assert!(book.guilds.is_empty());
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("economy.json");
        let store = JsonLedgerStore::new(&path);

        let mut book = LedgerBook::default();
        let mut ledger = GuildLedger::default();
        ledger.accounts.insert(
            42,
            PlayerAccount {
                purse: 500,
                bank: 1_000,
                total_earned: 1_500,
                ..Default::default()
            },
        );
        book.guilds.insert(7, ledger);

        store.save(&book).await.unwrap();
        assert!(path.exists());
        // No temp file left behind
        assert!(!store.temp_path().exists());

        let loaded = store.load().await.unwrap();
        let account = &loaded.guilds[&7].accounts[&42];
        assert_eq!(account.purse, 500);
        assert_eq!(account.bank, 1_000);
    }

    #[tokio::test]
    async fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/economy.json");
        let store = JsonLedgerStore::new(&path);

        store.save(&LedgerBook::default()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn save_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("economy.json");
        let store = JsonLedgerStore::new(&path);

        let mut book = LedgerBook::default();
        book.guilds.insert(1, GuildLedger::default());
        store.save(&book).await.unwrap();

        book.guilds.insert(2, GuildLedger::default());
        store.save(&book).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.guilds.len(), 2);
    }
}
