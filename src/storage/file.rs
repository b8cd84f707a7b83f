use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    error::{Result, StudioError},
    models::{Account, HistoryEntry, NewHistoryEntry},
    storage::{
        memory::{apply_credit, apply_debit, newest_first},
        traits::{AccountStore, HistoryStore},
    },
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    accounts: HashMap<String, Account>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// Accounts and history in a single JSON file, rewritten on every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<Document>,
}

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Document::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Creating new data file at {}", path.display());
                Document::default()
            }
            Err(e) => {
                return Err(StudioError::StorageError(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        log::debug!(
            "Loaded {} accounts and {} history entries from {}",
            document.accounts.len(),
            document.history.len(),
            path.display()
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &Document) -> Result<()> {
        let json = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StudioError::StorageError(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StudioError::StorageError(format!("Failed to replace {}: {}", self.path.display(), e)))
    }

    /// Applies `change` to a copy of the account and persists before committing it.
    async fn mutate_account(
        &self,
        account_id: &str,
        change: impl FnOnce(&mut Account) -> Result<()>,
    ) -> Result<Account> {
        let mut document = self.document.lock().await;
        let mut account = document
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| StudioError::AccountNotFound(account_id.to_string()))?;
        change(&mut account)?;

        let previous = document.accounts.insert(account.id.clone(), account.clone());
        if let Err(e) = self.persist(&document).await {
            if let Some(previous) = previous {
                document.accounts.insert(previous.id.clone(), previous);
            }
            return Err(e);
        }
        Ok(account)
    }
}

#[async_trait]
impl AccountStore for JsonFileStore {
    async fn get(&self, account_id: &str) -> Result<Option<Account>> {
        Ok(self.document.lock().await.accounts.get(account_id).cloned())
    }

    async fn create(&self, account: Account) -> Result<Account> {
        let mut document = self.document.lock().await;
        if let Some(existing) = document.accounts.get(&account.id) {
            return Ok(existing.clone());
        }
        document.accounts.insert(account.id.clone(), account.clone());
        if let Err(e) = self.persist(&document).await {
            document.accounts.remove(&account.id);
            return Err(e);
        }
        Ok(account)
    }

    async fn debit(&self, account_id: &str, amount: u64) -> Result<Account> {
        self.mutate_account(account_id, |account| apply_debit(account, amount))
            .await
    }

    async fn credit(&self, account_id: &str, amount: u64) -> Result<Account> {
        self.mutate_account(account_id, |account| apply_credit(account, amount))
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        let document = self.document.lock().await;
        self.persist(&document).await?;
        Ok(true)
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry> {
        let entry = HistoryEntry::record(entry);
        let mut document = self.document.lock().await;
        document.history.push(entry.clone());
        if let Err(e) = self.persist(&document).await {
            document.history.pop();
            return Err(e);
        }
        Ok(entry)
    }

    async fn list(&self, account_id: &str, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let document = self.document.lock().await;
        Ok(newest_first(&document.history, account_id, limit))
    }
}
