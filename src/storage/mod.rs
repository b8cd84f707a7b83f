pub mod file;
pub mod memory;
pub mod traits;

use std::sync::Arc;

use crate::{
    config::{StorageBackend, StorageConfig},
    error::Result,
    models::Account,
};

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{AccountStore, HistoryStore};

/// Both stores behind one backend chosen from configuration.
#[derive(Clone)]
pub struct StorageManager {
    accounts: Arc<dyn AccountStore>,
    history: Arc<dyn HistoryStore>,
}

impl StorageManager {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let manager = match config.backend {
            StorageBackend::Memory => Self::from_backend(Arc::new(MemoryStore::new())),
            StorageBackend::File => {
                Self::from_backend(Arc::new(JsonFileStore::open(&config.path).await?))
            }
        };
        log::info!("Storage backend: {:?}", config.backend);
        Ok(manager)
    }

    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: AccountStore + HistoryStore + 'static,
    {
        Self {
            accounts: backend.clone(),
            history: backend,
        }
    }

    pub fn accounts(&self) -> Arc<dyn AccountStore> {
        self.accounts.clone()
    }

    pub fn history(&self) -> Arc<dyn HistoryStore> {
        self.history.clone()
    }

    /// Returns the stored account, creating it with `initial_credits` on first use.
    pub async fn ensure_account(&self, account_id: &str, initial_credits: u64) -> Result<Account> {
        if let Some(account) = self.accounts.get(account_id).await? {
            return Ok(account);
        }
        log::info!(
            "Creating account {} with {} credits",
            account_id,
            initial_credits
        );
        self.accounts
            .create(Account::new(account_id, account_id, initial_credits))
            .await
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.accounts.health_check().await
    }
}
