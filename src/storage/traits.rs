use crate::{
    error::Result,
    models::{Account, HistoryEntry, NewHistoryEntry},
};
use async_trait::async_trait;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, account_id: &str) -> Result<Option<Account>>;

    /// Inserts the account; an existing account with the same id is returned unchanged.
    async fn create(&self, account: Account) -> Result<Account>;

    /// Never lets the balance go below zero.
    async fn debit(&self, account_id: &str, amount: u64) -> Result<Account>;

    async fn credit(&self, account_id: &str, amount: u64) -> Result<Account>;

    async fn health_check(&self) -> Result<bool>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry>;

    /// Newest first.
    async fn list(&self, account_id: &str, limit: Option<usize>) -> Result<Vec<HistoryEntry>>;
}
