use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{Result, StudioError},
    models::{Account, HistoryEntry, NewHistoryEntry},
    storage::traits::{AccountStore, HistoryStore},
};

#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Account>>,
    history: RwLock<Vec<HistoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn apply_debit(account: &mut Account, amount: u64) -> Result<()> {
    let remaining = account
        .credit_balance
        .checked_sub(amount)
        .ok_or(StudioError::InsufficientCredits {
            required: amount,
            available: account.credit_balance,
        })?;
    account.credit_balance = remaining;
    account.updated_at = Utc::now();
    Ok(())
}

pub(crate) fn apply_credit(account: &mut Account, amount: u64) -> Result<()> {
    account.credit_balance = account
        .credit_balance
        .checked_add(amount)
        .ok_or_else(|| StudioError::StorageError("Credit balance overflow".into()))?;
    account.updated_at = Utc::now();
    Ok(())
}

pub(crate) fn newest_first(
    entries: &[HistoryEntry],
    account_id: &str,
    limit: Option<usize>,
) -> Vec<HistoryEntry> {
    entries
        .iter()
        .rev()
        .filter(|entry| entry.account_id == account_id)
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get(&self, account_id: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(account_id).cloned())
    }

    async fn create(&self, account: Account) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts
            .entry(account.id.clone())
            .or_insert(account)
            .clone())
    }

    async fn debit(&self, account_id: &str, amount: u64) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| StudioError::AccountNotFound(account_id.to_string()))?;
        apply_debit(account, amount)?;
        Ok(account.clone())
    }

    async fn credit(&self, account_id: &str, amount: u64) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| StudioError::AccountNotFound(account_id.to_string()))?;
        apply_credit(account, amount)?;
        Ok(account.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry> {
        let entry = HistoryEntry::record(entry);
        self.history.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, account_id: &str, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let history = self.history.read().await;
        Ok(newest_first(&history, account_id, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resolution;

    fn entry(account_id: &str, prompt: &str) -> NewHistoryEntry {
        NewHistoryEntry {
            account_id: account_id.into(),
            prompt: prompt.into(),
            image_reference: "data:image/png;base64,QUJD".into(),
            model_identifier: "m".into(),
            resolution: Resolution::Low,
        }
    }

    #[tokio::test]
    async fn debit_refuses_to_go_negative() {
        let store = MemoryStore::new();
        store.create(Account::new("a", "A", 5)).await.unwrap();

        let err = store.debit("a", 10).await.unwrap_err();
        assert!(matches!(
            err,
            StudioError::InsufficientCredits {
                required: 10,
                available: 5
            }
        ));
        assert_eq!(store.get("a").await.unwrap().unwrap().credit_balance, 5);

        let updated = store.debit("a", 5).await.unwrap();
        assert_eq!(updated.credit_balance, 0);
    }

    #[tokio::test]
    async fn create_keeps_existing_account() {
        let store = MemoryStore::new();
        store.create(Account::new("a", "A", 5)).await.unwrap();
        let again = store.create(Account::new("a", "A", 500)).await.unwrap();
        assert_eq!(again.credit_balance, 5);
    }

    #[tokio::test]
    async fn unknown_account() {
        let store = MemoryStore::new();
        assert!(store.get("ghost").await.unwrap().is_none());
        assert!(matches!(
            store.debit("ghost", 1).await,
            Err(StudioError::AccountNotFound(_))
        ));
        assert!(matches!(
            store.credit("ghost", 1).await,
            Err(StudioError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn credit_tops_up() {
        let store = MemoryStore::new();
        store.create(Account::new("a", "A", 0)).await.unwrap();
        assert_eq!(store.credit("a", 30).await.unwrap().credit_balance, 30);
    }

    #[tokio::test]
    async fn history_is_listed_newest_first_per_account() {
        let store = MemoryStore::new();
        store.append(entry("a", "first")).await.unwrap();
        store.append(entry("b", "other")).await.unwrap();
        store.append(entry("a", "second")).await.unwrap();

        let listed = store.list("a", None).await.unwrap();
        let prompts: Vec<_> = listed.iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["second", "first"]);
        assert_eq!(store.list("a", Some(1)).await.unwrap().len(), 1);
    }
}
