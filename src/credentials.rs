use std::env;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Selected,
    /// The previously chosen key's project no longer exists; selection must run again.
    EntityNotFound,
    Cancelled,
}

/// Supplies the paid API key. Injected into the controller.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn has_credential(&self) -> Result<bool>;

    /// Interactive (or re-read) selection of a key.
    async fn select_credential(&self) -> Result<SelectionOutcome>;

    fn api_key(&self) -> Option<String>;
}

/// Reads `GEMINI_API_KEY`, falling back to `API_KEY`.
pub struct EnvCredentialProvider {
    key: RwLock<Option<String>>,
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self {
            key: RwLock::new(Self::read_env()),
        }
    }

    fn read_env() -> Option<String> {
        env::var("GEMINI_API_KEY")
            .ok()
            .or_else(|| env::var("API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn has_credential(&self) -> Result<bool> {
        Ok(self.api_key().is_some())
    }

    async fn select_credential(&self) -> Result<SelectionOutcome> {
        let key = Self::read_env();
        let outcome = if key.is_some() {
            SelectionOutcome::Selected
        } else {
            log::warn!("No API key found in GEMINI_API_KEY or API_KEY");
            SelectionOutcome::Cancelled
        };
        if let Ok(mut slot) = self.key.write() {
            *slot = key;
        }
        Ok(outcome)
    }

    fn api_key(&self) -> Option<String> {
        self.key.read().ok().and_then(|key| key.clone())
    }
}

/// A fixed key, e.g. from `GeminiConfig::api_key`.
pub struct StaticCredentialProvider {
    key: Option<String>,
}

impl StaticCredentialProvider {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn has_credential(&self) -> Result<bool> {
        Ok(self.key.is_some())
    }

    async fn select_credential(&self) -> Result<SelectionOutcome> {
        Ok(if self.key.is_some() {
            SelectionOutcome::Selected
        } else {
            SelectionOutcome::Cancelled
        })
    }

    fn api_key(&self) -> Option<String> {
        self.key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_with_key() {
        let provider = StaticCredentialProvider::new(Some("secret".into()));
        assert!(provider.has_credential().await.unwrap());
        assert_eq!(
            provider.select_credential().await.unwrap(),
            SelectionOutcome::Selected
        );
        assert_eq!(provider.api_key().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn static_provider_blank_key_counts_as_missing() {
        let provider = StaticCredentialProvider::new(Some("  ".into()));
        assert!(!provider.has_credential().await.unwrap());
        assert_eq!(
            provider.select_credential().await.unwrap(),
            SelectionOutcome::Cancelled
        );
        assert_eq!(provider.api_key(), None);
    }
}
