//! Credit-gated prompt-to-image generation.
//!
//! A [`GenerationController`] checks the account balance, makes sure an API
//! key is selected, calls the Gemini image model through an [`ImageClient`],
//! then debits the account and records the result in the history store.

pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod events;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, GeminiConfig, StorageBackend, StorageConfig};
pub use controller::{ControllerState, GenerationController, GenerationOutcome, GenerationStatus};
pub use credentials::{
    CredentialProvider, EnvCredentialProvider, SelectionOutcome, StaticCredentialProvider,
};
pub use error::{Result, StudioError};
pub use events::{AccountChanged, AccountEvents};
pub use gemini::{GeminiClient, HttpImageService, ImageClient, ImageService};
pub use models::{
    Account, GenerationRequest, GenerationResult, HistoryEntry, NewHistoryEntry, Resolution,
};
pub use storage::{AccountStore, HistoryStore, JsonFileStore, MemoryStore, StorageManager};
