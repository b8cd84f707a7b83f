use std::env;
use std::path::PathBuf;

use crate::error::{Result, StudioError};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_IMAGE_COST: u64 = 10;
pub const DEFAULT_INITIAL_CREDITS: u64 = 50;
pub const DEFAULT_ACCOUNT_ID: &str = "local-user";
pub const DEFAULT_DATA_PATH: &str = "genstudio-data.json";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .or_else(|| env::var("API_KEY").ok())
            .filter(|key| !key.trim().is_empty());
        let base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());
        let model =
            env::var("GEMINI_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());

        GeminiConfig {
            api_key,
            base_url,
            model,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
}

impl std::str::FromStr for StorageBackend {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" | "json" => Ok(StorageBackend::File),
            other => Err(StudioError::ConfigError(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::File,
            path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory() -> Self {
        StorageConfig {
            backend: StorageBackend::Memory,
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        StorageConfig {
            backend: StorageBackend::File,
            path: path.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            env::var("GENSTUDIO_STORAGE").ok(),
            env::var("GENSTUDIO_DATA_PATH").ok(),
        )
    }

    /// Unset values fall back to `StorageConfig::default()`.
    fn from_vars(backend: Option<String>, path: Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let backend = match backend {
            Some(value) => value.parse()?,
            None => defaults.backend,
        };
        let path = path.map(PathBuf::from).unwrap_or(defaults.path);

        Ok(StorageConfig { backend, path })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub storage: StorageConfig,
    pub image_cost: u64,
    pub initial_credits: u64,
    pub account_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini: GeminiConfig::default(),
            storage: StorageConfig::default(),
            image_cost: DEFAULT_IMAGE_COST,
            initial_credits: DEFAULT_INITIAL_CREDITS,
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let image_cost = parse_u64_var("GENSTUDIO_IMAGE_COST")?.unwrap_or(DEFAULT_IMAGE_COST);
        let initial_credits =
            parse_u64_var("GENSTUDIO_INITIAL_CREDITS")?.unwrap_or(DEFAULT_INITIAL_CREDITS);
        let account_id =
            env::var("GENSTUDIO_ACCOUNT_ID").unwrap_or_else(|_| DEFAULT_ACCOUNT_ID.to_string());

        let config = Config {
            gemini: GeminiConfig::from_env(),
            storage: StorageConfig::from_env()?,
            image_cost,
            initial_credits,
            account_id,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_storage(mut self, config: StorageConfig) -> Self {
        self.storage = config;
        self
    }

    pub fn with_image_cost(mut self, cost: u64) -> Self {
        self.image_cost = cost;
        self
    }

    pub fn with_initial_credits(mut self, credits: u64) -> Self {
        self.initial_credits = credits;
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_cost == 0 {
            return Err(StudioError::ConfigError(
                "Image cost must be greater than zero".into(),
            ));
        }
        if self.account_id.trim().is_empty() {
            return Err(StudioError::ConfigError("Account id is required".into()));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(StudioError::ConfigError("Image model is required".into()));
        }
        Ok(())
    }
}

fn parse_u64_var(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StudioError::ConfigError(format!("{} must be a whole number", name))),
        Err(_) => Ok(None),
    }
}
