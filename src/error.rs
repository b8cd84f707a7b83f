use thiserror::Error;

/// Shown for every failure that happens after the credit gate.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate image. Please try again.";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: u64, available: u64 },
    #[error("Credential missing: {0}")]
    CredentialMissing(String),
    #[error("No image in response")]
    NoImageInResponse,
    #[error("Upstream error{}: {message}", status_suffix(.status))]
    UpstreamError {
        status: Option<u16>,
        message: String,
    },
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("A generation is already in progress")]
    Busy,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl StudioError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        StudioError::UpstreamError {
            status,
            message: message.into(),
        }
    }

    /// Text the user sees. Only the credit gate gets a specific message.
    pub fn user_message(&self) -> String {
        match self {
            StudioError::InsufficientCredits { required, .. } => format!(
                "Insufficient credits. This generation requires {} credits.",
                required
            ),
            StudioError::InvalidRequest(msg) => msg.clone(),
            StudioError::Busy => "Please wait for the current generation to finish.".to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
