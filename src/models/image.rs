use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioError};

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";
pub const SQUARE_ASPECT_RATIO: &str = "1:1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Low,
    Medium,
    High,
}

impl Resolution {
    /// Size tier sent in `imageConfig.imageSize`.
    pub fn image_size(&self) -> &'static str {
        match self {
            Resolution::Low => "1K",
            Resolution::Medium => "2K",
            Resolution::High => "4K",
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        SQUARE_ASPECT_RATIO
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Low => "low",
            Resolution::Medium => "medium",
            Resolution::High => "high",
        }
    }

    pub fn all() -> [Resolution; 3] {
        [Resolution::Low, Resolution::Medium, Resolution::High]
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Resolution::Low),
            "medium" => Ok(Resolution::Medium),
            "high" => Ok(Resolution::High),
            other => Err(StudioError::InvalidRequest(format!(
                "Unknown resolution '{}', expected low, medium or high",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub resolution: Resolution,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, resolution: Resolution) -> Result<Self> {
        let request = Self {
            prompt: prompt.into(),
            resolution,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(StudioError::InvalidRequest(
                "Please enter a prompt to generate an image.".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// `data:image/png;base64,...`
    pub image_reference: String,
    pub model: String,
}

impl GenerationResult {
    pub fn from_inline_payload(payload: &str, model: impl Into<String>) -> Self {
        Self {
            image_reference: format!("{}{}", PNG_DATA_URI_PREFIX, payload),
            model: model.into(),
        }
    }

    pub fn payload(&self) -> &str {
        self.image_reference
            .strip_prefix(PNG_DATA_URI_PREFIX)
            .unwrap_or(&self.image_reference)
    }

    pub fn decode_image(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.payload())
            .map_err(|e| StudioError::SerializationError(format!("Invalid image payload: {}", e)))
    }

    /// Writes the decoded PNG to `path` and returns the number of bytes written.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<usize> {
        let bytes = self.decode_image()?;
        tokio::fs::write(path.as_ref(), &bytes)
            .await
            .map_err(|e| StudioError::StorageError(format!("Failed to save image: {}", e)))?;
        Ok(bytes.len())
    }

    /// Suggested download file name, e.g. `genstudio-1718000000.png`.
    pub fn download_name(&self, timestamp: chrono::DateTime<chrono::Utc>) -> String {
        format!("genstudio-{}.png", timestamp.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_tiers() {
        assert_eq!(Resolution::Low.image_size(), "1K");
        assert_eq!(Resolution::Medium.image_size(), "2K");
        assert_eq!(Resolution::High.image_size(), "4K");
        for tier in Resolution::all() {
            assert_eq!(tier.aspect_ratio(), "1:1");
        }
        assert_eq!(Resolution::default(), Resolution::Low);
    }

    #[test]
    fn resolution_parsing() {
        assert_eq!("HIGH".parse::<Resolution>().unwrap(), Resolution::High);
        assert_eq!(" medium ".parse::<Resolution>().unwrap(), Resolution::Medium);
        assert!(matches!(
            "ultra".parse::<Resolution>(),
            Err(StudioError::InvalidRequest(_))
        ));
        let json = serde_json::to_string(&Resolution::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn blank_prompt_is_rejected() {
        assert!(GenerationRequest::new("   ", Resolution::Low).is_err());
        assert!(GenerationRequest::new("a red fox", Resolution::Low).is_ok());
    }

    #[test]
    fn payload_is_wrapped_verbatim() {
        let result = GenerationResult::from_inline_payload("not-even-base64", "m");
        assert_eq!(result.image_reference, "data:image/png;base64,not-even-base64");
        assert_eq!(result.payload(), "not-even-base64");
        assert!(result.decode_image().is_err());
    }

    #[tokio::test]
    async fn save_writes_decoded_bytes() {
        let bytes = b"\x89PNG\r\n\x1a\nfake";
        let result = GenerationResult::from_inline_payload(&STANDARD.encode(bytes), "m");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");

        let written = result.save_to(&path).await.unwrap();

        assert_eq!(written, bytes.len());
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }
}
