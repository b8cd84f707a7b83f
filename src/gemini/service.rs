use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::{Result, StudioError},
    models::{ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse},
};

/// Transport seam for the image model. One call, resolved or rejected once.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

#[derive(Clone)]
pub struct HttpImageService {
    client: Client,
    base_url: String,
}

impl HttpImageService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ImageService for HttpImageService {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| StudioError::upstream(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StudioError::upstream(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(upstream_from_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            StudioError::upstream(Some(status.as_u16()), format!("Unreadable response: {}", e))
        })
    }
}

/// Keeps the API's own error message when the body is the standard envelope.
pub(crate) fn upstream_from_body(status: u16, body: &str) -> StudioError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = match envelope.error.status {
                Some(kind) => format!("{}: {}", kind, envelope.error.message),
                None => envelope.error.message,
            };
            StudioError::upstream(Some(envelope.error.code.unwrap_or(status)), message)
        }
        Err(_) => StudioError::upstream(Some(status), body.trim().to_string()),
    }
}
