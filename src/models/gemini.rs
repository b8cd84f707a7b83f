//! Wire types for the Gemini `generateContent` endpoint.

use serde::{Deserialize, Serialize};

use super::GenerationRequest;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    pub fn for_image(request: &GenerationRequest) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(request.prompt.clone())],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
                image_config: ImageConfig {
                    aspect_ratio: request.resolution.aspect_ratio().to_string(),
                    image_size: request.resolution.image_size().to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }

    /// Base64 image payload, if this part carries a non-empty one.
    pub fn image_payload(&self) -> Option<&str> {
        self.inline_data
            .as_ref()
            .map(|inline| inline.data.as_str())
            .filter(|data| !data.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub image_config: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate, in response order.
    pub fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resolution;
    use serde_json::json;

    #[test]
    fn request_body_shape() {
        let request = GenerationRequest::new("a lighthouse at dusk", Resolution::High).unwrap();
        let body = serde_json::to_value(GenerateContentRequest::for_image(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "a lighthouse at dusk" }] }],
                "generationConfig": {
                    "responseModalities": ["IMAGE", "TEXT"],
                    "imageConfig": { "aspectRatio": "1:1", "imageSize": "4K" }
                }
            })
        );
    }

    #[test]
    fn response_parts_tolerate_missing_fields() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 12 }
        }))
        .unwrap();
        let parts = response.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].image_payload(), None);
        assert_eq!(parts[1].image_payload(), Some("QUJD"));

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.parts().is_empty());
    }
}
