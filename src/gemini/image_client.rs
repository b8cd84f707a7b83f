use std::sync::Arc;

use crate::{
    error::{Result, StudioError},
    gemini::ImageService,
    logger,
    models::{GenerateContentRequest, GenerateContentResponse, GenerationRequest, GenerationResult},
};

#[derive(Clone)]
pub struct ImageClient {
    service: Arc<dyn ImageService>,
    model: String,
}

impl ImageClient {
    pub fn new(service: Arc<dyn ImageService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn supported_models() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("gemini-3-pro-image-preview", "Gemini 3 Pro Image", "Google"),
            ("gemini-2.5-flash-image", "Gemini 2.5 Flash Image", "Google"),
        ]
    }

    /// A missing key is sent as an empty string; the service rejects it.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: Option<&str>,
    ) -> Result<GenerationResult> {
        request.validate()?;

        let payload = GenerateContentRequest::for_image(request);
        log::info!(
            "Generating image with model: {} ({} {})",
            self.model,
            request.resolution.image_size(),
            request.resolution.aspect_ratio()
        );

        let response = {
            let _timer = logger::timer("image generation");
            self.service
                .generate_content(api_key.unwrap_or_default(), &self.model, &payload)
                .await?
        };

        extract_image(&response, &self.model)
    }
}

/// First part carrying inline image data wins; later parts are ignored.
pub fn extract_image(response: &GenerateContentResponse, model: &str) -> Result<GenerationResult> {
    let parts = response.parts();
    match parts.iter().find_map(|part| part.image_payload()) {
        Some(payload) => {
            log::debug!("Image payload received: {} characters", payload.len());
            Ok(GenerationResult::from_inline_payload(payload, model))
        }
        None => {
            log::warn!("Response had {} parts and no image data", parts.len());
            Err(StudioError::NoImageInResponse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Content, Part, Resolution};
    use crate::testing::ScriptedImageService;

    fn response(parts: Vec<Part>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content { role: None, parts }),
                finish_reason: None,
            }],
        }
    }

    #[test]
    fn default_model_is_listed() {
        let models = ImageClient::supported_models();
        assert!(models
            .iter()
            .any(|(id, _, _)| *id == crate::config::DEFAULT_IMAGE_MODEL));
        assert!(models.iter().all(|(_, _, provider)| *provider == "Google"));
    }

    #[test]
    fn first_image_part_wins() {
        let response = response(vec![
            Part::text("a caption"),
            Part::image("image/png", "Rmlyc3Q="),
            Part::image("image/jpeg", "U2Vjb25k"),
        ]);
        let result = extract_image(&response, "m").unwrap();
        assert_eq!(result.image_reference, "data:image/png;base64,Rmlyc3Q=");
    }

    #[test]
    fn jpeg_payload_still_wrapped_as_png() {
        let response = response(vec![Part::image("image/jpeg", "abc")]);
        let result = extract_image(&response, "m").unwrap();
        assert!(result.image_reference.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn text_only_response_is_no_image() {
        let response = response(vec![Part::text("I cannot draw that"), Part::image("image/png", "")]);
        assert!(matches!(
            extract_image(&response, "m"),
            Err(StudioError::NoImageInResponse)
        ));
        assert!(matches!(
            extract_image(&GenerateContentResponse::default(), "m"),
            Err(StudioError::NoImageInResponse)
        ));
    }

    #[tokio::test]
    async fn sends_prompt_tier_and_empty_key() {
        let service = Arc::new(ScriptedImageService::with_image("QUJD"));
        let client = ImageClient::new(service.clone(), "gemini-3-pro-image-preview");
        let request = GenerationRequest::new("a paper boat", Resolution::Medium).unwrap();

        let result = client.generate(&request, None).await.unwrap();

        assert_eq!(result.image_reference, "data:image/png;base64,QUJD");
        assert_eq!(result.model, "gemini-3-pro-image-preview");
        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].api_key, "");
        assert_eq!(calls[0].model, "gemini-3-pro-image-preview");
        assert_eq!(calls[0].request.generation_config.image_config.image_size, "2K");
        assert_eq!(calls[0].request.contents[0].parts[0].text.as_deref(), Some("a paper boat"));
    }

    #[tokio::test]
    async fn upstream_error_passes_through_unchanged() {
        let service = Arc::new(ScriptedImageService::failing(StudioError::upstream(
            Some(401),
            "UNAUTHENTICATED: bad key",
        )));
        let client = ImageClient::new(service, "m");
        let request = GenerationRequest::new("x", Resolution::Low).unwrap();

        match client.generate(&request, Some("k")).await {
            Err(StudioError::UpstreamError { status, message }) => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "UNAUTHENTICATED: bad key");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_prompt_never_reaches_service() {
        let service = Arc::new(ScriptedImageService::with_image("QUJD"));
        let client = ImageClient::new(service.clone(), "m");
        let request = GenerationRequest {
            prompt: "".into(),
            resolution: Resolution::Low,
        };

        assert!(matches!(
            client.generate(&request, Some("k")).await,
            Err(StudioError::InvalidRequest(_))
        ));
        assert!(service.calls().is_empty());
    }
}
