pub mod image_client;
pub mod service;

use std::sync::Arc;

use crate::config::GeminiConfig;

pub use image_client::{extract_image, ImageClient};
pub use service::{HttpImageService, ImageService};

#[derive(Clone)]
pub struct GeminiClient {
    image_client: ImageClient,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        let service: Arc<dyn ImageService> = Arc::new(HttpImageService::new(&config.base_url));
        Self::with_service(service, config)
    }

    pub fn with_service(service: Arc<dyn ImageService>, config: &GeminiConfig) -> Self {
        Self {
            image_client: ImageClient::new(service, config.model.clone()),
        }
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }
}
