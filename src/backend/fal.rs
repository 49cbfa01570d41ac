use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::{
    limit_images, send_json, GenerationError, GenerationPayload, ImageBackend, RetryPolicy,
    OUTPUT_FORMAT,
};
use crate::config::CONFIG;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_backend_timing;

const PROVIDER: &str = "fal_ai";
const MODEL: &str = "nano-banana-pro";

/// Single synchronous POST to the fal.ai edit endpoint.
#[derive(Debug, Clone)]
pub struct FalBackend {
    api_key: String,
    endpoint: String,
    max_input_images: usize,
}

impl FalBackend {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, max_input_images: usize) -> Self {
        FalBackend {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            max_input_images,
        }
    }

    pub fn from_config() -> Self {
        FalBackend::new(
            CONFIG.fal_key.clone(),
            CONFIG.fal_endpoint.clone(),
            CONFIG.backend_max_input_images,
        )
    }

    fn request_body(&self, payload: &GenerationPayload) -> Value {
        json!({
            "prompt": payload.prompt,
            "negative_prompt": payload.negative_prompt,
            "image_urls": limit_images(&payload.image_urls, self.max_input_images),
            "aspect_ratio": payload.aspect_ratio,
            "resolution": payload.resolution,
            "seed": payload.seed,
            "enable_web_search": payload.enable_web_search,
            "output_format": OUTPUT_FORMAT,
        })
    }
}

fn extract_image_url(response: &Value) -> Option<String> {
    response
        .pointer("/images/0/url")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ImageBackend for FalBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, payload: &GenerationPayload) -> Result<String, GenerationError> {
        let api_key = self.api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationError::MissingCredentials("FAL_KEY"));
        }

        let body = self.request_body(payload);
        let metadata = json!({
            "seed": payload.seed,
            "resolution": payload.resolution,
            "images": body["image_urls"].as_array().map(|urls| urls.len()).unwrap_or(0),
        });
        log_backend_timing(PROVIDER, MODEL, "generate", Some(metadata), || async {
            let response = send_json(PROVIDER, RetryPolicy::Full, || {
                get_http_client()
                    .post(&self.endpoint)
                    .header("Authorization", format!("Key {api_key}"))
                    .json(&body)
            })
            .await?;
            extract_image_url(&response).ok_or(GenerationError::EmptyResult)
        })
        .await
    }
}
