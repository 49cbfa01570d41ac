use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::backend::{
    limit_images, send_json, GenerationError, GenerationPayload, ImageBackend, RetryPolicy,
    OUTPUT_FORMAT,
};
use crate::config::CONFIG;
use crate::utils::http::get_http_client;
use crate::utils::text::truncate_for_log;
use crate::utils::timing::log_backend_timing;

const PROVIDER: &str = "kie_ai";
/// createTask starts a paid job; a 5xx may still have enqueued it.
const CREATE_TASK_RETRY: RetryPolicy = RetryPolicy::ConnectOnly;

/// Task-based backend: create a job, then poll its record until it settles.
#[derive(Debug, Clone)]
pub struct KieBackend {
    api_key: String,
    create_task_endpoint: String,
    record_info_endpoint: String,
    model: String,
    poll_attempts: usize,
    poll_interval: Duration,
    max_input_images: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TaskState {
    Pending,
    Succeeded(String),
    /// Settled as successful but carried no result URL.
    Empty,
    Failed(String),
}

impl KieBackend {
    pub fn from_config() -> Self {
        KieBackend {
            api_key: CONFIG.kie_api_key.clone(),
            create_task_endpoint: CONFIG.kie_create_task_endpoint.clone(),
            record_info_endpoint: CONFIG.kie_record_info_endpoint.clone(),
            model: CONFIG.kie_model.clone(),
            poll_attempts: CONFIG.kie_poll_attempts,
            poll_interval: Duration::from_millis(CONFIG.kie_poll_interval_ms),
            max_input_images: CONFIG.backend_max_input_images,
        }
    }

    fn request_body(&self, payload: &GenerationPayload) -> Value {
        let mut input = json!({
            "prompt": payload.prompt,
            "image_input": limit_images(&payload.image_urls, self.max_input_images),
            "aspect_ratio": payload.aspect_ratio,
            "resolution": payload.resolution,
            "output_format": OUTPUT_FORMAT,
        });
        if payload.seed > 0 {
            input["seed"] = json!(payload.seed);
        }
        json!({ "model": self.model, "input": input })
    }

    async fn create_task(&self, api_key: &str, body: &Value) -> Result<String, GenerationError> {
        let response = send_json(PROVIDER, CREATE_TASK_RETRY, || {
            get_http_client()
                .post(&self.create_task_endpoint)
                .bearer_auth(api_key)
                .json(body)
        })
        .await?;
        extract_task_id(&response).ok_or_else(|| GenerationError::Backend {
            provider: PROVIDER,
            message: describe_rejection(&response),
        })
    }

    async fn poll_task(&self, api_key: &str, task_id: &str) -> Result<String, GenerationError> {
        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = get_http_client()
                .get(&self.record_info_endpoint)
                .query(&[("taskId", task_id)])
                .bearer_auth(api_key)
                .send()
                .await;
            let record = match response {
                Ok(response) if response.status().is_success() => response.json::<Value>().await,
                Ok(response) => {
                    debug!(target: "shoot.backend", task_id, attempt, status = %response.status(), "poll not ready");
                    continue;
                }
                Err(err) => {
                    debug!(target: "shoot.backend", task_id, attempt, "poll failed: {}", err);
                    continue;
                }
            };
            let Ok(record) = record else {
                continue;
            };

            match task_state(&record) {
                TaskState::Succeeded(url) => return Ok(url),
                TaskState::Empty => return Err(GenerationError::EmptyResult),
                TaskState::Failed(message) => {
                    return Err(GenerationError::Backend {
                        provider: PROVIDER,
                        message,
                    })
                }
                TaskState::Pending => {}
            }
        }
        Err(GenerationError::Timeout(task_id.to_string()))
    }
}

fn extract_task_id(response: &Value) -> Option<String> {
    response
        .pointer("/data/taskId")
        .or_else(|| response.get("taskId"))
        .and_then(|v| v.as_str())
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

fn describe_rejection(response: &Value) -> String {
    ["message", "msg", "info"]
        .iter()
        .find_map(|key| response.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| truncate_for_log(&response.to_string(), 500))
}

fn task_state(record: &Value) -> TaskState {
    match record.pointer("/data/state").and_then(|v| v.as_str()) {
        Some("success") => {
            let Some(result) = record
                .pointer("/data/resultJson")
                .and_then(|v| v.as_str())
                .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            else {
                return TaskState::Pending;
            };
            match result.pointer("/resultUrls/0").and_then(|v| v.as_str()) {
                Some(url) if !url.trim().is_empty() => TaskState::Succeeded(url.to_string()),
                _ => TaskState::Empty,
            }
        }
        Some("failed") | Some("fail") => TaskState::Failed(
            record
                .pointer("/data/failMsg")
                .and_then(|v| v.as_str())
                .unwrap_or("generation failed")
                .to_string(),
        ),
        _ => TaskState::Pending,
    }
}

#[async_trait]
impl ImageBackend for KieBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, payload: &GenerationPayload) -> Result<String, GenerationError> {
        let api_key = self.api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationError::MissingCredentials("KIE_API_KEY"));
        }

        let body = self.request_body(payload);
        let metadata = json!({ "seed": payload.seed, "resolution": payload.resolution });
        log_backend_timing(PROVIDER, &self.model, "generate", Some(metadata), || async {
            let task_id = self.create_task(api_key, &body).await?;
            info!("{} task created: {}", PROVIDER, task_id);
            self.poll_task(api_key, &task_id).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> KieBackend {
        KieBackend {
            api_key: "key".to_string(),
            create_task_endpoint: "https://kie.test/create".to_string(),
            record_info_endpoint: "https://kie.test/record".to_string(),
            model: "nano-banana-pro".to_string(),
            poll_attempts: 1,
            poll_interval: Duration::from_millis(1),
            max_input_images: 2,
        }
    }

    #[test]
    fn request_body_nests_input_and_omits_zero_seed() {
        let mut payload = GenerationPayload {
            prompt: "Back view.".to_string(),
            negative_prompt: String::new(),
            image_urls: vec!["http://a".into(), "http://b".into(), "http://c".into()],
            aspect_ratio: "3:4".to_string(),
            resolution: "1K".to_string(),
            seed: 0,
            enable_web_search: false,
        };
        let body = backend().request_body(&payload);
        assert_eq!(body["model"], "nano-banana-pro");
        assert_eq!(body["input"]["image_input"].as_array().map(Vec::len), Some(2));
        assert!(body["input"].get("seed").is_none());

        payload.seed = 77;
        assert_eq!(backend().request_body(&payload)["input"]["seed"], 77);
    }

    #[test]
    fn task_creation_is_not_retried_after_reaching_the_server() {
        assert_eq!(CREATE_TASK_RETRY, RetryPolicy::ConnectOnly);
    }

    #[test]
    fn finds_task_id_in_either_location() {
        assert_eq!(extract_task_id(&json!({"data": {"taskId": "t-1"}})).as_deref(), Some("t-1"));
        assert_eq!(extract_task_id(&json!({"taskId": "t-2"})).as_deref(), Some("t-2"));
        assert_eq!(extract_task_id(&json!({"code": 401, "msg": "bad key"})), None);
        assert_eq!(describe_rejection(&json!({"code": 401, "msg": "bad key"})), "bad key");
    }

    #[test]
    fn reads_task_states() {
        let done = json!({"data": {"state": "success", "resultJson": "{\"resultUrls\": [\"https://cdn/out.png\"]}"}});
        assert_eq!(task_state(&done), TaskState::Succeeded("https://cdn/out.png".to_string()));

        let failed = json!({"data": {"state": "failed", "failMsg": "nsfw"}});
        assert_eq!(task_state(&failed), TaskState::Failed("nsfw".to_string()));

        let no_urls = json!({"data": {"state": "success", "resultJson": "{\"resultUrls\": []}"}});
        assert_eq!(task_state(&no_urls), TaskState::Empty);

        let unreadable = json!({"data": {"state": "success", "resultJson": "{not json"}});
        assert_eq!(task_state(&unreadable), TaskState::Pending);

        let waiting = json!({"data": {"state": "generating"}});
        assert_eq!(task_state(&waiting), TaskState::Pending);
    }
}
