//! Image generation backends. Each one takes a compiled view and returns the
//! URL of the rendered image.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{BackendKind, CONFIG};
use crate::utils::text::truncate_for_log;

pub mod fal;
pub mod kie;

const BACKEND_MAX_RETRY_ATTEMPTS: usize = 2;
const BACKEND_RETRY_BASE_DELAY_MS: u64 = 1500;
pub const OUTPUT_FORMAT: &str = "png";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0} is not configured")]
    MissingCredentials(&'static str),
    #[error("{provider} error: {message}")]
    Backend {
        provider: &'static str,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned no image")]
    EmptyResult,
    #[error("timed out waiting for task {0}")]
    Timeout(String),
}

/// Everything a backend needs to render one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationPayload {
    pub prompt: String,
    pub negative_prompt: String,
    pub image_urls: Vec<String>,
    pub aspect_ratio: String,
    pub resolution: String,
    pub seed: u64,
    pub enable_web_search: bool,
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, payload: &GenerationPayload) -> Result<String, GenerationError>;
}

pub type DynBackend = Box<dyn ImageBackend + Send + Sync>;

pub fn make_backend(kind: BackendKind) -> DynBackend {
    match kind {
        BackendKind::FalAi => Box::new(fal::FalBackend::from_config()),
        BackendKind::KieAi => Box::new(kie::KieBackend::from_config()),
    }
}

pub fn make_configured_backend() -> DynBackend {
    make_backend(CONFIG.backend_provider)
}

/// Collapses free-form resolution labels to the three tiers the backends accept.
pub fn normalize_resolution(value: &str) -> &'static str {
    if value.contains("4K") {
        "4K"
    } else if value.contains("2K") {
        "2K"
    } else {
        "1K"
    }
}

pub(crate) fn limit_images(urls: &[String], max: usize) -> Vec<String> {
    urls.iter().take(max).cloned().collect()
}

/// How far `send_json` may go when repeating a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPolicy {
    /// Retry timeouts, connect failures and retryable statuses.
    Full,
    /// Retry only requests that never reached the server. For calls that
    /// start paid work.
    ConnectOnly,
}

impl RetryPolicy {
    fn retries_error(self, err: &reqwest::Error) -> bool {
        match self {
            RetryPolicy::Full => should_retry_error(err),
            RetryPolicy::ConnectOnly => err.is_connect(),
        }
    }

    fn retries_status(self, status: StatusCode) -> bool {
        match self {
            RetryPolicy::Full => should_retry_status(status),
            RetryPolicy::ConnectOnly => false,
        }
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(attempt: usize) -> Duration {
    let attempt = attempt.max(1) as u64;
    Duration::from_millis(BACKEND_RETRY_BASE_DELAY_MS.saturating_mul(attempt))
}

pub(crate) fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()))
            .or_else(|| value.get("detail").and_then(|v| v.as_str()))
            .or_else(|| value.get("msg").and_then(|v| v.as_str()))
            .map(|v| v.to_string());
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

/// Sends a request built by `build`, retrying what `policy` allows, and
/// decodes the JSON body.
pub(crate) async fn send_json<F>(
    provider: &'static str,
    policy: RetryPolicy,
    build: F,
) -> Result<Value, GenerationError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        let response = match build().send().await {
            Ok(response) => response,
            Err(err) => {
                let should_retry =
                    policy.retries_error(&err) && attempt < BACKEND_MAX_RETRY_ATTEMPTS;
                warn!(
                    "{} request failed to send: {} (timeout={}, connect={}, retrying={})",
                    provider,
                    err,
                    err.is_timeout(),
                    err.is_connect(),
                    should_retry
                );
                if should_retry {
                    tokio::time::sleep(retry_delay(attempt)).await;
                    continue;
                }
                return Err(GenerationError::Transport(err.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            let should_retry =
                policy.retries_status(status) && attempt < BACKEND_MAX_RETRY_ATTEMPTS;
            warn!(
                "{} API error: status={}, body={}, retrying={}",
                provider, status, body_summary, should_retry
            );
            if should_retry {
                tokio::time::sleep(retry_delay(attempt)).await;
                continue;
            }
            return Err(GenerationError::Backend {
                provider,
                message: message.unwrap_or(body_summary),
            });
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        if tracing::enabled!(target: "shoot.backend", tracing::Level::DEBUG) {
            debug!(
                target: "shoot.backend",
                provider = provider,
                body = %truncate_for_log(&value.to_string(), 2000)
            );
        }
        return Ok(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_collapses_to_known_tiers() {
        assert_eq!(normalize_resolution("4K (Ultra)"), "4K");
        assert_eq!(normalize_resolution("2K"), "2K");
        assert_eq!(normalize_resolution("HD"), "1K");
        assert_eq!(normalize_resolution(""), "1K");
    }

    #[test]
    fn error_body_prefers_structured_message() {
        let (message, _) = summarize_error_body(r#"{"error": {"message": "quota exceeded"}}"#);
        assert_eq!(message.as_deref(), Some("quota exceeded"));

        let (message, _) = summarize_error_body(r#"{"detail": "image_urls must not be empty"}"#);
        assert_eq!(message.as_deref(), Some("image_urls must not be empty"));

        let (message, summary) = summarize_error_body("gateway timeout");
        assert!(message.is_none());
        assert_eq!(summary, "gateway timeout");

        let (message, summary) = summarize_error_body("   ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }

    #[test]
    fn retry_policy_covers_throttling_and_server_errors() {
        assert!(should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_status(StatusCode::REQUEST_TIMEOUT));
        assert!(should_retry_status(StatusCode::BAD_GATEWAY));
        assert!(!should_retry_status(StatusCode::UNPROCESSABLE_ENTITY));
        assert_eq!(retry_delay(2), Duration::from_millis(3000));
    }

    #[test]
    fn task_creation_never_retries_on_status() {
        assert!(RetryPolicy::Full.retries_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!RetryPolicy::ConnectOnly.retries_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!RetryPolicy::ConnectOnly.retries_status(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn image_list_is_capped() {
        let urls: Vec<String> = (0..20).map(|i| format!("http://x/{i}.png")).collect();
        let limited = limit_images(&urls, 14);
        assert_eq!(limited.len(), 14);
        assert_eq!(limited[13], "http://x/13.png");
    }
}
