use std::env;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;
use url::Url;

const DEFAULT_FAL_ENDPOINT: &str = "https://fal.run/fal-ai/nano-banana-pro/edit";
const DEFAULT_KIE_CREATE_TASK_ENDPOINT: &str = "https://api.kie.ai/api/v1/jobs/createTask";
const DEFAULT_KIE_RECORD_INFO_ENDPOINT: &str = "https://api.kie.ai/api/v1/jobs/recordInfo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    FalAi,
    KieAi,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::FalAi => "fal_ai",
            BackendKind::KieAi => "kie_ai",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: String,
    pub backend_provider: BackendKind,
    pub fal_key: String,
    pub fal_endpoint: String,
    pub kie_api_key: String,
    pub kie_create_task_endpoint: String,
    pub kie_record_info_endpoint: String,
    pub kie_model: String,
    pub kie_poll_attempts: usize,
    pub kie_poll_interval_ms: u64,
    pub backend_timeout_seconds: u64,
    pub backend_max_input_images: usize,
    pub batch_concurrency: usize,
    pub default_resolution: String,
    pub default_aspect_ratio: String,
    pub credits_per_shot: u32,
    pub credits_per_shot_4k: u32,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn normalize_backend_provider(value: String) -> BackendKind {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return BackendKind::FalAi;
    }

    match trimmed.to_lowercase().as_str() {
        "fal_ai" | "fal" => BackendKind::FalAi,
        "kie_ai" | "kie" => BackendKind::KieAi,
        _ => {
            warn!(
                "Unknown IMAGE_BACKEND_PROVIDER value '{}'; defaulting to fal_ai.",
                value
            );
            BackendKind::FalAi
        }
    }
}

fn normalize_endpoint(name: &str, value: String, default: &str) -> String {
    let trimmed = value.trim();
    match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "https" || url.scheme() == "http" => trimmed.to_string(),
        _ => {
            warn!("Invalid {} value '{}'; using {}", name, value, default);
            default.to_string()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: env_string("LOG_DIR", "logs"),
            backend_provider: normalize_backend_provider(env_string(
                "IMAGE_BACKEND_PROVIDER",
                "fal_ai",
            )),
            fal_key: env_string("FAL_KEY", ""),
            fal_endpoint: normalize_endpoint(
                "FAL_ENDPOINT",
                env_string("FAL_ENDPOINT", DEFAULT_FAL_ENDPOINT),
                DEFAULT_FAL_ENDPOINT,
            ),
            kie_api_key: env_string("KIE_API_KEY", ""),
            kie_create_task_endpoint: normalize_endpoint(
                "KIE_CREATE_TASK_ENDPOINT",
                env_string("KIE_CREATE_TASK_ENDPOINT", DEFAULT_KIE_CREATE_TASK_ENDPOINT),
                DEFAULT_KIE_CREATE_TASK_ENDPOINT,
            ),
            kie_record_info_endpoint: normalize_endpoint(
                "KIE_RECORD_INFO_ENDPOINT",
                env_string("KIE_RECORD_INFO_ENDPOINT", DEFAULT_KIE_RECORD_INFO_ENDPOINT),
                DEFAULT_KIE_RECORD_INFO_ENDPOINT,
            ),
            kie_model: env_string("KIE_MODEL", "nano-banana-pro"),
            kie_poll_attempts: env_usize("KIE_POLL_ATTEMPTS", 240).max(1),
            kie_poll_interval_ms: env_u64("KIE_POLL_INTERVAL_MS", 1000),
            backend_timeout_seconds: env_u64("BACKEND_TIMEOUT_SECONDS", 90),
            backend_max_input_images: env_usize("BACKEND_MAX_INPUT_IMAGES", 14),
            batch_concurrency: env_usize("BATCH_CONCURRENCY", 3).max(1),
            default_resolution: env_string("DEFAULT_RESOLUTION", "1K"),
            default_aspect_ratio: env_string("DEFAULT_ASPECT_RATIO", "3:4"),
            credits_per_shot: env_u32("CREDITS_PER_SHOT", 4),
            credits_per_shot_4k: env_u32("CREDITS_PER_SHOT_4K", 8),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_falls_back_to_fal() {
        assert_eq!(
            normalize_backend_provider("replicate".to_string()),
            BackendKind::FalAi
        );
        assert_eq!(
            normalize_backend_provider(" KIE_AI ".to_string()),
            BackendKind::KieAi
        );
    }

    #[test]
    fn invalid_endpoint_is_replaced_by_default() {
        let endpoint = normalize_endpoint("FAL_ENDPOINT", "not a url".to_string(), DEFAULT_FAL_ENDPOINT);
        assert_eq!(endpoint, DEFAULT_FAL_ENDPOINT);

        let custom = normalize_endpoint(
            "FAL_ENDPOINT",
            "https://proxy.internal/fal".to_string(),
            DEFAULT_FAL_ENDPOINT,
        );
        assert_eq!(custom, "https://proxy.internal/fal");
    }
}
