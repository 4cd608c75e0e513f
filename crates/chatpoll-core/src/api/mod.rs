pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::ChatMessage;

pub use client::ChatApiClient;

/// Limits the backend enforces on its request models.
pub const MAX_PROMPT_CHARS: usize = 10_000;
pub const MAX_USER_ID_CHARS: usize = 255;
pub const MAX_TRAFFIC_REQUESTS: u32 = 50;

/// The three calls the widget makes, plus the health probe.
///
/// `ChatApiClient` is the HTTP implementation; tests substitute an in-memory
/// one.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    async fn history(&self) -> Result<Vec<ChatMessage>, ApiError>;

    async fn chat(&self, prompt: &str, user_id: &str) -> Result<String, ApiError>;

    async fn generate_traffic(
        &self,
        num_requests: u32,
        delay_secs: u32,
    ) -> Result<TrafficJob, ApiError>;

    async fn health(&self) -> Result<HealthReport, ApiError>;
}

/// Acknowledgement of a started traffic-generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficJob {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub num_requests: u32,
    pub delay_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub redis: Option<RedisHealth>,
    #[serde(default)]
    pub cache: Option<CacheStats>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisHealth {
    pub connected: bool,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub hit_rate_percent: f64,
    pub total_requests: u64,
}

pub fn validate_chat_request(prompt: &str, user_id: &str) -> Result<(), ApiError> {
    let prompt_len = prompt.chars().count();
    if prompt_len == 0 {
        return Err(ApiError::InvalidRequest("prompt is empty".to_string()));
    }
    if prompt_len > MAX_PROMPT_CHARS {
        return Err(ApiError::InvalidRequest(format!(
            "prompt is {} characters, maximum is {}",
            prompt_len, MAX_PROMPT_CHARS
        )));
    }
    let user_id_len = user_id.chars().count();
    if user_id_len == 0 || user_id_len > MAX_USER_ID_CHARS {
        return Err(ApiError::InvalidRequest(format!(
            "user id must be 1 to {} characters",
            MAX_USER_ID_CHARS
        )));
    }
    Ok(())
}

pub fn validate_traffic_request(num_requests: u32) -> Result<(), ApiError> {
    if num_requests > MAX_TRAFFIC_REQUESTS {
        return Err(ApiError::InvalidRequest(format!(
            "Maximum {} requests allowed",
            MAX_TRAFFIC_REQUESTS
        )));
    }
    Ok(())
}
