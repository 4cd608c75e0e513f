use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{validate_chat_request, validate_traffic_request, ChatBackend, HealthReport, TrafficJob};
use crate::error::ApiError;
use crate::state::ChatMessage;

const HISTORY: &str = "/history";
const CHAT: &str = "/chat";
const GENERATE_TRAFFIC: &str = "/generate-traffic";
const HEALTH: &str = "/health";

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct HistoryResponse {
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: Option<String>,
}

/// HTTP client for the chat backend.
#[derive(Clone)]
pub struct ChatApiClient {
    client: Client,
    base_url: String,
}

impl ChatApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Every request made through this client gives up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn decode<T: DeserializeOwned>(
        endpoint: &'static str,
        response: Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Network { endpoint, source })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.detail);
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            endpoint,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for ChatApiClient {
    async fn history(&self) -> Result<Vec<ChatMessage>, ApiError> {
        let response = self
            .client
            .get(self.url(HISTORY))
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: HISTORY,
                source,
            })?;

        let history: HistoryResponse = Self::decode(HISTORY, response).await?;
        Ok(history.messages)
    }

    async fn chat(&self, prompt: &str, user_id: &str) -> Result<String, ApiError> {
        validate_chat_request(prompt, user_id)?;

        let response = self
            .client
            .post(self.url(CHAT))
            .json(&ChatRequest { prompt, user_id })
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: CHAT,
                source,
            })?;

        let chat: ChatResponse = Self::decode(CHAT, response).await?;
        Ok(chat.response)
    }

    async fn generate_traffic(
        &self,
        num_requests: u32,
        delay_secs: u32,
    ) -> Result<TrafficJob, ApiError> {
        validate_traffic_request(num_requests)?;

        let response = self
            .client
            .post(self.url(GENERATE_TRAFFIC))
            .query(&[("num_requests", num_requests), ("delay", delay_secs)])
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: GENERATE_TRAFFIC,
                source,
            })?;

        Self::decode(GENERATE_TRAFFIC, response).await
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        let response = self
            .client
            .get(self.url(HEALTH))
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: HEALTH,
                source,
            })?;

        Self::decode(HEALTH, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ChatApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.url(CHAT), "http://localhost:8000/chat");
    }

    #[test]
    fn test_chat_request_wire_format() {
        let body = serde_json::to_value(ChatRequest {
            prompt: "hi",
            user_id: "user_abc",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"prompt": "hi", "user_id": "user_abc"}));
    }
}
