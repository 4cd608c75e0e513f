//! Error types for the chatpoll core library.
//!
//! Every failure the widget can observe falls into one of the [`ApiError`]
//! variants. None of them are propagated past the widget's event handlers:
//! they are logged and turned into an inline message or overlay text.

use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the chat backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, timeout, TLS...).
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Status {
        endpoint: &'static str,
        status: u16,
        detail: Option<String>,
    },

    /// The body was not the JSON we expected.
    #[error("malformed response from {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },

    /// Rejected locally, never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client itself could not be configured.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    /// Text suitable for the traffic overlay: the server's `detail` when it
    /// sent one, otherwise the error's display form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ApiError::InvalidRequest(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure loading or saving the on-disk config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_detail() {
        let err = ApiError::Status {
            endpoint: "/generate-traffic",
            status: 400,
            detail: Some("Maximum 50 requests allowed".to_string()),
        };
        assert_eq!(err.user_message(), "Maximum 50 requests allowed");
    }

    #[test]
    fn test_user_message_without_detail() {
        let err = ApiError::Status {
            endpoint: "/chat",
            status: 502,
            detail: None,
        };
        assert_eq!(err.user_message(), "/chat returned HTTP 502: no detail");
    }

    #[test]
    fn test_invalid_request_message() {
        let err = ApiError::InvalidRequest("prompt is empty".to_string());
        assert_eq!(err.user_message(), "prompt is empty");
        assert_eq!(err.to_string(), "invalid request: prompt is empty");
    }
}
