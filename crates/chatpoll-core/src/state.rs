//! UI-agnostic application state types
//!
//! This module contains the message model shared with the backend and the
//! session state the widget guards its operations with. Nothing here depends
//! on a specific UI framework.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A chat message from the server's history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(flatten)]
    pub meta: MessageMeta,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            meta: MessageMeta::default(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            meta: MessageMeta::default(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Optional bookkeeping the server attaches to log entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl MessageMeta {
    /// Short labels for the flags that are set, in a stable order.
    pub fn badges(&self) -> Vec<&'static str> {
        let mut badges = Vec::new();
        if self.cached {
            badges.push("cached");
        }
        if self.blocked {
            badges.push("blocked");
        }
        if self.error {
            badges.push("error");
        }
        badges
    }
}

const USER_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a throwaway session token: `user_` plus 9 base-36 characters.
pub fn generate_user_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| USER_ID_ALPHABET[rng.gen_range(0..USER_ID_ALPHABET.len())] as char)
        .collect();
    format!("user_{}", suffix)
}

/// Per-session widget state.
///
/// The two flags are re-entrancy guards. They are checked and set without any
/// synchronization because only the event loop that owns the widget touches
/// them.
#[derive(Debug, Clone)]
pub struct ChatUiState {
    last_message_count: usize,
    is_loading_history: bool,
    is_generating_traffic: bool,
    user_text: Option<String>,
    user_id: String,
}

impl ChatUiState {
    pub fn new() -> Self {
        Self::with_user_id(generate_user_id())
    }

    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            last_message_count: 0,
            is_loading_history: false,
            is_generating_traffic: false,
            user_text: None,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn last_message_count(&self) -> usize {
        self.last_message_count
    }

    pub fn set_last_message_count(&mut self, count: usize) {
        self.last_message_count = count;
    }

    pub fn is_loading_history(&self) -> bool {
        self.is_loading_history
    }

    /// Claim the history guard. Returns false if a fetch is already in flight.
    pub fn try_begin_history_load(&mut self) -> bool {
        if self.is_loading_history {
            return false;
        }
        self.is_loading_history = true;
        true
    }

    pub fn finish_history_load(&mut self) {
        self.is_loading_history = false;
    }

    pub fn is_generating_traffic(&self) -> bool {
        self.is_generating_traffic
    }

    /// Claim the traffic guard. Returns false if a session is already active.
    pub fn try_begin_traffic(&mut self) -> bool {
        if self.is_generating_traffic {
            return false;
        }
        self.is_generating_traffic = true;
        true
    }

    pub fn finish_traffic(&mut self) {
        self.is_generating_traffic = false;
    }

    /// Chat input, send and trigger controls are disabled while traffic runs.
    pub fn input_locked(&self) -> bool {
        self.is_generating_traffic
    }

    pub fn user_text(&self) -> Option<&str> {
        self.user_text.as_deref()
    }

    pub fn set_user_text(&mut self, text: impl Into<String>) {
        self.user_text = Some(text.into());
    }
}

impl Default for ChatUiState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_shape() {
        let id = generate_user_id();
        assert!(id.starts_with("user_"));
        let suffix = &id["user_".len()..];
        assert_eq!(suffix.len(), 9);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_history_guard() {
        let mut state = ChatUiState::with_user_id("user_test");
        assert!(state.try_begin_history_load());
        assert!(!state.try_begin_history_load());
        state.finish_history_load();
        assert!(state.try_begin_history_load());
    }

    #[test]
    fn test_traffic_guard_locks_input() {
        let mut state = ChatUiState::with_user_id("user_test");
        assert!(!state.input_locked());
        assert!(state.try_begin_traffic());
        assert!(state.input_locked());
        assert!(!state.try_begin_traffic());
        state.finish_traffic();
        assert!(!state.input_locked());
    }

    #[test]
    fn test_message_deserializes_server_metadata() {
        let json = r#"{
            "role": "assistant",
            "content": "I cannot comply with that request due to security policies.",
            "user_id": "traffic_gen_3",
            "timestamp": "2024-05-01T10:00:00",
            "blocked": true
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.meta.user_id.as_deref(), Some("traffic_gen_3"));
        assert!(msg.meta.blocked);
        assert_eq!(msg.meta.badges(), vec!["blocked"]);
    }

    #[test]
    fn test_message_without_metadata() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg, ChatMessage::user("hi"));
        assert!(msg.meta.badges().is_empty());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result: Result<ChatMessage, _> =
            serde_json::from_str(r#"{"role":"system","content":"x"}"#);
        assert!(result.is_err());
    }
}
