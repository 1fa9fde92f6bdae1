//! Wire types shared with the support backend.
//!
//! Field names follow the backend's snake_case JSON exactly. Optional
//! request fields are omitted when unset so the backend sees the same
//! shapes the browser client used to send.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Backend classification of a user message.
///
/// Any category the client doesn't know about collapses into `Unknown`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentType {
    Faq,
    Flow,
    #[serde(other)]
    Unknown,
}

/// Advisory conversation state reported by the backend after each exchange.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    New,
    Active,
    OnFlow,
    Complete,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// RFC 3339 timestamp, set client-side when the message is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    /// A message stamped with the current time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Strips the timestamp, leaving the `{role, content}` pair the backend
    /// expects as conversation history.
    pub fn as_history(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
            timestamp: None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    #[serde(default)]
    pub session_state: Option<SessionState>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub flow_step: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IntentRecognitionRequest {
    pub message: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IntentRecognitionResponse {
    pub intent: IntentType,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SessionHistoryResponse {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub count: usize,
}

/// Body of a non-2xx response.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}
