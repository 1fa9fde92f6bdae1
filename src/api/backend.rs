use std::fmt;

use async_trait::async_trait;

use super::types::{
    ChatRequest, ChatResponse, HealthResponse, IntentRecognitionRequest,
    IntentRecognitionResponse, SessionHistoryResponse,
};

/// Shown when a failed response carries no usable `error` field.
pub const GENERIC_FAILURE: &str = "请求失败";

/// Errors from a single backend round trip.
///
/// `Display` is the exact line shown to the user in the error banner.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never completed (DNS, refused connection, reset).
    Network(String),
    /// Non-2xx response. `message` is the backend's `error` field, or
    /// [`GENERIC_FAILURE`] when it had none.
    Api { status: u16, message: String },
    /// A 2xx response whose body wasn't the expected JSON.
    Parse(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "网络错误: {msg}"),
            ApiError::Api { message, .. } => f.write_str(message),
            ApiError::Parse(msg) => write!(f, "响应解析失败: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// The support backend, as seen by the client.
///
/// One call is one best-effort round trip: no retries, no timeouts, no
/// caching.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /chat`
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;

    /// `POST /intent/recognize`
    async fn recognize_intent(
        &self,
        request: &IntentRecognitionRequest,
    ) -> Result<IntentRecognitionResponse, ApiError>;

    /// `GET /session/{id}/history`
    async fn get_session_history(
        &self,
        session_id: &str,
    ) -> Result<SessionHistoryResponse, ApiError>;

    /// `DELETE /session/{id}`
    async fn clear_session(&self, session_id: &str) -> Result<(), ApiError>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthResponse, ApiError>;
}
