//! `reqwest` implementation of [`ChatBackend`].

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use super::backend::{ApiError, ChatBackend, GENERIC_FAILURE};
use super::types::{
    ChatRequest, ChatResponse, ErrorBody, HealthResponse, IntentRecognitionRequest,
    IntentRecognitionResponse, SessionHistoryResponse,
};

/// HTTP client for the support backend.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:8080`).
    /// A trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and turns non-2xx statuses into [`ApiError::Api`].
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!("{} -> {}", response.url(), response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!("Backend error: {} - {}", status, body);
            return Err(ApiError::Api { status, message });
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("Unexpected response body: {}", body);
            ApiError::Parse(e.to_string())
        })
    }
}

/// Extracts the user-facing message from a failed response body.
///
/// Falls back to [`GENERIC_FAILURE`] when the body isn't JSON or carries no
/// non-empty `error` string.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        info!(
            "POST /chat: session={}, history_len={}",
            request.session_id,
            request.history.as_ref().map_or(0, Vec::len)
        );
        let response = self
            .send(self.client.post(self.url("/chat")).json(request))
            .await?;
        Self::json(response).await
    }

    async fn recognize_intent(
        &self,
        request: &IntentRecognitionRequest,
    ) -> Result<IntentRecognitionResponse, ApiError> {
        info!("POST /intent/recognize: session={}", request.session_id);
        let response = self
            .send(self.client.post(self.url("/intent/recognize")).json(request))
            .await?;
        Self::json(response).await
    }

    async fn get_session_history(
        &self,
        session_id: &str,
    ) -> Result<SessionHistoryResponse, ApiError> {
        info!("GET /session/{}/history", session_id);
        let response = self
            .send(self.client.get(self.url(&format!("/session/{session_id}/history"))))
            .await?;
        Self::json(response).await
    }

    async fn clear_session(&self, session_id: &str) -> Result<(), ApiError> {
        info!("DELETE /session/{}", session_id);
        self.send(self.client.delete(self.url(&format!("/session/{session_id}"))))
            .await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let response = self.send(self.client.get(self.url("/health"))).await?;
        Self::json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_uses_error_field() {
        assert_eq!(error_message(r#"{"error":"rate limited"}"#), "rate limited");
    }

    #[test]
    fn error_message_falls_back_on_non_json() {
        assert_eq!(error_message("<html>502 Bad Gateway</html>"), GENERIC_FAILURE);
        assert_eq!(error_message(""), GENERIC_FAILURE);
    }

    #[test]
    fn error_message_falls_back_on_missing_or_empty_field() {
        assert_eq!(error_message(r#"{"detail":"x"}"#), GENERIC_FAILURE);
        assert_eq!(error_message(r#"{"error":""}"#), GENERIC_FAILURE);
        assert_eq!(error_message(r#"{"error":null}"#), GENERIC_FAILURE);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:8080/");
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(backend.url("/chat"), "http://localhost:8080/chat");
    }
}
