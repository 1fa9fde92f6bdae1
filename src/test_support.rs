//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;
use async_trait::async_trait;

use crate::api::{
    ApiError, ChatBackend, ChatRequest, ChatResponse, HealthResponse, IntentRecognitionRequest,
    IntentRecognitionResponse, IntentType, SessionHistoryResponse,
};

/// A backend for tests that don't need real HTTP calls. Every call succeeds
/// with an empty or canned answer.
pub struct NoopBackend;

#[async_trait]
impl ChatBackend for NoopBackend {
    async fn send_message(&self, _request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        Ok(ChatResponse {
            reply: String::new(),
            intent_type: IntentType::Unknown,
            session_state: None,
            session_id: None,
            flow_step: None,
        })
    }

    async fn recognize_intent(
        &self,
        _request: &IntentRecognitionRequest,
    ) -> Result<IntentRecognitionResponse, ApiError> {
        Ok(IntentRecognitionResponse {
            intent: IntentType::Unknown,
            confidence: 0.0,
            reply: None,
            flow_id: None,
            suggestions: None,
        })
    }

    async fn get_session_history(
        &self,
        session_id: &str,
    ) -> Result<SessionHistoryResponse, ApiError> {
        Ok(SessionHistoryResponse {
            session_id: session_id.to_string(),
            messages: Vec::new(),
            count: 0,
        })
    }

    async fn clear_session(&self, _session_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse {
            status: "ok".to_string(),
        })
    }
}

/// Creates a test App with a NoopBackend.
pub fn test_app() -> crate::core::state::App {
    crate::core::state::App::new(Arc::new(NoopBackend))
}

/// Collects the visible text of a rendered buffer into one string.
///
/// Cells hidden behind a double-width glyph (CJK) are skipped so that
/// `"流程中"` can be matched as written.
pub fn buffer_text(buffer: &ratatui::buffer::Buffer) -> String {
    use unicode_width::UnicodeWidthStr;

    let mut out = String::new();
    let mut hidden = 0usize;
    for cell in buffer.content() {
        if hidden > 0 {
            hidden -= 1;
            continue;
        }
        let symbol = cell.symbol();
        out.push_str(symbol);
        hidden = symbol.width().saturating_sub(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_backend_history_is_empty() {
        let backend = NoopBackend;
        let history = tokio_test::block_on(backend.get_session_history("abc")).unwrap();
        assert_eq!(history.session_id, "abc");
        assert!(history.messages.is_empty());
    }
}
