//! # Application State
//!
//! Core business state for the support client. Domain data only; scroll
//! positions, modal contents and input buffers live in the `tui` module.
//!
//! ```text
//! App
//! ├── backend: Arc<dyn ChatBackend>     // support service
//! ├── session_id / user_id: String      // random, per process
//! ├── messages: Vec<Message>            // append-only transcript
//! ├── session_state: Option<...>        // last reported by backend
//! ├── intent_type: Option<...>          // last reported by backend
//! ├── flow_step: Option<String>         // last reported flow step
//! ├── is_loading: bool                  // chat request in flight
//! ├── error: Option<String>             // banner text
//! ├── status_message: String            // title bar text
//! ├── backend_online: Option<bool>      // health check result
//! ├── clear_remote: bool                // also DELETE on clear
//! └── epoch: u64                        // bumped on clear
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use crate::api::{ChatBackend, IntentType, Message, SessionState};
use crate::core::config::ResolvedConfig;

pub struct App {
    pub backend: Arc<dyn ChatBackend>,
    pub session_id: String,
    pub user_id: String,
    pub messages: Vec<Message>,
    pub session_state: Option<SessionState>,
    pub intent_type: Option<IntentType>,
    pub flow_step: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub status_message: String,
    /// `None` until the health check answers (or when it is disabled).
    pub backend_online: Option<bool>,
    pub clear_remote: bool,
    /// Results of background requests carry the epoch they were issued in;
    /// anything older than this is stale and dropped.
    pub epoch: u64,
}

impl App {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            session_id: generate_id(),
            user_id: format!("user-{}", generate_id()),
            messages: Vec::new(),
            session_state: None,
            intent_type: None,
            flow_step: None,
            is_loading: false,
            error: None,
            status_message: String::new(),
            backend_online: None,
            clear_remote: false,
            epoch: 0,
        }
    }

    pub fn from_config(backend: Arc<dyn ChatBackend>, config: &ResolvedConfig) -> Self {
        let mut app = Self::new(backend);
        app.clear_remote = config.clear_remote;
        app
    }

    /// `{role, content}` projection of the transcript, sent as context.
    pub fn history(&self) -> Vec<Message> {
        self.messages.iter().map(Message::as_history).collect()
    }
}

/// Random opaque identifier, 13 characters like the ids the web client used.
pub fn generate_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(13);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;
    use crate::test_support::test_app;

    #[test]
    fn test_app_new_defaults() {
        let app = test_app();
        assert!(app.messages.is_empty());
        assert!(!app.is_loading);
        assert!(app.error.is_none());
        assert!(app.session_state.is_none());
        assert!(app.intent_type.is_none());
        assert_eq!(app.epoch, 0);
    }

    #[test]
    fn ids_are_random_and_prefixed() {
        let a = test_app();
        let b = test_app();
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.session_id.len(), 13);
        assert!(a.user_id.starts_with("user-"));
    }

    #[test]
    fn history_strips_timestamps() {
        let mut app = test_app();
        app.messages.push(Message::now(Role::User, "hi"));
        app.messages.push(Message::now(Role::Assistant, "hello"));
        let history = app.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.timestamp.is_none()));
        assert_eq!(history[1].content, "hello");
    }
}
