//! # Actions
//!
//! Everything that can happen in the client becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! Backend answers? That's `Action::ReplyReceived { .. }`.
//!
//! `update()` applies an action to the state and returns an `Effect`
//! describing the I/O the event loop should start. No I/O happens here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use log::{debug, info, warn};

use crate::api::{
    ChatRequest, ChatResponse, IntentRecognitionRequest, IntentRecognitionResponse, Message, Role,
};
use crate::core::state::App;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// User submitted text from the input box.
    Submit(String),
    /// `/chat` answered successfully.
    ReplyReceived { epoch: u64, response: ChatResponse },
    /// `/chat` failed; `message` is the banner text.
    RequestFailed { epoch: u64, message: String },
    /// Start a new conversation.
    ClearSession,
    /// Classify the current input draft without sending it.
    RecognizeDraft(String),
    IntentRecognized {
        epoch: u64,
        response: IntentRecognitionResponse,
    },
    IntentFailed { epoch: u64, message: String },
    OpenHistory,
    /// History fetch finished for the modal opened as `request_id`.
    HistoryLoaded {
        request_id: u64,
        result: Result<Vec<Message>, String>,
    },
    HealthChecked(Result<String, String>),
    Quit,
}

/// I/O requested by `update()`, carried out by the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    SendChat { epoch: u64, request: ChatRequest },
    RecognizeIntent {
        epoch: u64,
        request: IntentRecognitionRequest,
    },
    FetchHistory { session_id: String },
    /// Fire-and-forget `DELETE /session/{id}`.
    ClearRemote { session_id: String },
    DeliverHistory {
        request_id: u64,
        result: Result<Vec<Message>, String>,
    },
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Submit(text) => {
            let content = text.trim().to_string();
            if content.is_empty() {
                return Effect::None;
            }
            if app.is_loading {
                warn!("Submit ignored: a request is already in flight");
                return Effect::None;
            }

            // History is the conversation so far; the new text travels in `message`.
            let history = app.history();

            app.messages.push(Message::now(Role::User, content.clone()));
            app.is_loading = true;
            app.error = None;
            app.status_message = String::from("客服正在输入...");

            Effect::SendChat {
                epoch: app.epoch,
                request: ChatRequest {
                    session_id: app.session_id.clone(),
                    message: content,
                    user_id: app.user_id.clone(),
                    history: Some(history),
                    intent: None,
                    flow_id: None,
                },
            }
        }
        Action::ReplyReceived { epoch, response } => {
            if epoch != app.epoch {
                debug!("Dropping reply from stale epoch {}", epoch);
                return Effect::None;
            }
            app.messages
                .push(Message::now(Role::Assistant, response.reply));
            app.session_state = response.session_state;
            app.intent_type = Some(response.intent_type);
            app.flow_step = response.flow_step;
            if let Some(id) = response.session_id
                && id != app.session_id
            {
                debug!("Backend reported session id {} (ours: {})", id, app.session_id);
            }
            app.status_message.clear();
            app.is_loading = false;
            Effect::None
        }
        Action::RequestFailed { epoch, message } => {
            if epoch != app.epoch {
                debug!("Dropping failure from stale epoch {}: {}", epoch, message);
                return Effect::None;
            }
            app.error = Some(message);
            app.status_message.clear();
            app.is_loading = false;
            Effect::None
        }
        Action::ClearSession => {
            app.messages.clear();
            app.session_state = None;
            app.intent_type = None;
            app.flow_step = None;
            app.error = None;
            app.is_loading = false;
            app.epoch += 1;
            app.status_message = String::from("已开始新会话");
            info!("Session cleared (epoch {})", app.epoch);
            if app.clear_remote {
                Effect::ClearRemote {
                    session_id: app.session_id.clone(),
                }
            } else {
                Effect::None
            }
        }
        Action::RecognizeDraft(text) => {
            let message = text.trim().to_string();
            if message.is_empty() {
                return Effect::None;
            }
            app.error = None;
            app.status_message = String::from("意图识别中...");
            Effect::RecognizeIntent {
                epoch: app.epoch,
                request: IntentRecognitionRequest {
                    message,
                    session_id: app.session_id.clone(),
                    history: Some(app.history()),
                },
            }
        }
        Action::IntentRecognized { epoch, response } => {
            if epoch != app.epoch {
                return Effect::None;
            }
            match serde_json::to_string(&response) {
                Ok(json) => app.messages.push(Message::now(Role::System, json)),
                Err(e) => warn!("Failed to encode intent result: {}", e),
            }
            app.status_message.clear();
            Effect::None
        }
        Action::IntentFailed { epoch, message } => {
            if epoch != app.epoch {
                return Effect::None;
            }
            app.error = Some(message);
            app.status_message.clear();
            Effect::None
        }
        Action::OpenHistory => Effect::FetchHistory {
            session_id: app.session_id.clone(),
        },
        Action::HistoryLoaded { request_id, result } => {
            Effect::DeliverHistory { request_id, result }
        }
        Action::HealthChecked(result) => {
            match result {
                Ok(status) => {
                    info!("Backend health: {}", status);
                    app.backend_online = Some(true);
                }
                Err(e) => {
                    warn!("Backend health check failed: {}", e);
                    app.backend_online = Some(false);
                }
            }
            Effect::None
        }
        Action::Quit => Effect::Quit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{IntentType, SessionState};
    use crate::test_support::test_app;

    fn reply(text: &str) -> ChatResponse {
        ChatResponse {
            reply: text.to_string(),
            intent_type: IntentType::Faq,
            session_state: Some(SessionState::Active),
            session_id: None,
            flow_step: None,
        }
    }

    fn submit(app: &mut App, text: &str) -> (u64, ChatRequest) {
        match update(app, Action::Submit(text.to_string())) {
            Effect::SendChat { epoch, request } => (epoch, request),
            other => panic!("expected SendChat, got {:?}", other),
        }
    }

    #[test]
    fn submit_appends_one_user_message_before_reply() {
        let mut app = test_app();
        let (_, request) = submit(&mut app, "我的订单到哪了");

        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].role, Role::User);
        assert_eq!(app.messages[0].content, "我的订单到哪了");
        assert!(app.messages[0].timestamp.is_some());
        assert!(app.is_loading);
        assert_eq!(request.message, "我的订单到哪了");
        assert_eq!(request.session_id, app.session_id);
        assert_eq!(request.user_id, app.user_id);
    }

    #[test]
    fn successful_reply_appends_one_assistant_message() {
        let mut app = test_app();
        let (epoch, _) = submit(&mut app, "hi");

        let effect = update(
            &mut app,
            Action::ReplyReceived {
                epoch,
                response: reply("您好"),
            },
        );

        assert_eq!(effect, Effect::None);
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[1].role, Role::Assistant);
        assert_eq!(app.messages[1].content, "您好");
        assert!(app.messages[1].timestamp.is_some());
        assert!(!app.is_loading);
        assert_eq!(app.intent_type, Some(IntentType::Faq));
        assert_eq!(app.session_state, Some(SessionState::Active));
    }

    #[test]
    fn history_excludes_message_being_sent() {
        let mut app = test_app();
        let (epoch, first) = submit(&mut app, "first");
        assert_eq!(first.history, Some(vec![]));
        update(
            &mut app,
            Action::ReplyReceived {
                epoch,
                response: reply("ok"),
            },
        );

        let (_, second) = submit(&mut app, "second");
        let history = second.history.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].role, Role::Assistant);
        assert!(history.iter().all(|m| m.timestamp.is_none()));
    }

    #[test]
    fn flow_response_updates_state_and_intent() {
        let mut app = test_app();
        let (epoch, _) = submit(&mut app, "我要退货");
        update(
            &mut app,
            Action::ReplyReceived {
                epoch,
                response: ChatResponse {
                    reply: "请提供订单号".into(),
                    intent_type: IntentType::Flow,
                    session_state: Some(SessionState::OnFlow),
                    session_id: None,
                    flow_step: Some("ask_order_id".into()),
                },
            },
        );
        assert_eq!(app.session_state, Some(SessionState::OnFlow));
        assert_eq!(app.intent_type, Some(IntentType::Flow));
        assert_eq!(app.flow_step.as_deref(), Some("ask_order_id"));
    }

    #[test]
    fn failure_keeps_optimistic_message_and_records_error() {
        let mut app = test_app();
        let (epoch, _) = submit(&mut app, "hi");
        update(
            &mut app,
            Action::RequestFailed {
                epoch,
                message: "rate limited".into(),
            },
        );
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].role, Role::User);
        assert_eq!(app.error.as_deref(), Some("rate limited"));
        assert!(!app.is_loading);
    }

    #[test]
    fn next_submit_clears_previous_error() {
        let mut app = test_app();
        app.error = Some("old".into());
        submit(&mut app, "again");
        assert!(app.error.is_none());
    }

    #[test]
    fn empty_submit_is_ignored() {
        let mut app = test_app();
        assert_eq!(update(&mut app, Action::Submit("   \n".into())), Effect::None);
        assert!(app.messages.is_empty());
        assert!(!app.is_loading);
    }

    #[test]
    fn submit_while_loading_is_rejected() {
        let mut app = test_app();
        submit(&mut app, "one");
        assert_eq!(update(&mut app, Action::Submit("two".into())), Effect::None);
        assert_eq!(app.messages.len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut app = test_app();
        let (epoch, _) = submit(&mut app, "hi");
        update(
            &mut app,
            Action::ReplyReceived {
                epoch,
                response: reply("hello"),
            },
        );
        app.error = Some("boom".into());

        let effect = update(&mut app, Action::ClearSession);

        assert_eq!(effect, Effect::None);
        assert!(app.messages.is_empty());
        assert!(app.session_state.is_none());
        assert!(app.intent_type.is_none());
        assert!(app.error.is_none());
        assert!(!app.is_loading);
    }

    #[test]
    fn reply_after_clear_is_dropped() {
        let mut app = test_app();
        let (epoch, _) = submit(&mut app, "hi");
        update(&mut app, Action::ClearSession);
        update(
            &mut app,
            Action::ReplyReceived {
                epoch,
                response: reply("late"),
            },
        );
        assert!(app.messages.is_empty());
        assert!(app.intent_type.is_none());
    }

    #[test]
    fn clear_remote_requests_delete() {
        let mut app = test_app();
        app.clear_remote = true;
        let effect = update(&mut app, Action::ClearSession);
        assert_eq!(
            effect,
            Effect::ClearRemote {
                session_id: app.session_id.clone()
            }
        );
    }

    #[test]
    fn recognized_intent_is_shown_as_system_json() {
        let mut app = test_app();
        let effect = update(&mut app, Action::RecognizeDraft("查物流".into()));
        let Effect::RecognizeIntent { epoch, request } = effect else {
            panic!("expected RecognizeIntent");
        };
        assert_eq!(request.message, "查物流");
        // Classifying a draft doesn't send it.
        assert!(app.messages.is_empty());
        assert!(!app.is_loading);

        update(
            &mut app,
            Action::IntentRecognized {
                epoch,
                response: IntentRecognitionResponse {
                    intent: IntentType::Flow,
                    confidence: 0.9,
                    reply: None,
                    flow_id: Some("logistics".into()),
                    suggestions: None,
                },
            },
        );
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].role, Role::System);
        let value: serde_json::Value = serde_json::from_str(&app.messages[0].content).unwrap();
        assert_eq!(value["intent"], "flow");
        assert_eq!(value["flow_id"], "logistics");
    }

    #[test]
    fn open_history_fetches_current_session() {
        let mut app = test_app();
        assert_eq!(
            update(&mut app, Action::OpenHistory),
            Effect::FetchHistory {
                session_id: app.session_id.clone()
            }
        );
    }

    #[test]
    fn health_check_sets_online_flag() {
        let mut app = test_app();
        update(&mut app, Action::HealthChecked(Err("refused".into())));
        assert_eq!(app.backend_online, Some(false));
        update(&mut app, Action::HealthChecked(Ok("ok".into())));
        assert_eq!(app.backend_online, Some(true));
    }
}
