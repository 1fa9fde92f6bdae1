pub mod backend;
pub mod client;
pub mod types;

pub use backend::{ApiError, ChatBackend, GENERIC_FAILURE};
pub use client::HttpBackend;
pub use types::{
    ChatRequest, ChatResponse, HealthResponse, IntentRecognitionRequest,
    IntentRecognitionResponse, IntentType, Message, Role, SessionHistoryResponse, SessionState,
};
