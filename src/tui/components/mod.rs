//! # TUI Components
//!
//! All widgets of the support client.
//!
//! ## Component Architecture
//!
//! Components in this directory follow two patterns:
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components that receive all data as struct fields:
//! - `TitleBar`: product name, backend health, status text, key hints
//! - `StatusStrip`: session state / intent type / flow step labels
//! - `MessageBubble`: one chat message (markdown or JSON table)
//!
//! ### Stateful Components (Event-Driven)
//!
//! Components that keep local state across frames and emit events:
//! - `InputBox`: message composer
//! - `MessageList`: scrollable conversation with layout caching
//! - `HistoryModal`: backend history overlay
//!
//! Stateful components are split in two: a persistent `...State` owned by
//! `TuiState`, and a transient wrapper built each frame that borrows it.
//!
//! ## Module Structure
//!
//! ```text
//! components/
//! ├── mod.rs            (this file)
//! ├── title_bar.rs      (top bar)
//! ├── status_strip.rs   (session labels)
//! ├── message.rs        (single bubble)
//! ├── message_list.rs   (scrollable container)
//! ├── history_modal.rs  (history overlay)
//! └── input_box/        (composer)
//! ```

pub mod history_modal;
pub mod input_box;
pub mod message;
pub mod message_list;
pub mod status_strip;
mod title_bar;

pub use history_modal::{HistoryEvent, HistoryModal, HistoryModalState};
pub use input_box::{InputBox, InputEvent};
pub use message_list::{MessageList, MessageListState};
pub use status_strip::StatusStrip;
pub use title_bar::TitleBar;
