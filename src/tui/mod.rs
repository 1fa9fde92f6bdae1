//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard events into `core::Action` values and carries out
//! the `Effect`s that `update()` returns.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event loop
//!
//! Each iteration draws (if needed), waits for terminal input, handles every
//! pending event, then drains the `mpsc` channel that background requests
//! report into. Network calls run as tokio tasks and never touch `App`
//! directly; they send an `Action` back instead.
//!
//! ## Redraw Strategy
//!
//! - **Animating** (reply pending, history loading): draws every ~80ms so the
//!   typing indicator moves.
//! - **Idle**: sleeps up to 250ms, only redraws on events or results.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call.

mod component;
mod components;
mod event;
pub mod markdown;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;

use crate::api::{ChatBackend, HttpBackend};
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::state::App;
use crate::tui::component::EventHandler;
use crate::tui::components::history_modal::HistoryPhase;
use crate::tui::components::{
    HistoryEvent, HistoryModalState, InputBox, InputEvent, MessageListState,
};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// Modal input mode: determines how keyboard events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Navigate messages with arrow keys. Typing auto-switches to Input.
    Cursor,
    /// Text editing in the input box. Esc switches to Cursor.
    Input,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
    pub input_mode: InputMode,
    /// History overlay (None = hidden)
    pub history: Option<HistoryModalState>,
    /// Id handed to the next history modal
    next_history_request: u64,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            input_mode: InputMode::Input, // User expects to type immediately
            history: None,
            next_history_request: 0,
        }
    }

    fn open_history(&mut self) -> u64 {
        self.next_history_request += 1;
        self.history = Some(HistoryModalState::new(self.next_history_request));
        self.next_history_request
    }

    fn animating(&self, app: &App) -> bool {
        app.is_loading
            || self
                .history
                .as_ref()
                .is_some_and(|h| h.phase == HistoryPhase::Loading)
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Kitty keyboard protocol lets Shift+Enter through; terminals
        // without it ignore the request
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!(
            "Terminal modes enabled (mouse, bracketed paste, steady block cursor, keyboard enhancement)"
        );
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    info!("Using backend at {}", config.base_url);
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(config.base_url.clone()));
    let mut app = App::from_config(backend, &config);
    let mut tui = TuiState::new();
    info!("Session {} (user {})", app.session_id, app.user_id);

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = match TerminalModeGuard::new() {
        Ok(guard) => Some(guard),
        Err(e) => {
            warn!("Failed to enable terminal modes: {}", e);
            None
        }
    };

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();

    if config.check_health {
        spawn_health_check(&app, tx.clone());
    }

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        let animating = tui.animating(&app);
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 4.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if animating {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(250)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain all pending events before next draw
        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(event, &mut app, &mut tui, &tx) {
                should_quit = true;
                break;
            }
        }
        if should_quit {
            break;
        }

        // Results from background requests
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            if dispatch(action, &mut app, &mut tui, &tx) {
                should_quit = true;
            }
        }
        if should_quit {
            break;
        }
    }

    ratatui::restore();
    info!("Shutting down");
    Ok(())
}

/// Route one terminal event. Returns true when the app should quit.
fn handle_event(
    event: TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    tx: &mpsc::Sender<Action>,
) -> bool {
    match event {
        // Resize just needs a redraw (already flagged)
        TuiEvent::Resize => return false,
        TuiEvent::ForceQuit => return dispatch(Action::Quit, app, tui, tx),
        _ => {}
    }

    // While the history modal is open it receives everything
    if let Some(history) = tui.history.as_mut() {
        if history.handle_event(&event) == Some(HistoryEvent::Dismiss) {
            tui.history = None;
        }
        return false;
    }

    match event {
        TuiEvent::NewSession => {
            tui.message_list = MessageListState::new();
            return dispatch(Action::ClearSession, app, tui, tx);
        }
        TuiEvent::OpenHistory => {
            tui.open_history();
            return dispatch(Action::OpenHistory, app, tui, tx);
        }
        TuiEvent::RecognizeDraft => {
            let draft = tui.input_box.draft().to_string();
            return dispatch(Action::RecognizeDraft(draft), app, tui, tx);
        }
        TuiEvent::MouseMove(col, row) => {
            tui.message_list.selected_index = tui.message_list.hit_test(col, row);
            return false;
        }
        TuiEvent::MouseClick(col, row) => {
            if let Some(idx) = tui.message_list.hit_test(col, row) {
                tui.message_list.selected_index = Some(idx);
                tui.message_list.toggle(idx, &app.messages);
            }
            return false;
        }
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown => {
            tui.message_list.handle_event(&event);
            return false;
        }
        _ => {}
    }

    match tui.input_mode {
        InputMode::Input => {
            if event == TuiEvent::Escape {
                tui.input_mode = InputMode::Cursor;
                tui.message_list.selected_index = app.messages.len().checked_sub(1);
                return false;
            }
            if let Some(InputEvent::Submit(text)) = tui.input_box.handle_event(&event) {
                return dispatch(Action::Submit(text), app, tui, tx);
            }
        }
        InputMode::Cursor => match event {
            TuiEvent::InputChar(' ') => {
                if let Some(idx) = tui.message_list.selected_index {
                    tui.message_list.toggle(idx, &app.messages);
                }
            }
            // Typing auto-switches to Input mode and forwards the event
            TuiEvent::InputChar(_) | TuiEvent::Paste(_) => {
                tui.input_mode = InputMode::Input;
                tui.message_list.selected_index = None;
                tui.input_box.handle_event(&event);
            }
            TuiEvent::Submit | TuiEvent::Escape => {
                tui.input_mode = InputMode::Input;
                tui.message_list.selected_index = None;
            }
            TuiEvent::CursorUp => {
                if !app.messages.is_empty() {
                    let idx = tui
                        .message_list
                        .selected_index
                        .map(|i| i.saturating_sub(1))
                        .unwrap_or(app.messages.len() - 1);
                    tui.message_list.selected_index = Some(idx);
                    tui.message_list.scroll_to_selected();
                }
            }
            TuiEvent::CursorDown => {
                if let Some(idx) = tui.message_list.selected_index
                    && idx + 1 < app.messages.len()
                {
                    tui.message_list.selected_index = Some(idx + 1);
                    tui.message_list.scroll_to_selected();
                }
            }
            _ => {}
        },
    }
    false
}

/// Apply an action and carry out its effect. Returns true on quit.
fn dispatch(action: Action, app: &mut App, tui: &mut TuiState, tx: &mpsc::Sender<Action>) -> bool {
    let effect = update(app, action);
    // Events later in the same batch must see the new loading state
    tui.input_box.disabled = app.is_loading;
    execute_effect(effect, app, tui, tx)
}

fn execute_effect(effect: Effect, app: &App, tui: &mut TuiState, tx: &mpsc::Sender<Action>) -> bool {
    match effect {
        Effect::None => {}
        Effect::Quit => return true,
        Effect::SendChat { epoch, request } => {
            info!("Spawning chat request (epoch {})", epoch);
            let backend = app.backend.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let action = match backend.send_message(&request).await {
                    Ok(response) => Action::ReplyReceived { epoch, response },
                    Err(e) => Action::RequestFailed {
                        epoch,
                        message: e.to_string(),
                    },
                };
                if tx.send(action).is_err() {
                    warn!("Failed to deliver chat result: receiver dropped");
                }
            });
        }
        Effect::RecognizeIntent { epoch, request } => {
            info!("Spawning intent recognition (epoch {})", epoch);
            let backend = app.backend.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let action = match backend.recognize_intent(&request).await {
                    Ok(response) => Action::IntentRecognized { epoch, response },
                    Err(e) => Action::IntentFailed {
                        epoch,
                        message: e.to_string(),
                    },
                };
                if tx.send(action).is_err() {
                    warn!("Failed to deliver intent result: receiver dropped");
                }
            });
        }
        Effect::FetchHistory { session_id } => {
            let Some(request_id) = tui.history.as_ref().map(|h| h.request_id) else {
                debug!("History fetch requested with no modal open");
                return false;
            };
            info!("Fetching history for {} (request {})", session_id, request_id);
            let backend = app.backend.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = backend
                    .get_session_history(&session_id)
                    .await
                    .map(|history| history.messages)
                    .map_err(|e| e.to_string());
                if tx.send(Action::HistoryLoaded { request_id, result }).is_err() {
                    warn!("Failed to deliver history: receiver dropped");
                }
            });
        }
        Effect::ClearRemote { session_id } => {
            let backend = app.backend.clone();
            tokio::spawn(async move {
                match backend.clear_session(&session_id).await {
                    Ok(()) => info!("Cleared session {} on backend", session_id),
                    Err(e) => warn!("Failed to clear session {}: {}", session_id, e),
                }
            });
        }
        Effect::DeliverHistory { request_id, result } => match tui.history.as_mut() {
            Some(history) => {
                history.apply(request_id, result);
            }
            None => debug!("History result {} arrived after modal closed", request_id),
        },
    }
    false
}

fn spawn_health_check(app: &App, tx: mpsc::Sender<Action>) {
    let backend = app.backend.clone();
    tokio::spawn(async move {
        let result = backend
            .health()
            .await
            .map(|h| h.status)
            .map_err(|e| e.to_string());
        if tx.send(Action::HealthChecked(result)).is_err() {
            warn!("Failed to deliver health result: receiver dropped");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Message, Role};
    use crate::test_support::test_app;

    fn setup() -> (App, TuiState, mpsc::Sender<Action>, mpsc::Receiver<Action>) {
        let (tx, rx) = mpsc::channel();
        (test_app(), TuiState::new(), tx, rx)
    }

    #[test]
    fn history_result_for_closed_modal_is_dropped() {
        let (mut app, mut tui, tx, _rx) = setup();
        execute_effect(
            Effect::DeliverHistory {
                request_id: 1,
                result: Ok(vec![]),
            },
            &app,
            &mut tui,
            &tx,
        );
        assert!(tui.history.is_none());

        tui.open_history();
        let quit = dispatch(
            Action::HistoryLoaded {
                request_id: 1,
                result: Ok(vec![Message::now(Role::User, "hi")]),
            },
            &mut app,
            &mut tui,
            &tx,
        );
        assert!(!quit);
        assert!(matches!(
            tui.history.as_ref().map(|h| &h.phase),
            Some(HistoryPhase::Loaded(m)) if m.len() == 1
        ));
    }

    #[test]
    fn reopened_modal_ignores_older_result() {
        let (mut app, mut tui, tx, _rx) = setup();
        tui.open_history();
        tui.history = None;
        let second = tui.open_history();
        assert_eq!(second, 2);
        dispatch(
            Action::HistoryLoaded {
                request_id: 1,
                result: Ok(vec![]),
            },
            &mut app,
            &mut tui,
            &tx,
        );
        assert_eq!(tui.history.as_ref().map(|h| &h.phase), Some(&HistoryPhase::Loading));
    }

    #[test]
    fn modal_swallows_keys_until_dismissed() {
        let (mut app, mut tui, tx, _rx) = setup();
        tui.open_history();
        handle_event(TuiEvent::InputChar('a'), &mut app, &mut tui, &tx);
        assert!(tui.input_box.buffer.is_empty());
        handle_event(TuiEvent::InputChar('q'), &mut app, &mut tui, &tx);
        assert!(tui.history.is_none());
    }

    #[tokio::test]
    async fn enter_while_waiting_keeps_draft() {
        let (mut app, mut tui, tx, _rx) = setup();
        for event in [
            TuiEvent::InputChar('a'),
            TuiEvent::Submit,
            TuiEvent::InputChar('b'),
            TuiEvent::Submit,
        ] {
            handle_event(event, &mut app, &mut tui, &tx);
        }
        assert_eq!(app.messages.len(), 1);
        assert!(app.is_loading);
        assert!(tui.input_box.disabled);
        assert_eq!(tui.input_box.buffer, "b");
    }

    #[test]
    fn clear_reenables_input() {
        let (mut app, mut tui, tx, _rx) = setup();
        app.is_loading = true;
        tui.input_box.disabled = true;
        handle_event(TuiEvent::NewSession, &mut app, &mut tui, &tx);
        assert!(!tui.input_box.disabled);
    }

    #[test]
    fn force_quit_quits() {
        let (mut app, mut tui, tx, _rx) = setup();
        assert!(handle_event(TuiEvent::ForceQuit, &mut app, &mut tui, &tx));
    }

    #[test]
    fn escape_enters_cursor_mode_on_last_message() {
        let (mut app, mut tui, tx, _rx) = setup();
        app.messages.push(Message::now(Role::User, "a"));
        app.messages.push(Message::now(Role::Assistant, "b"));
        handle_event(TuiEvent::Escape, &mut app, &mut tui, &tx);
        assert_eq!(tui.input_mode, InputMode::Cursor);
        assert_eq!(tui.message_list.selected_index, Some(1));

        handle_event(TuiEvent::CursorUp, &mut app, &mut tui, &tx);
        assert_eq!(tui.message_list.selected_index, Some(0));

        handle_event(TuiEvent::InputChar('x'), &mut app, &mut tui, &tx);
        assert_eq!(tui.input_mode, InputMode::Input);
        assert_eq!(tui.input_box.buffer, "x");
    }

    #[test]
    fn space_toggles_selected_table() {
        let (mut app, mut tui, tx, _rx) = setup();
        app.messages.push(Message::now(Role::Assistant, r#"{"a":1}"#));
        handle_event(TuiEvent::Escape, &mut app, &mut tui, &tx);
        handle_event(TuiEvent::InputChar(' '), &mut app, &mut tui, &tx);
        assert!(tui.message_list.collapsed.contains(&0));
    }

    #[test]
    fn empty_draft_recognition_is_a_no_op() {
        let (mut app, mut tui, tx, _rx) = setup();
        handle_event(TuiEvent::RecognizeDraft, &mut app, &mut tui, &tx);
        assert!(app.status_message.is_empty());
    }
}
