//! # History Modal
//!
//! Overlay showing the backend's record of the current session.
//! Opened with Ctrl+O, dismissed with Esc, `q` or a click outside.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `HistoryModalState` lives in `TuiState` while the modal is open
//! - `HistoryModal` is created each frame with borrowed state
//!
//! Each open gets a fresh `request_id`. The fetch result is tagged with it,
//! so a slow answer for an earlier open can't overwrite a newer one.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};

use crate::api::{Message, Role};
use crate::tui::components::message::format_timestamp;
use crate::tui::event::TuiEvent;

pub const TITLE: &str = " 会话历史 ";
pub const LOADING: &str = "加载中...";
pub const EMPTY: &str = "暂无历史记录";
const HELP: &str = " ↑↓ 滚动  Esc/q 关闭 ";
const PAGE: u16 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryPhase {
    Loading,
    Loaded(Vec<Message>),
    Errored(String),
}

/// Persistent state for the history overlay.
pub struct HistoryModalState {
    pub request_id: u64,
    pub phase: HistoryPhase,
    pub scroll: u16,
    /// Overlay rect from the last render, for click-outside detection
    overlay: Rect,
}

/// Events emitted by the history modal.
#[derive(Debug, PartialEq)]
pub enum HistoryEvent {
    Dismiss,
}

impl HistoryModalState {
    pub fn new(request_id: u64) -> Self {
        Self {
            request_id,
            phase: HistoryPhase::Loading,
            scroll: 0,
            overlay: Rect::default(),
        }
    }

    /// Resolve the pending fetch. Results for another open are ignored;
    /// returns whether this one was applied.
    pub fn apply(&mut self, request_id: u64, result: Result<Vec<Message>, String>) -> bool {
        if request_id != self.request_id {
            log::debug!(
                "Ignoring history result {} (modal is {})",
                request_id,
                self.request_id
            );
            return false;
        }
        self.phase = match result {
            Ok(messages) => HistoryPhase::Loaded(messages),
            Err(e) => HistoryPhase::Errored(e),
        };
        self.scroll = 0;
        true
    }

    pub fn handle_event(&mut self, event: &TuiEvent) -> Option<HistoryEvent> {
        match event {
            TuiEvent::Escape | TuiEvent::InputChar('q') => Some(HistoryEvent::Dismiss),
            TuiEvent::MouseClick(col, row) => {
                let inside = self.overlay.contains(Position { x: *col, y: *row });
                (!inside).then_some(HistoryEvent::Dismiss)
            }
            TuiEvent::CursorUp | TuiEvent::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            TuiEvent::CursorDown | TuiEvent::ScrollDown => {
                self.scroll = self.scroll.saturating_add(1);
                None
            }
            TuiEvent::ScrollPageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE);
                None
            }
            TuiEvent::ScrollPageDown => {
                self.scroll = self.scroll.saturating_add(PAGE);
                None
            }
            _ => None,
        }
    }
}

fn speaker(role: Role) -> (&'static str, Style) {
    match role {
        Role::User => ("你", Style::default().fg(Color::Green)),
        _ => ("客服", Style::default().fg(Color::Blue)),
    }
}

fn transcript(messages: &[Message]) -> Text<'static> {
    let mut lines = Vec::new();
    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        let (label, style) = speaker(message.role);
        let mut header = vec![Span::styled(label, style.add_modifier(Modifier::BOLD))];
        if let Some(ts) = message.timestamp.as_deref() {
            header.push(Span::styled(
                format!("  {}", format_timestamp(ts)),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));
        lines.extend(message.content.lines().map(|l| Line::from(l.to_string())));
    }
    Text::from(lines)
}

/// Transient render wrapper for the history overlay.
pub struct HistoryModal<'a> {
    state: &'a mut HistoryModalState,
}

impl<'a> HistoryModal<'a> {
    pub fn new(state: &'a mut HistoryModalState) -> Self {
        Self { state }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(80, 70, area);
        self.state.overlay = overlay;
        frame.render_widget(Clear, overlay);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(TITLE)
            .title_alignment(Alignment::Left)
            .title_bottom(Line::from(HELP).centered())
            .padding(Padding::horizontal(1));

        let notice = |text: String, style: Style| {
            Paragraph::new(text)
                .style(style)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
        };

        let paragraph = match &self.state.phase {
            HistoryPhase::Loading => notice(LOADING.into(), Style::default().fg(Color::DarkGray)),
            HistoryPhase::Errored(e) => notice(e.clone(), Style::default().fg(Color::Red)),
            HistoryPhase::Loaded(messages) if messages.is_empty() => {
                notice(EMPTY.into(), Style::default().fg(Color::DarkGray))
            }
            HistoryPhase::Loaded(messages) => {
                let inner = block.inner(overlay);
                let paragraph = Paragraph::new(transcript(messages)).wrap(Wrap { trim: false });
                let max_scroll = (paragraph.line_count(inner.width) as u16).saturating_sub(inner.height);
                self.state.scroll = self.state.scroll.min(max_scroll);
                paragraph.scroll((self.state.scroll, 0))
            }
        };

        frame.render_widget(paragraph.block(block), overlay);
    }
}

/// Compute a centered rect using percentage of the outer rect.
fn centered_rect(percent_x: u16, percent_y: u16, outer: Rect) -> Rect {
    let [_, center_v, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(center_v);
    center
}
