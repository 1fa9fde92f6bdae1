//! # TitleBar Component
//!
//! Top bar: product name, backend health, transient status and key hints.
//!
//! TitleBar is purely presentational. It receives all data as props and has
//! no internal state:
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new(app.backend_online, app.status_message.clone());
//! title_bar.render(frame, title_area);
//! ```
//!
//! Layout, left to right:
//!
//! 1. `AI 智能客服`
//! 2. `● 在线` / `● 离线` once the health check has answered
//! 3. status message, if any
//! 4. key hints, right-aligned, dropped first on narrow terminals

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::tui::component::Component;

pub const TITLE: &str = "AI 智能客服";
pub const ONLINE: &str = "● 在线";
pub const OFFLINE: &str = "● 离线";
const KEY_HINTS: &str = "Ctrl+N 新会话 · Ctrl+O 历史 · Ctrl+K 意图 · Ctrl+C 退出";

pub struct TitleBar {
    /// `None` while the health check is pending or disabled
    pub backend_online: Option<bool>,
    pub status_message: String,
}

impl TitleBar {
    pub fn new(backend_online: Option<bool>, status_message: String) -> Self {
        Self {
            backend_online,
            status_message,
        }
    }

    fn left_spans(&self) -> Vec<Span<'static>> {
        let mut spans = vec![Span::styled(
            TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )];
        match self.backend_online {
            Some(true) => {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(ONLINE, Style::default().fg(Color::Green)));
            }
            Some(false) => {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(OFFLINE, Style::default().fg(Color::Red)));
            }
            None => {}
        }
        if !self.status_message.is_empty() {
            spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
            spans.push(Span::raw(self.status_message.clone()));
        }
        spans
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut spans = self.left_spans();
        let used: usize = spans.iter().map(|s| s.content.width()).sum();
        let room = (area.width as usize).saturating_sub(used);
        let hints_width = KEY_HINTS.width();
        if room > hints_width + 1 {
            spans.push(Span::raw(" ".repeat(room - hints_width)));
            spans.push(Span::styled(KEY_HINTS, Style::default().fg(Color::DarkGray)));
        }
        frame.render_widget(Line::from(spans), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::buffer_text;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(bar: &mut TitleBar, width: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, 1)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                bar.render(f, area)
            })
            .unwrap();
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn shows_online_indicator() {
        let text = draw(&mut TitleBar::new(Some(true), String::new()), 120);
        assert!(text.contains(TITLE));
        assert!(text.contains(ONLINE));
        assert!(!text.contains('|'));
    }

    #[test]
    fn shows_offline_and_status() {
        let text = draw(&mut TitleBar::new(Some(false), "客服正在输入...".into()), 120);
        assert!(text.contains(OFFLINE));
        assert!(text.contains("客服正在输入..."));
    }

    #[test]
    fn pending_health_shows_no_indicator() {
        let text = draw(&mut TitleBar::new(None, String::new()), 120);
        assert!(!text.contains('●'));
    }

    #[test]
    fn hints_dropped_when_narrow() {
        let wide = draw(&mut TitleBar::new(None, String::new()), 120);
        assert!(wide.contains("Ctrl+N"));
        let narrow = draw(&mut TitleBar::new(None, String::new()), 30);
        assert!(narrow.contains(TITLE));
        assert!(!narrow.contains("Ctrl+N"));
    }
}
