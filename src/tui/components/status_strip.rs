//! One-line strip under the title: session state, intent type and flow step.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::api::{IntentType, SessionState};
use crate::tui::component::Component;

pub fn session_state_label(state: SessionState) -> &'static str {
    match state {
        SessionState::New => "新会话",
        SessionState::Active => "活跃",
        SessionState::OnFlow => "流程中",
        SessionState::Complete => "已完成",
    }
}

pub fn intent_label(intent: IntentType) -> &'static str {
    match intent {
        IntentType::Faq => "FAQ",
        IntentType::Flow => "流程",
        IntentType::Unknown => "未知",
    }
}

/// Unset fields render nothing; with everything unset the strip is blank.
pub struct StatusStrip<'a> {
    pub session_state: Option<SessionState>,
    pub intent_type: Option<IntentType>,
    pub flow_step: Option<&'a str>,
}

impl StatusStrip<'_> {
    pub fn line(&self) -> Line<'static> {
        let label = Style::default().fg(Color::DarkGray);
        let mut fields: Vec<(String, Style)> = Vec::new();
        if let Some(state) = self.session_state {
            let style = match state {
                SessionState::OnFlow => Style::default().fg(Color::Yellow),
                SessionState::Complete => Style::default().fg(Color::Green),
                _ => Style::default().fg(Color::Cyan),
            };
            fields.push((format!("状态: {}", session_state_label(state)), style));
        }
        if let Some(intent) = self.intent_type {
            fields.push((format!("类型: {}", intent_label(intent)), Style::default().fg(Color::Cyan)));
        }
        if let Some(step) = self.flow_step.filter(|s| !s.is_empty()) {
            fields.push((format!("步骤: {step}"), Style::default().fg(Color::Magenta)));
        }

        let mut spans = vec![Span::raw(" ")];
        for (i, (text, style)) in fields.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", label));
            }
            spans.push(Span::styled(text, style));
        }
        Line::from(spans)
    }
}

impl Component for StatusStrip<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.line(), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::buffer_text;
    use ratatui::{Terminal, backend::TestBackend};

    fn draw(strip: &mut StatusStrip<'_>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 1)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                strip.render(f, area)
            })
            .unwrap();
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn flow_state_and_intent() {
        let text = draw(&mut StatusStrip {
            session_state: Some(SessionState::OnFlow),
            intent_type: Some(IntentType::Flow),
            flow_step: None,
        });
        assert!(text.contains("状态: 流程中"));
        assert!(text.contains("类型: 流程"));
    }

    #[test]
    fn unset_fields_render_nothing() {
        let text = draw(&mut StatusStrip {
            session_state: None,
            intent_type: None,
            flow_step: None,
        });
        assert_eq!(text.trim(), "");
    }

    #[test]
    fn flow_step_is_shown() {
        let text = draw(&mut StatusStrip {
            session_state: Some(SessionState::OnFlow),
            intent_type: None,
            flow_step: Some("collect_order_id"),
        });
        assert!(text.contains("步骤: collect_order_id"));
        assert!(!text.contains("类型"));
    }

    #[test]
    fn labels() {
        assert_eq!(session_state_label(SessionState::New), "新会话");
        assert_eq!(session_state_label(SessionState::Active), "活跃");
        assert_eq!(session_state_label(SessionState::Complete), "已完成");
        assert_eq!(intent_label(IntentType::Faq), "FAQ");
        assert_eq!(intent_label(IntentType::Unknown), "未知");
    }
}
