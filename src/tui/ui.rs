use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::state::App;
use crate::tui::component::Component;
use crate::tui::components::{HistoryModal, MessageList, StatusStrip, TitleBar};
use crate::tui::{InputMode, TuiState};

/// Draw one frame.
///
/// ```text
/// ┌ title bar ──────────────────────┐  1
/// │ error banner (only with error)  │  0/1
/// │ status strip                    │  1
/// │ messages                        │  fill
/// │ input box                       │  3..7
/// └─────────────────────────────────┘
/// ```
///
/// The history modal, when open, is drawn over everything.
pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min};

    let full = frame.area();
    let input_height = tui.input_box.calculate_height(full.width);
    let banner_height = u16::from(app.error.is_some());
    let [title_area, banner_area, strip_area, main_area, input_area] = Layout::vertical([
        Length(1),
        Length(banner_height),
        Length(1),
        Min(0),
        Length(input_height),
    ])
    .areas(full);

    TitleBar::new(app.backend_online, app.status_message.clone()).render(frame, title_area);

    if let Some(error) = &app.error {
        let banner = Line::from(Span::styled(
            format!(" {error}"),
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(banner, banner_area);
    }

    StatusStrip {
        session_state: app.session_state,
        intent_type: app.intent_type,
        flow_step: app.flow_step.as_deref(),
    }
    .render(frame, strip_area);

    MessageList::new(
        &mut tui.message_list,
        &app.messages,
        app.is_loading,
        spinner_frame,
    )
    .render(frame, main_area);

    tui.input_box.disabled = app.is_loading;
    tui.input_box.dimmed = tui.input_mode == InputMode::Cursor || tui.history.is_some();
    tui.input_box.render(frame, input_area);

    if let Some(history) = tui.history.as_mut() {
        HistoryModal::new(history).render(frame, full);
    }
}
