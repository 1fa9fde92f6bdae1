use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::api::{Message, Role};
use crate::tui::component::Component;
use crate::tui::markdown;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;
/// Bubbles never take more than this share of the window width.
const MAX_WIDTH_PERCENT: u32 = 80;
/// Key column cap so one long key does not squeeze every value.
const MAX_KEY_WIDTH: usize = 24;

pub const TOGGLE_EXPANDED: &str = "▼ 收起详情";
pub const TOGGLE_COLLAPSED: &str = "▶ 展开详情";
pub const JSON_HINT: &str = "JSON 格式";

/// Key/value rows for a structured (JSON object or array) reply.
///
/// Only non-user messages qualify: a user typing `{"a":1}` sees their own
/// text back. Object keys keep payload order; array rows are keyed by index.
/// Strings render unquoted, everything else as compact JSON.
pub fn parse_json_table(message: &Message) -> Option<Vec<(String, String)>> {
    if message.role == Role::User {
        return None;
    }
    let value: Value = serde_json::from_str(message.content.trim()).ok()?;
    match value {
        Value::Object(map) => Some(map.into_iter().map(|(k, v)| (k, cell_value(&v))).collect()),
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), cell_value(v)))
                .collect(),
        ),
        _ => None,
    }
}

fn cell_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `HH:MM:SS` in local time. Anything that is not RFC 3339 is shown as-is.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "你",
        Role::Assistant => "客服",
        Role::System => "系统",
    }
}

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Green),
        Role::Assistant => Style::default().fg(Color::Blue),
        Role::System => Style::default().fg(Color::Yellow),
    }
}

/// A single chat bubble. Transient: built each frame by the chat window.
///
/// JSON replies render as a collapsible key/value table, everything else
/// as markdown. Height and width are predicted up front via
/// [`layout`](Self::layout) so the list can position bubbles without
/// rendering them.
#[derive(Clone, Copy)]
pub struct MessageBubble<'a> {
    pub message: &'a Message,
    /// Table bubbles only; ignored for markdown.
    pub expanded: bool,
    /// Selected in Cursor mode or under the mouse
    pub is_selected: bool,
}

impl<'a> MessageBubble<'a> {
    pub fn new(message: &'a Message, expanded: bool, is_selected: bool) -> Self {
        Self {
            message,
            expanded,
            is_selected,
        }
    }

    fn body(message: &Message, expanded: bool) -> Text<'static> {
        let style = role_style(message.role);
        match parse_json_table(message) {
            Some(rows) => table_text(&rows, expanded, style),
            None => markdown::to_text(message.content.trim(), style),
        }
    }

    /// Bubble `(width, height)` when laid out in a window `window_width` wide.
    pub fn layout(message: &Message, expanded: bool, window_width: u16) -> (u16, u16) {
        let max_width = ((window_width as u32 * MAX_WIDTH_PERCENT) / 100) as u16;
        if max_width <= HORIZONTAL_OVERHEAD {
            // Degenerate case: no room for borders + padding.
            return (window_width, 1);
        }

        let body = Self::body(message, expanded);
        let stamp_width = message
            .timestamp
            .as_deref()
            .map(|t| format_timestamp(t).width())
            .unwrap_or(0);
        let natural = body
            .lines
            .iter()
            .map(Line::width)
            .max()
            .unwrap_or(0)
            .max(stamp_width)
            .max(role_label(message.role).width());
        let width = u16::try_from(natural)
            .unwrap_or(u16::MAX)
            .saturating_add(HORIZONTAL_OVERHEAD)
            .min(max_width);

        let inner = width - HORIZONTAL_OVERHEAD;
        let lines = Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .line_count(inner);
        let lines = u16::try_from(lines).unwrap_or(u16::MAX - VERTICAL_OVERHEAD);
        (width, lines.max(1).saturating_add(VERTICAL_OVERHEAD))
    }

    pub fn calculate_height(message: &Message, expanded: bool, window_width: u16) -> u16 {
        Self::layout(message, expanded, window_width).1
    }

    /// Rect for this bubble inside a row `row` of the window: user bubbles
    /// hug the right edge, others the left.
    pub fn placement(message: &Message, expanded: bool, row: Rect) -> Rect {
        let (width, height) = Self::layout(message, expanded, row.width);
        let x = match message.role {
            Role::User => row.x + row.width.saturating_sub(width),
            _ => row.x,
        };
        Rect::new(x, row.y, width, height.min(row.height))
    }
}

fn table_text(rows: &[(String, String)], expanded: bool, style: Style) -> Text<'static> {
    let muted = Style::default().fg(Color::DarkGray);
    let toggle = if expanded { TOGGLE_EXPANDED } else { TOGGLE_COLLAPSED };
    let mut lines = vec![Line::from(vec![
        Span::styled(toggle, style.add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {JSON_HINT}"), muted),
    ])];
    if !expanded {
        return Text::from(lines);
    }

    let key_width = rows
        .iter()
        .map(|(k, _)| k.width())
        .max()
        .unwrap_or(0)
        .min(MAX_KEY_WIDTH);
    for (key, value) in rows {
        let pad = key_width.saturating_sub(key.width());
        lines.push(Line::from(vec![
            Span::styled(
                format!("{key}{}", " ".repeat(pad)),
                style.add_modifier(Modifier::BOLD),
            ),
            Span::styled(" │ ", muted),
            Span::styled(value.clone(), style),
        ]));
    }
    Text::from(lines)
}

impl<'a> Widget for MessageBubble<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let style = role_style(self.message.role);
        let border_style = if self.is_selected {
            Style::default().fg(Color::Cyan)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        let mut block = Block::bordered()
            .title(role_label(self.message.role))
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));
        if let Some(ts) = self.message.timestamp.as_deref() {
            block = block.title_bottom(
                Line::from(Span::styled(
                    format_timestamp(ts),
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(Alignment::Right),
            );
        }

        let inner_area = block.inner(area);
        block.render(area, buf);

        Paragraph::new(Self::body(self.message, self.expanded))
            .wrap(Wrap { trim: false })
            .render(inner_area, buf);
    }
}

impl<'a> Component for MessageBubble<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}
