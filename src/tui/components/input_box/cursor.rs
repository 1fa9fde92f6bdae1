//! Cursor position tracking and navigation for the InputBox.
//!
//! `CursorState` owns the cursor byte offset, scroll offset and cached width.
//! The text itself is owned by `InputBox` and passed in explicitly.

use super::text_wrap::{
    CONTENT_OFFSET, MAX_VISIBLE_LINES, display_width, inner_width, line_index, line_spans,
    offset_at_column,
};
use ratatui::layout::Rect;

pub(super) struct CursorState {
    /// Byte offset in buffer (0..=buffer.len()), always on a char boundary
    pub pos: usize,
    /// First visible wrapped line (0 when content fits)
    pub scroll_offset: u16,
    /// Content width from last render, used for vertical movement
    pub last_content_width: u16,
}

impl CursorState {
    const DEFAULT_WIDTH: u16 = 80;

    pub fn new() -> Self {
        Self {
            pos: 0,
            scroll_offset: 0,
            last_content_width: Self::DEFAULT_WIDTH,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.scroll_offset = 0;
    }

    /// Move one wrapped line up (`-1`) or down (`1`), keeping the display
    /// column where possible. Returns `false` at the first/last line.
    pub fn move_vertically(&mut self, buffer: &str, direction: i16, content_width: u16) -> bool {
        let width = inner_width(content_width);
        if width == 0 || buffer.is_empty() {
            return false;
        }

        let spans = line_spans(buffer, width);
        let current = line_index(&spans, self.pos);
        let target = if direction < 0 {
            match current.checked_sub(1) {
                Some(t) => t,
                None => return false,
            }
        } else if current + 1 < spans.len() {
            current + 1
        } else {
            return false;
        };

        let column = display_width(&buffer[spans[current].start..self.pos]);
        let line = &buffer[spans[target].clone()];
        self.pos = spans[target].start + offset_at_column(line, column);
        true
    }

    /// Wrapped line (0-based) the cursor is on.
    pub fn calculate_line(&self, buffer: &str, content_width: u16) -> u16 {
        let width = inner_width(content_width);
        line_index(&line_spans(buffer, width), self.pos) as u16
    }

    /// Keep the cursor line inside the visible window.
    pub fn update_scroll_offset(&mut self, buffer: &str, content_width: u16) {
        let width = inner_width(content_width);
        let total_lines = line_spans(buffer, width).len() as u16;
        if total_lines <= MAX_VISIBLE_LINES {
            self.scroll_offset = 0;
            return;
        }

        let cursor_line = self.calculate_line(buffer, content_width);
        if cursor_line < self.scroll_offset {
            self.scroll_offset = cursor_line;
        } else if cursor_line >= self.scroll_offset + MAX_VISIBLE_LINES {
            self.scroll_offset = cursor_line.saturating_sub(MAX_VISIBLE_LINES - 1);
        }
    }

    /// Screen `(column, row)` of the cursor. Columns count display cells,
    /// so a CJK character advances the cursor by two.
    pub fn screen_pos(&self, buffer: &str, area: Rect) -> (u16, u16) {
        let width = inner_width(area.width);
        if width == 0 {
            return (area.x + CONTENT_OFFSET, area.y + 1);
        }

        let spans = line_spans(buffer, width);
        let line = line_index(&spans, self.pos);
        let column = display_width(&buffer[spans[line].start..self.pos]) as u16;
        let visible_line = (line as u16).saturating_sub(self.scroll_offset);

        (area.x + CONTENT_OFFSET + column, area.y + 1 + visible_line)
    }
}
