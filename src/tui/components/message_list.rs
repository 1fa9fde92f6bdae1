//! # MessageList Component
//!
//! Scrollable view of the conversation.
//!
//! ## Responsibilities
//!
//! - Display chat bubbles, the empty-session greeting and the typing indicator
//! - Keep the view pinned to the newest message until the user scrolls away
//! - Hit testing for mouse interactions
//! - Cache bubble heights so only new or toggled bubbles are measured
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the transcript (props).
//! `Component::render` takes `&mut self`, so the layout cache and scroll
//! state are updated during the render pass.

use std::collections::HashSet;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::api::Message;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::{MessageBubble, parse_json_table};
use crate::tui::event::TuiEvent;

pub const GREETING: &str = "你好！有什么可以帮你的吗？";
pub const GREETING_HINT: &str = "发送消息开始对话";

/// Rows reserved under the last bubble for the typing indicator.
const TYPING_ROWS: u16 = 1;

/// Layout and scroll state for the message list.
/// Must be persisted in the parent TuiState.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Currently selected message index (hover or keyboard navigation)
    pub selected_index: Option<usize>,
    /// JSON bubbles the user folded. Bubbles start expanded.
    pub collapsed: HashSet<usize>,
    /// Screen rect of the last render (for hit testing and scroll clamping)
    pub viewport: Rect,
    /// Rows drawn below the last bubble in the last render
    trailing_rows: u16,
    /// Message count seen by the last render
    rendered_len: usize,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            selected_index: None,
            collapsed: HashSet::new(),
            viewport: Rect::default(),
            trailing_rows: 0,
            rendered_len: 0,
        }
    }

    fn content_height(&self) -> u16 {
        self.layout.total_height().saturating_add(self.trailing_rows)
    }

    fn max_offset(&self) -> u16 {
        self.content_height().saturating_sub(self.viewport.height)
    }

    /// Re-pin to the bottom whenever the transcript length changes.
    /// A shorter transcript means it was cleared: per-message UI state goes too.
    pub fn sync_len(&mut self, len: usize) {
        if len == self.rendered_len {
            return;
        }
        if len < self.rendered_len {
            self.collapsed.clear();
            self.selected_index = None;
        }
        self.stick_to_bottom = true;
        self.rendered_len = len;
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Scroll the viewport so the selected message is fully visible.
    /// If the message is taller than the viewport, align its top edge.
    pub fn scroll_to_selected(&mut self) {
        let Some(idx) = self.selected_index else {
            return;
        };
        if idx >= self.layout.prefix_heights.len() {
            return;
        }

        let item_top = if idx == 0 {
            0
        } else {
            self.layout.prefix_heights[idx - 1]
        };
        let item_bottom = self.layout.prefix_heights[idx];
        let offset_y = self.scroll_state.offset().y;

        if item_top < offset_y {
            self.scroll_state.set_offset(Position { x: 0, y: item_top });
            self.stick_to_bottom = false;
        } else if item_bottom > offset_y + self.viewport.height {
            let new_y = item_bottom.saturating_sub(self.viewport.height);
            self.scroll_state.set_offset(Position { x: 0, y: new_y });
            self.stick_to_bottom = new_y >= self.max_offset();
        }
    }

    /// Clamp scroll and re-engage auto-scroll if the user has reached the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Flip the expanded flag of a JSON bubble. Returns false (and does
    /// nothing) for bubbles that are not tables.
    pub fn toggle(&mut self, index: usize, messages: &[Message]) -> bool {
        let is_table = messages
            .get(index)
            .is_some_and(|m| parse_json_table(m).is_some());
        if !is_table {
            return false;
        }
        if !self.collapsed.remove(&index) {
            self.collapsed.insert(index);
        }
        true
    }

    /// Message index under a screen position, using the last rendered layout.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<usize> {
        if !self.viewport.contains(Position { x: column, y: row }) {
            return None;
        }
        let content_y = (row - self.viewport.y).saturating_add(self.scroll_state.offset().y);
        let idx = self
            .layout
            .prefix_heights
            .partition_point(|&end| end <= content_y);
        (idx < self.layout.prefix_heights.len()).then_some(idx)
    }
}

/// Scrollable conversation view component.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [Message],
    pub is_loading: bool,
    pub spinner_frame: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        messages: &'a [Message],
        is_loading: bool,
        spinner_frame: usize,
    ) -> Self {
        Self {
            state,
            messages,
            is_loading,
            spinner_frame,
        }
    }

    fn render_greeting(frame: &mut Frame, area: Rect) {
        let [_, middle, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(3),
            Constraint::Fill(1),
        ])
        .areas(area);
        let text = vec![
            Line::from(Span::styled(
                GREETING,
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(GREETING_HINT, Style::default().fg(Color::DarkGray))),
        ];
        frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), middle);
    }
}

/// Three dots with one lit, cycling on `spinner_frame`.
pub fn typing_line(spinner_frame: usize) -> Line<'static> {
    let lit = spinner_frame % 3;
    let mut spans = vec![Span::raw(" ")];
    for i in 0..3 {
        let style = if i == lit {
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled("●", style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.state.viewport = area;
        self.state.sync_len(self.messages.len());

        if self.messages.is_empty() && !self.is_loading {
            self.state.layout = LayoutCache::new();
            self.state.trailing_rows = 0;
            self.state.scroll_state = ScrollViewState::default();
            Self::render_greeting(frame, area);
            return;
        }

        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area
        let num_items = self.messages.len();

        // 1. Update layout cache
        let collapsed = &self.state.collapsed;
        let layout = &mut self.state.layout;
        let reusable = layout.reusable_count(num_items, content_width, collapsed);
        layout.heights.truncate(reusable.min(layout.heights.len()));
        for (i, message) in self.messages.iter().enumerate().skip(layout.heights.len()) {
            let expanded = !collapsed.contains(&i);
            layout
                .heights
                .push(MessageBubble::calculate_height(message, expanded, content_width));
        }
        layout.rebuild_prefix_heights();
        layout.update_metadata(num_items, content_width, collapsed);

        let total_height = self.state.layout.total_height();
        self.state.trailing_rows = if self.is_loading { TYPING_ROWS } else { 0 };
        let canvas_height = total_height + self.state.trailing_rows;

        // 2. Clamp (auto-scroll handles the pinned case)
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible bubbles into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, canvas_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = if visible_range.start > 0 {
            self.state.layout.prefix_heights[visible_range.start - 1]
        } else {
            0
        };

        for i in visible_range {
            let message = &self.messages[i];
            let height = self.state.layout.heights[i];
            let expanded = !self.state.collapsed.contains(&i);
            let row = Rect::new(0, y_offset, content_width, height);
            let bubble = MessageBubble::new(message, expanded, self.state.selected_index == Some(i));
            scroll_view.render_widget(bubble, MessageBubble::placement(message, expanded, row));
            y_offset += height;
        }

        if self.is_loading {
            scroll_view.render_widget(
                Paragraph::new(typing_line(self.spinner_frame)),
                Rect::new(0, total_height, content_width, TYPING_ROWS),
            );
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// Implemented on the state rather than `MessageList`: the list is rebuilt
/// every frame, scroll position must survive between frames.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

/// Cached bubble heights
pub struct LayoutCache {
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    message_count: usize,
    content_width: u16,
    /// Collapse state the heights were measured with
    cached_collapsed: HashSet<usize>,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            message_count: 0,
            content_width: 0,
            cached_collapsed: HashSet::new(),
        }
    }

    /// How many leading cached heights are still valid. Messages never change
    /// once appended, so only width, clearing and toggles invalidate.
    pub fn reusable_count(
        &self,
        message_count: usize,
        content_width: u16,
        collapsed: &HashSet<usize>,
    ) -> usize {
        if self.content_width != content_width || self.heights.is_empty() {
            return 0;
        }
        if message_count < self.message_count {
            return 0;
        }
        if collapsed != &self.cached_collapsed
            && let Some(earliest) = collapsed
                .symmetric_difference(&self.cached_collapsed)
                .copied()
                .min()
        {
            return earliest.min(message_count);
        }
        message_count
    }

    pub fn update_metadata(
        &mut self,
        message_count: usize,
        content_width: u16,
        collapsed: &HashSet<usize>,
    ) {
        self.message_count = message_count;
        self.content_width = content_width;
        self.cached_collapsed = collapsed.clone();
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;
    use crate::test_support::buffer_text;
    use ratatui::{Terminal, backend::TestBackend};

    fn msg(role: Role, content: &str) -> Message {
        Message {
            role,
            content: content.to_string(),
            timestamp: None,
        }
    }

    fn draw(state: &mut MessageListState, messages: &[Message], loading: bool, h: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(40, h)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                MessageList::new(state, messages, loading, 0).render(f, area)
            })
            .unwrap();
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn empty_list_shows_greeting() {
        let mut state = MessageListState::new();
        let text = draw(&mut state, &[], false, 10);
        assert!(text.contains(GREETING));
        assert!(text.contains(GREETING_HINT));
    }

    #[test]
    fn messages_replace_greeting() {
        let mut state = MessageListState::new();
        let messages = vec![msg(Role::User, "在吗"), msg(Role::Assistant, "在的")];
        let text = draw(&mut state, &messages, false, 10);
        assert!(!text.contains(GREETING));
        assert!(text.contains("在吗"));
        assert!(text.contains("在的"));
    }

    #[test]
    fn loading_shows_typing_dots() {
        let mut state = MessageListState::new();
        let messages = vec![msg(Role::User, "hello")];
        let text = draw(&mut state, &messages, true, 10);
        assert_eq!(text.matches('●').count(), 3);
        let idle = draw(&mut MessageListState::new(), &messages, false, 10);
        assert_eq!(idle.matches('●').count(), 0);
    }

    #[test]
    fn typing_line_cycles() {
        let lit = |frame| {
            typing_line(frame)
                .spans
                .iter()
                .position(|s| s.content == "●" && s.style.fg == Some(Color::Blue))
        };
        assert_ne!(lit(0), lit(1));
        assert_eq!(lit(0), lit(3));
    }

    #[test]
    fn new_message_repins_to_bottom() {
        let mut state = MessageListState::new();
        let mut messages: Vec<Message> = (0..10).map(|i| msg(Role::User, &format!("m{i}"))).collect();
        draw(&mut state, &messages, false, 6);
        state.handle_event(&TuiEvent::ScrollUp);
        assert!(!state.stick_to_bottom);

        // Same length: stays where the user put it
        draw(&mut state, &messages, false, 6);
        assert!(!state.stick_to_bottom);

        messages.push(msg(Role::Assistant, "new"));
        draw(&mut state, &messages, false, 6);
        assert!(state.stick_to_bottom);
        assert_eq!(state.scroll_state.offset().y, state.max_offset());
    }

    #[test]
    fn clearing_resets_toggles() {
        let mut state = MessageListState::new();
        let messages = vec![msg(Role::Assistant, r#"{"a":1}"#)];
        draw(&mut state, &messages, false, 10);
        assert!(state.toggle(0, &messages));
        state.selected_index = Some(0);
        draw(&mut state, &[], false, 10);
        assert!(state.collapsed.is_empty());
        assert_eq!(state.selected_index, None);
    }

    #[test]
    fn toggle_only_applies_to_tables() {
        let mut state = MessageListState::new();
        let messages = vec![msg(Role::Assistant, "plain"), msg(Role::Assistant, r#"{"a":1}"#)];
        assert!(!state.toggle(0, &messages));
        assert!(state.toggle(1, &messages));
        assert!(state.collapsed.contains(&1));
        assert!(state.toggle(1, &messages));
        assert!(state.collapsed.is_empty());
        assert!(!state.toggle(5, &messages));
    }

    #[test]
    fn hit_test_maps_rows_to_messages() {
        let mut state = MessageListState::new();
        let messages = vec![msg(Role::User, "a"), msg(Role::Assistant, "b")];
        draw(&mut state, &messages, false, 20);
        // Each single-line bubble is 3 rows tall
        assert_eq!(state.hit_test(1, 0), Some(0));
        assert_eq!(state.hit_test(1, 2), Some(0));
        assert_eq!(state.hit_test(1, 3), Some(1));
        assert_eq!(state.hit_test(1, 6), None);
        assert_eq!(state.hit_test(100, 0), None);
    }

    #[test]
    fn layout_cache_reusable() {
        let mut cache = LayoutCache::new();
        let none = HashSet::new();
        cache.heights = vec![1; 5];
        cache.update_metadata(5, 80, &none);

        assert_eq!(cache.reusable_count(5, 80, &none), 5);
        assert_eq!(cache.reusable_count(6, 80, &none), 6);
        assert_eq!(cache.reusable_count(5, 40, &none), 0);
        assert_eq!(cache.reusable_count(0, 80, &none), 0);
    }

    #[test]
    fn toggle_invalidates_from_earliest_change() {
        let mut cache = LayoutCache::new();
        let none = HashSet::new();
        cache.heights = vec![3, 3, 3];
        cache.update_metadata(3, 80, &none);

        let mut collapsed = HashSet::new();
        collapsed.insert(1);
        assert_eq!(cache.reusable_count(3, 80, &collapsed), 1);
    }

    #[test]
    fn visible_range_covers_viewport() {
        let mut cache = LayoutCache::new();
        cache.heights = vec![3; 20];
        cache.rebuild_prefix_heights();
        let range = cache.visible_range(30, 6);
        assert!(range.start <= 10);
        assert!(range.end >= 12);
        assert!(range.end <= 20);
    }
}
