//! Wrapping helpers and dimensional constants for the InputBox.
//!
//! Wrapped lines are tracked as byte ranges into the buffer so the cursor,
//! the renderer and the height calculation all agree on one layout.

use std::ops::Range;

use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

/// Border (2) + padding (2) consumed horizontally by the bordered block
pub(super) const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders consumed vertically
pub(super) const VERTICAL_OVERHEAD: u16 = 2;
/// Maximum visible content lines before internal scrolling kicks in
pub(super) const MAX_VISIBLE_LINES: u16 = 5;
/// Offset from area edge to content (border + padding)
pub(super) const CONTENT_OFFSET: u16 = 2;

pub(super) fn wrap_options(inner_width: u16) -> textwrap::Options<'static> {
    textwrap::Options::new(inner_width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
}

/// Inner content width after border/padding overhead; 0 if too narrow.
pub(super) fn inner_width(content_width: u16) -> u16 {
    content_width.saturating_sub(HORIZONTAL_OVERHEAD)
}

/// Byte range of every wrapped line in `text`. Always at least one line;
/// a trailing newline yields a trailing empty line.
pub(super) fn line_spans(text: &str, width: u16) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for logical in text.split('\n') {
        if width == 0 || logical.is_empty() {
            spans.push(offset..offset + logical.len());
        } else {
            let mut from = 0;
            for segment in textwrap::wrap(logical, wrap_options(width)) {
                let start = logical[from..]
                    .find(segment.as_ref())
                    .map(|i| from + i)
                    .unwrap_or(from);
                let end = start + segment.len();
                spans.push(offset + start..offset + end);
                from = end;
            }
        }
        offset += logical.len() + 1;
    }
    spans
}

pub(super) fn wrap_line_count(text: &str, width: u16) -> u16 {
    (line_spans(text, width).len() as u16).max(1)
}

/// Index of the wrapped line holding byte offset `pos`.
pub(super) fn line_index(spans: &[Range<usize>], pos: usize) -> usize {
    spans
        .iter()
        .rposition(|r| r.start <= pos)
        .unwrap_or(0)
}

/// Byte offset within `line` whose display column is closest to `column`
/// without passing it.
pub(super) fn offset_at_column(line: &str, column: usize) -> usize {
    let mut width = 0;
    for (i, c) in line.char_indices() {
        let w = c.width().unwrap_or(0);
        if width + w > column {
            return i;
        }
        width += w;
    }
    line.len()
}

pub(super) fn display_width(s: &str) -> usize {
    s.width()
}

pub(super) fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

pub(super) fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(1)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}
