//! Markdown → ratatui `Text`.
//!
//! Walks `pulldown_cmark` events and emits styled `Line`s. Supports
//! headings, emphasis, inline code, fenced code (syntect), lists, block
//! quotes, links, rules, and pipe tables. Column widths are measured in
//! terminal cells so CJK content lines up.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use unicode_width::UnicodeWidthStr;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const MUTED: Color = Color::DarkGray;

/// Render markdown into owned, styled text. `base` is applied to plain text.
pub fn to_text(content: &str, base: Style) -> Text<'static> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);

    let mut r = Renderer::new(base);
    for event in Parser::new_ext(content, opts) {
        r.handle(event);
    }
    r.text
}

/// Cells of a table being collected; flushed as aligned lines on `TagEnd::Table`.
#[derive(Default)]
struct TableBuf {
    rows: Vec<Vec<String>>,
    header_rows: usize,
    in_head: bool,
}

struct Renderer {
    text: Text<'static>,
    base: Style,
    /// Inline style stack; entries are already patched onto their parent.
    styles: Vec<Style>,
    /// Per-line prefixes (quote and code gutters).
    gutters: Vec<Span<'static>>,
    /// None = bullet list, Some(n) = ordered list at n.
    lists: Vec<Option<u64>>,
    highlighter: Option<HighlightLines<'static>>,
    in_code: bool,
    link: Option<String>,
    table: Option<TableBuf>,
    pending_gap: bool,
}

impl Renderer {
    fn new(base: Style) -> Self {
        Self {
            text: Text::default(),
            base,
            styles: vec![],
            gutters: vec![],
            lists: vec![],
            highlighter: None,
            in_code: false,
            link: None,
            table: None,
            pending_gap: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, overlay: Style) {
        self.styles.push(self.style().patch(overlay));
    }

    fn new_line(&mut self, line: Line<'static>) {
        let mut line = line;
        for g in self.gutters.iter().rev().cloned() {
            line.spans.insert(0, g);
        }
        self.text.lines.push(line);
    }

    fn append(&mut self, span: Span<'static>) {
        match self.text.lines.last_mut() {
            Some(line) => line.push_span(span),
            None => self.new_line(Line::from(span)),
        }
    }

    fn gap(&mut self) {
        if self.pending_gap {
            self.new_line(Line::default());
            self.pending_gap = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.on_text(t),
            Event::Code(c) => self.on_inline_code(c),
            Event::SoftBreak => self.on_inline(" ".into()),
            Event::HardBreak => self.new_line(Line::default()),
            Event::Rule => {
                self.gap();
                self.new_line(Line::from(Span::styled("─".repeat(24), Style::default().fg(MUTED))));
                self.pending_gap = true;
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.table.is_none() {
                    self.gap();
                    self.new_line(Line::default());
                }
            }
            Tag::Heading { level, .. } => {
                self.gap();
                let style = heading_style(self.base, level);
                self.new_line(Line::default());
                self.push_style(style);
            }
            Tag::BlockQuote(_) => {
                self.gap();
                self.gutters.push(Span::styled("│ ", Style::default().fg(MUTED)));
                self.push_style(Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM));
            }
            Tag::CodeBlock(kind) => {
                self.gap();
                let lang = match &kind {
                    CodeBlockKind::Fenced(l) => l.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                let border = Style::default().fg(MUTED);
                let top = if lang.is_empty() {
                    Line::from(Span::styled("╭──", border))
                } else {
                    Line::from(vec![
                        Span::styled("╭── ", border),
                        Span::styled(lang.clone(), border.add_modifier(Modifier::BOLD)),
                    ])
                };
                self.new_line(top);
                self.gutters.push(Span::styled("│ ", border));
                self.highlighter = SYNTAX_SET
                    .find_syntax_by_token(&lang)
                    .filter(|_| !lang.is_empty())
                    .map(|syn| HighlightLines::new(syn, &THEME_SET.themes["base16-ocean.dark"]));
                self.in_code = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.gap();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.new_line(Line::default());
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{indent}{n}. ");
                        *n += 1;
                        m
                    }
                    _ => format!("{indent}• "),
                };
                self.append(Span::styled(marker, Style::default().fg(MUTED)));
            }
            Tag::Table(_) => {
                self.gap();
                self.table = Some(TableBuf::default());
            }
            Tag::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.in_head = true;
                    t.rows.push(Vec::new());
                }
            }
            Tag::TableRow => {
                if let Some(t) = self.table.as_mut() {
                    t.rows.push(Vec::new());
                }
            }
            Tag::TableCell => {
                if let Some(row) = self.table.as_mut().and_then(|t| t.rows.last_mut()) {
                    row.push(String::new());
                }
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED));
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.pending_gap = true,
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.pending_gap = true;
            }
            TagEnd::BlockQuote(_) => {
                self.gutters.pop();
                self.styles.pop();
                self.pending_gap = true;
            }
            TagEnd::CodeBlock => {
                self.highlighter = None;
                self.in_code = false;
                self.gutters.pop();
                self.new_line(Line::from(Span::styled("╰──", Style::default().fg(MUTED))));
                self.pending_gap = true;
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.pending_gap = true;
                }
            }
            TagEnd::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.in_head = false;
                    t.header_rows = t.rows.len();
                }
            }
            TagEnd::Table => {
                if let Some(t) = self.table.take() {
                    self.flush_table(t);
                }
                self.pending_gap = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link.take() {
                    self.append(Span::styled(format!(" <{url}>"), Style::default().fg(MUTED)));
                }
            }
            _ => {}
        }
    }

    fn on_text(&mut self, cow: CowStr<'_>) {
        // ratatui renders \t as zero-width
        let text = cow.replace('\t', "    ");

        if let Some(mut hl) = self.highlighter.take() {
            for line in LinesWithEndings::from(&text) {
                let spans: Vec<Span<'static>> = hl
                    .highlight_line(line, &SYNTAX_SET)
                    .map(|ranges| {
                        ranges
                            .into_iter()
                            .filter_map(|(s, frag)| {
                                let frag = frag.trim_end_matches('\n');
                                (!frag.is_empty()).then(|| {
                                    let fg = Color::Rgb(s.foreground.r, s.foreground.g, s.foreground.b);
                                    Span::styled(frag.to_owned(), Style::default().fg(fg))
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                self.new_line(Line::from(spans));
            }
            self.highlighter = Some(hl);
            return;
        }

        if self.in_code {
            let style = Style::default().fg(Color::White);
            for line in text.lines() {
                self.new_line(Line::from(Span::styled(line.to_owned(), style)));
            }
            return;
        }

        self.on_inline(text);
    }

    fn on_inline(&mut self, text: String) {
        if let Some(cell) = self
            .table
            .as_mut()
            .and_then(|t| t.rows.last_mut())
            .and_then(|row| row.last_mut())
        {
            cell.push_str(&text);
            return;
        }
        let style = self.style();
        self.append(Span::styled(text, style));
    }

    fn on_inline_code(&mut self, cow: CowStr<'_>) {
        if self.table.is_some() {
            self.on_inline(cow.to_string());
            return;
        }
        self.append(Span::styled(
            cow.to_string(),
            Style::default().fg(Color::White).bg(Color::DarkGray),
        ));
    }

    fn flush_table(&mut self, table: TableBuf) {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let sep = Span::styled(" │ ", Style::default().fg(MUTED));
        for (r, row) in table.rows.iter().enumerate() {
            let style = if r < table.header_rows {
                self.base.add_modifier(Modifier::BOLD)
            } else {
                self.base
            };
            let mut spans = Vec::new();
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    spans.push(sep.clone());
                }
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                spans.push(Span::styled(pad_to(cell, *width), style));
            }
            self.new_line(Line::from(spans));

            if r + 1 == table.header_rows {
                let rule = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                self.new_line(Line::from(Span::styled(rule, Style::default().fg(MUTED))));
            }
        }
    }
}

/// Right-pads `s` with spaces to `width` terminal cells.
fn pad_to(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(s.width());
    format!("{s}{}", " ".repeat(pad))
}

fn heading_style(base: Style, level: HeadingLevel) -> Style {
    match level {
        HeadingLevel::H1 => base.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        HeadingLevel::H2 => base.add_modifier(Modifier::BOLD),
        _ => base.add_modifier(Modifier::BOLD | Modifier::ITALIC),
    }
}
