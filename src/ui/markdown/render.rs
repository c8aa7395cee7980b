use super::code::{class_name_for_codeblock_kind, classify_code_node, detab, CodeBlock, CodeClass};
use super::wrap::wrap_line;
use crate::core::sanitize::markdown_options;
use crate::ui::span::SpanKind;
use crate::ui::theme::Theme;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

const QUOTE_PREFIX: &str = "│ ";
const RULE_WIDTH: usize = 40;

/// Lines produced by the renderer with per-span metadata in parallel.
#[derive(Debug, Default)]
pub struct RenderedMarkdown {
    pub lines: Vec<Line<'static>>,
    pub span_metadata: Vec<Vec<SpanKind>>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderConfig {
    pub syntax_highlighting: bool,
    pub terminal_width: Option<usize>,
}

/// Language and code of every highlighted block, in document order.
///
/// Uses the same classification as the renderer so indices line up.
pub fn collect_code_blocks(content: &str) -> Vec<(String, String)> {
    let mut blocks = Vec::new();
    let mut pending: Option<(Option<String>, String)> = None;
    for event in Parser::new_ext(content, markdown_options()) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                pending = Some((class_name_for_codeblock_kind(&kind), String::new()));
            }
            Event::Text(text) => {
                if let Some((_, code)) = pending.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((class, code)) = pending.take() {
                    if let CodeClass::HighlightedBlock { language } =
                        classify_code_node(class.as_deref(), false)
                    {
                        blocks.push((language, code));
                    }
                }
            }
            _ => {}
        }
    }
    blocks
}

#[derive(Clone, Copy, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

struct PendingCode {
    class: Option<String>,
    text: String,
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<Vec<(Span<'static>, SpanKind)>>>,
    header_rows: usize,
    in_header: bool,
}

pub(super) struct MarkdownRenderer<'a> {
    content: &'a str,
    theme: &'a Theme,
    config: MarkdownRenderConfig,
    blocks: &'a [CodeBlock],
    lines: Vec<Line<'static>>,
    span_metadata: Vec<Vec<SpanKind>>,
    current_spans: Vec<Span<'static>>,
    current_span_kinds: Vec<SpanKind>,
    style_stack: Vec<Style>,
    kind_stack: Vec<SpanKind>,
    list_stack: Vec<ListKind>,
    // Marker widths of the list items currently open
    item_indent_stack: Vec<usize>,
    pending_marker: Option<String>,
    quote_depth: usize,
    // (href, visible text) for links being rendered
    link_stack: Vec<(String, String)>,
    pending_code: Option<PendingCode>,
    code_block_count: usize,
    table: Option<TableState>,
}

impl<'a> MarkdownRenderer<'a> {
    pub(super) fn new(
        content: &'a str,
        theme: &'a Theme,
        config: MarkdownRenderConfig,
        blocks: &'a [CodeBlock],
    ) -> Self {
        Self {
            content,
            theme,
            config,
            blocks,
            lines: Vec::new(),
            span_metadata: Vec::new(),
            current_spans: Vec::new(),
            current_span_kinds: Vec::new(),
            style_stack: vec![theme.text_style],
            kind_stack: vec![SpanKind::Text],
            list_stack: Vec::new(),
            item_indent_stack: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
            link_stack: Vec::new(),
            pending_code: None,
            code_block_count: 0,
            table: None,
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack
            .last()
            .copied()
            .unwrap_or(self.theme.text_style)
    }

    fn current_kind(&self) -> SpanKind {
        self.kind_stack.last().cloned().unwrap_or(SpanKind::Text)
    }

    fn push_style(&mut self, modifier: Modifier) {
        let style = self.current_style().add_modifier(modifier);
        self.style_stack.push(style);
        let kind = self.current_kind();
        self.kind_stack.push(kind);
    }

    fn pop_style(&mut self) {
        self.style_stack.pop();
        self.kind_stack.pop();
    }

    /// Quote bars and list indentation for a fresh line. A pending item
    /// marker is emitted once, on the item's first line.
    fn line_prefix(&mut self) -> Vec<(Span<'static>, SpanKind)> {
        let mut prefix = Vec::new();
        if self.quote_depth > 0 {
            prefix.push((
                Span::styled(QUOTE_PREFIX.repeat(self.quote_depth), self.theme.muted_style),
                SpanKind::Text,
            ));
        }
        let total: usize = self.item_indent_stack.iter().sum();
        match self.pending_marker.take() {
            Some(marker) => {
                let indent = total.saturating_sub(marker.width());
                if indent > 0 {
                    prefix.push((Span::raw(" ".repeat(indent)), SpanKind::Text));
                }
                prefix.push((
                    Span::styled(marker, self.theme.list_marker_style),
                    SpanKind::Text,
                ));
            }
            None if total > 0 => {
                prefix.push((Span::raw(" ".repeat(total)), SpanKind::Text));
            }
            None => {}
        }
        prefix
    }

    fn push_span(&mut self, span: Span<'static>, kind: SpanKind) {
        if let Some(table) = self.table.as_mut() {
            if let Some(cell) = table.rows.last_mut().and_then(|row| row.last_mut()) {
                cell.push((span, kind));
            }
            return;
        }
        if self.current_spans.is_empty() {
            for (prefix, prefix_kind) in self.line_prefix() {
                self.current_spans.push(prefix);
                self.current_span_kinds.push(prefix_kind);
            }
        }
        self.current_spans.push(span);
        self.current_span_kinds.push(kind);
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, visible)) = self.link_stack.last_mut() {
            visible.push_str(text);
        }
        let span = Span::styled(detab(text), self.current_style());
        let kind = self.current_kind();
        self.push_span(span, kind);
    }

    fn flush_current_spans(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current_spans);
        let kinds = std::mem::take(&mut self.current_span_kinds);
        self.lines.push(Line::from(spans));
        self.span_metadata.push(kinds);
    }

    fn push_empty_line(&mut self) {
        self.flush_current_spans();
        if self.lines.last().is_none_or(|l| l.spans.is_empty()) {
            return;
        }
        self.lines.push(Line::default());
        self.span_metadata.push(Vec::new());
    }

    fn push_line_direct(&mut self, line: Line<'static>, kinds: Vec<SpanKind>) {
        self.flush_current_spans();
        let mut spans = Vec::with_capacity(line.spans.len() + 2);
        let mut all_kinds = Vec::with_capacity(kinds.len() + 2);
        for (prefix, prefix_kind) in self.line_prefix() {
            spans.push(prefix);
            all_kinds.push(prefix_kind);
        }
        spans.extend(line.spans);
        all_kinds.extend(kinds);
        self.lines.push(Line::from(spans));
        self.span_metadata.push(all_kinds);
    }

    fn finalize_code_block(&mut self) {
        let Some(pending) = self.pending_code.take() else {
            return;
        };
        match classify_code_node(pending.class.as_deref(), false) {
            CodeClass::HighlightedBlock { language } => {
                let index = self.code_block_count;
                self.code_block_count += 1;
                let rendered = match self.blocks.get(index) {
                    Some(block) => block.render(self.theme, self.config.syntax_highlighting),
                    None => CodeBlock::new(index, language, &pending.text)
                        .render(self.theme, self.config.syntax_highlighting),
                };
                for (line, kinds) in rendered {
                    self.push_line_direct(line, kinds);
                }
            }
            CodeClass::Inline => {
                let style = self.theme.inline_code_style;
                for line in pending.text.lines() {
                    self.push_line_direct(
                        Line::from(Span::styled(detab(line), style)),
                        vec![SpanKind::Text],
                    );
                }
            }
        }
        self.push_empty_line();
    }

    fn finalize_table(&mut self) {
        let Some(table) = self.table.take() else {
            return;
        };
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &table.rows {
            for (col, cell) in row.iter().enumerate() {
                let w: usize = cell.iter().map(|(s, _)| s.width()).sum();
                widths[col] = widths[col].max(w);
            }
        }

        let separator = Span::styled(" │ ", self.theme.muted_style);
        for (row_idx, row) in table.rows.into_iter().enumerate() {
            let mut spans = Vec::new();
            let mut kinds = Vec::new();
            for (col, width) in widths.iter().enumerate() {
                if col > 0 {
                    spans.push(separator.clone());
                    kinds.push(SpanKind::Text);
                }
                let cell = row.get(col).cloned().unwrap_or_default();
                let used: usize = cell.iter().map(|(s, _)| s.width()).sum();
                for (span, kind) in cell {
                    let span = if row_idx < table.header_rows {
                        let style = span.style.add_modifier(Modifier::BOLD);
                        span.style(style)
                    } else {
                        span
                    };
                    spans.push(span);
                    kinds.push(kind);
                }
                if used < *width {
                    spans.push(Span::raw(" ".repeat(width - used)));
                    kinds.push(SpanKind::Text);
                }
            }
            self.push_line_direct(Line::from(spans), kinds);

            if row_idx + 1 == table.header_rows {
                let rule = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                self.push_line_direct(
                    Line::from(Span::styled(rule, self.theme.muted_style)),
                    vec![SpanKind::Text],
                );
            }
        }
        self.push_empty_line();
    }

    pub(super) fn render(mut self) -> RenderedMarkdown {
        let parser = Parser::new_ext(self.content, markdown_options());

        for event in parser {
            match event {
                Event::Start(tag) => match tag {
                    Tag::Paragraph => {}
                    Tag::Heading { level, .. } => {
                        self.flush_current_spans();
                        self.style_stack.push(self.theme.md_heading_style(level as u8));
                        let kind = self.current_kind();
                        self.kind_stack.push(kind);
                    }
                    Tag::BlockQuote(_) => {
                        self.flush_current_spans();
                        self.quote_depth += 1;
                        let style = self.theme.blockquote_style;
                        self.style_stack.push(style);
                        let kind = self.current_kind();
                        self.kind_stack.push(kind);
                    }
                    Tag::List(start) => {
                        self.flush_current_spans();
                        self.list_stack.push(match start {
                            Some(n) => ListKind::Ordered(n),
                            None => ListKind::Unordered,
                        });
                    }
                    Tag::Item => {
                        self.flush_current_spans();
                        let marker = match self.list_stack.last_mut() {
                            Some(ListKind::Ordered(n)) => {
                                let marker = format!("{n}. ");
                                *n += 1;
                                marker
                            }
                            _ => "- ".to_string(),
                        };
                        self.item_indent_stack.push(marker.width());
                        self.pending_marker = Some(marker);
                    }
                    Tag::CodeBlock(kind) => {
                        self.flush_current_spans();
                        self.pending_code = Some(PendingCode {
                            class: class_name_for_codeblock_kind(&kind),
                            text: String::new(),
                        });
                    }
                    Tag::Emphasis => self.push_style(Modifier::ITALIC),
                    Tag::Strong => self.push_style(Modifier::BOLD),
                    Tag::Strikethrough => self.push_style(Modifier::CROSSED_OUT),
                    Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                        self.style_stack.push(self.theme.link_style);
                        self.kind_stack.push(SpanKind::link(dest_url.as_ref()));
                        self.link_stack.push((dest_url.to_string(), String::new()));
                    }
                    Tag::Table(_) => {
                        self.flush_current_spans();
                        self.table = Some(TableState::default());
                    }
                    Tag::TableHead => {
                        if let Some(table) = self.table.as_mut() {
                            table.in_header = true;
                            table.rows.push(Vec::new());
                        }
                    }
                    Tag::TableRow => {
                        if let Some(table) = self.table.as_mut() {
                            table.rows.push(Vec::new());
                        }
                    }
                    Tag::TableCell => {
                        if let Some(row) = self.table.as_mut().and_then(|t| t.rows.last_mut()) {
                            row.push(Vec::new());
                        }
                    }
                    _ => {}
                },
                Event::End(tag_end) => match tag_end {
                    TagEnd::Paragraph => {
                        self.flush_current_spans();
                        if self.list_stack.is_empty() {
                            self.push_empty_line();
                        }
                    }
                    TagEnd::Heading(_) => {
                        self.flush_current_spans();
                        self.push_empty_line();
                        self.pop_style();
                    }
                    TagEnd::BlockQuote(_) => {
                        self.flush_current_spans();
                        self.quote_depth = self.quote_depth.saturating_sub(1);
                        self.pop_style();
                    }
                    TagEnd::List(_) => {
                        self.flush_current_spans();
                        self.list_stack.pop();
                        if self.list_stack.is_empty() {
                            self.push_empty_line();
                        }
                    }
                    TagEnd::Item => {
                        self.flush_current_spans();
                        self.item_indent_stack.pop();
                        self.pending_marker = None;
                    }
                    TagEnd::CodeBlock => self.finalize_code_block(),
                    TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                        self.pop_style();
                    }
                    TagEnd::Link | TagEnd::Image => {
                        self.pop_style();
                        if let Some((href, visible)) = self.link_stack.pop() {
                            if !href.is_empty() && visible != href {
                                let span =
                                    Span::styled(format!(" <{href}>"), self.theme.muted_style);
                                self.push_span(span, SpanKind::link(href));
                            }
                        }
                    }
                    TagEnd::Table => self.finalize_table(),
                    TagEnd::TableHead => {
                        if let Some(table) = self.table.as_mut() {
                            table.in_header = false;
                            table.header_rows = table.rows.len();
                        }
                    }
                    _ => {}
                },
                Event::Text(text) => {
                    if let Some(code) = self.pending_code.as_mut() {
                        code.text.push_str(&text);
                    } else {
                        self.push_text(&text);
                    }
                }
                Event::Code(code) => {
                    // Inline code spans never become highlighted blocks
                    let span = Span::styled(detab(&code), self.theme.inline_code_style);
                    let kind = self.current_kind();
                    self.push_span(span, kind);
                }
                Event::InlineMath(math) | Event::DisplayMath(math) => {
                    let span = Span::styled(detab(&math), self.theme.inline_code_style);
                    let kind = self.current_kind();
                    self.push_span(span, kind);
                }
                Event::Html(html) | Event::InlineHtml(html) => {
                    for (i, part) in html.split('\n').enumerate() {
                        if i > 0 {
                            self.flush_current_spans();
                        }
                        if !part.is_empty() {
                            self.push_text(part);
                        }
                    }
                }
                Event::FootnoteReference(label) => {
                    let span = Span::styled(format!("[^{label}]"), self.theme.muted_style);
                    self.push_span(span, SpanKind::Text);
                }
                // Chat messages keep their source line breaks
                Event::SoftBreak | Event::HardBreak => self.flush_current_spans(),
                Event::Rule => {
                    self.flush_current_spans();
                    let width = self
                        .config
                        .terminal_width
                        .map_or(RULE_WIDTH, |w| w.min(RULE_WIDTH));
                    self.push_line_direct(
                        Line::from(Span::styled("─".repeat(width), self.theme.muted_style)),
                        vec![SpanKind::Text],
                    );
                    self.push_empty_line();
                }
                Event::TaskListMarker(checked) => {
                    let marker = if checked { "[x] " } else { "[ ] " };
                    let span = Span::styled(marker, self.theme.list_marker_style);
                    self.push_span(span, SpanKind::Text);
                }
            }
        }

        self.flush_current_spans();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
            self.span_metadata.pop();
        }

        let (lines, span_metadata): (Vec<Line<'static>>, Vec<Vec<SpanKind>>) =
            match self.config.terminal_width {
                Some(width) => self
                    .lines
                    .into_iter()
                    .zip(self.span_metadata)
                    .flat_map(|(line, kinds)| wrap_line(line, kinds, width))
                    .unzip(),
                None => (self.lines, self.span_metadata),
            };

        RenderedMarkdown {
            lines,
            span_metadata,
        }
    }
}
