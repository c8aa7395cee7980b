use crate::ui::span::SpanKind;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Wrap a rendered line to `max_width` columns, preserving styles and span
/// kinds. Breaks after whitespace where possible; a token wider than the
/// line is broken between characters, the way code wraps with
/// `break-all`.
pub(super) fn wrap_line(
    line: Line<'static>,
    kinds: Vec<SpanKind>,
    max_width: usize,
) -> Vec<(Line<'static>, Vec<SpanKind>)> {
    let max_width = max_width.max(1);
    if line.width() <= max_width {
        return vec![(line, kinds)];
    }

    // Flatten to styled characters so breaks can fall anywhere
    let mut cells: Vec<(char, usize, usize)> = Vec::new();
    for (span_idx, span) in line.spans.iter().enumerate() {
        for ch in span.content.chars() {
            cells.push((ch, span_idx, ch.width().unwrap_or(0)));
        }
    }

    let mut rows: Vec<std::ops::Range<usize>> = Vec::new();
    let mut start = 0usize;
    while start < cells.len() {
        let mut width = 0usize;
        let mut end = start;
        let mut last_break: Option<usize> = None;
        while end < cells.len() && width + cells[end].2 <= max_width {
            width += cells[end].2;
            if cells[end].0.is_whitespace() {
                last_break = Some(end + 1);
            }
            end += 1;
        }
        if end == start {
            // A single character wider than the line still gets a row
            end = start + 1;
        } else if end < cells.len() {
            if let Some(brk) = last_break.filter(|b| *b > start) {
                end = brk;
            }
        }
        rows.push(start..end);
        start = end;
    }

    rows.into_iter()
        .map(|range| {
            let mut spans: Vec<Span<'static>> = Vec::new();
            let mut row_kinds: Vec<SpanKind> = Vec::new();
            let mut current: Option<(usize, String)> = None;
            for &(ch, span_idx, _) in &cells[range] {
                match current.as_mut() {
                    Some((idx, text)) if *idx == span_idx => text.push(ch),
                    _ => {
                        if let Some((idx, text)) = current.take() {
                            spans.push(Span::styled(text, line.spans[idx].style));
                            row_kinds.push(kinds.get(idx).cloned().unwrap_or(SpanKind::Text));
                        }
                        current = Some((span_idx, ch.to_string()));
                    }
                }
            }
            if let Some((idx, text)) = current {
                spans.push(Span::styled(text, line.spans[idx].style));
                row_kinds.push(kinds.get(idx).cloned().unwrap_or(SpanKind::Text));
            }
            (Line::from(spans).style(line.style), row_kinds)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Style};

    fn texts(rows: &[(Line<'static>, Vec<SpanKind>)]) -> Vec<String> {
        rows.iter().map(|(line, _)| line.to_string()).collect()
    }

    #[test]
    fn short_line_is_untouched() {
        let rows = wrap_line(Line::from("hello"), vec![SpanKind::Text], 10);
        assert_eq!(texts(&rows), vec!["hello"]);
    }

    #[test]
    fn breaks_after_whitespace() {
        let rows = wrap_line(Line::from("alpha beta gamma"), vec![SpanKind::Text], 11);
        assert_eq!(texts(&rows), vec!["alpha beta ", "gamma"]);
    }

    #[test]
    fn long_tokens_break_anywhere() {
        let rows = wrap_line(Line::from("abcdefghij"), vec![SpanKind::Text], 4);
        assert_eq!(texts(&rows), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn styles_and_kinds_follow_their_characters() {
        let red = Style::default().fg(Color::Red);
        let line = Line::from(vec![Span::raw("ab "), Span::styled("cdef", red)]);
        let kinds = vec![SpanKind::Text, SpanKind::link("https://x")];
        let rows = wrap_line(line, kinds, 5);
        assert_eq!(texts(&rows), vec!["ab ", "cdef"]);
        assert_eq!(rows[1].0.spans[0].style, red);
        assert!(rows[1].1[0].link_meta().is_some());
        for (line, kinds) in &rows {
            assert_eq!(line.spans.len(), kinds.len());
        }
    }
}
