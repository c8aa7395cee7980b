use super::copy::{CopyOutcome, CopyState};
use crate::ui::event::UiEvent;
use crate::ui::span::SpanKind;
use crate::ui::theme::Theme;
use crate::utils::clipboard::{Clipboard, ClipboardError};
use pulldown_cmark::CodeBlockKind;
use ratatui::text::{Line, Span};
use tokio::sync::mpsc;

const LANGUAGE_CLASS_PREFIX: &str = "language-";
const COPY_LABEL: &str = "⧉ copy";
const COPIED_LABEL: &str = "✓ copied";

/// How a code node is presented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeClass {
    Inline,
    HighlightedBlock { language: String },
}

/// First `language-<token>` annotation in a class list, token being
/// `[A-Za-z0-9_]+`. A bare `language-` is skipped.
pub fn language_from_class_name(class_name: &str) -> Option<&str> {
    class_name
        .match_indices(LANGUAGE_CLASS_PREFIX)
        .find_map(|(start, prefix)| {
            let rest = &class_name[start + prefix.len()..];
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            (len > 0).then(|| &rest[..len])
        })
}

/// A node becomes a highlighted block only when it is not inline and its
/// annotation names a language.
pub fn classify_code_node(class_name: Option<&str>, inline: bool) -> CodeClass {
    if inline {
        return CodeClass::Inline;
    }
    match class_name.and_then(language_from_class_name) {
        Some(language) => CodeClass::HighlightedBlock {
            language: language.to_string(),
        },
        None => CodeClass::Inline,
    }
}

/// Class annotation pulldown-cmark's block kind maps to: fenced blocks
/// with an info string get `language-<first word>`.
pub fn class_name_for_codeblock_kind(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Indented => None,
        CodeBlockKind::Fenced(info) => info
            .split_ascii_whitespace()
            .next()
            .map(|word| format!("{LANGUAGE_CLASS_PREFIX}{word}")),
    }
}

/// Strip exactly one trailing `'\n'`, if present.
pub fn trim_trailing_newline(code: &str) -> &str {
    code.strip_suffix('\n').unwrap_or(code)
}

/// A highlighted code block with its copy affordance.
#[derive(Debug)]
pub struct CodeBlock {
    index: usize,
    language: String,
    code: String,
    copy: CopyState,
}

impl CodeBlock {
    /// `code` is stored with one trailing newline removed.
    pub fn new(index: usize, language: impl Into<String>, code: &str) -> Self {
        Self {
            index,
            language: language.into(),
            code: trim_trailing_newline(code).to_string(),
            copy: CopyState::new(),
        }
    }

    pub(crate) fn with_notifier(mut self, notifier: Option<mpsc::UnboundedSender<UiEvent>>) -> Self {
        if let Some(notifier) = notifier {
            self.copy = self.copy.with_notifier(notifier);
        }
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Text shown and copied.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_copied(&self) -> bool {
        self.copy.is_copied()
    }

    pub fn has_pending_reset(&self) -> bool {
        self.copy.has_pending_reset()
    }

    /// Copy the block's text to `clipboard`. Never fails loudly: a denied
    /// write is logged and reported as [`CopyOutcome::Failed`].
    pub async fn copy(&mut self, clipboard: &dyn Clipboard) -> CopyOutcome {
        let code = self.code.clone();
        self.copy.copy(clipboard, &code).await
    }

    /// Apply the outcome of a clipboard write performed off-loop.
    pub fn finish_copy(&mut self, result: Result<(), ClipboardError>) -> CopyOutcome {
        self.copy.apply(result)
    }

    fn header_line(&self, theme: &Theme) -> Line<'static> {
        let indicator = if self.copy.is_copied() {
            Span::styled(format!(" {COPIED_LABEL} "), theme.copied_style)
        } else {
            Span::styled(
                format!(" [{}] {COPY_LABEL} ", self.index + 1),
                theme.copy_hint_style,
            )
        };
        Line::from(vec![
            Span::styled(format!(" {} ", self.language), theme.codeblock_header_style),
            indicator,
        ])
    }

    /// Header row followed by the code lines, each tagged with this
    /// block's [`SpanKind::CodeBlock`].
    pub fn render(&self, theme: &Theme, syntax_enabled: bool) -> Vec<(Line<'static>, Vec<SpanKind>)> {
        let kind = SpanKind::code_block(Some(self.language.as_str()), self.index);
        let highlighted = if syntax_enabled {
            crate::utils::syntax::highlight_code_block(&self.language, &self.code, theme)
        } else {
            None
        };
        let body = highlighted.unwrap_or_else(|| plain_code_lines(&self.code, theme));

        std::iter::once(self.header_line(theme))
            .chain(body)
            .map(|line| {
                let kinds = vec![kind.clone(); line.spans.len()];
                (line, kinds)
            })
            .collect()
    }
}

fn plain_code_lines(code: &str, theme: &Theme) -> Vec<Line<'static>> {
    let style = theme.md_codeblock_style();
    code.lines()
        .map(|line| Line::from(Span::styled(detab(line), style)))
        .collect()
}

pub(super) fn detab(s: &str) -> String {
    s.replace('\t', "    ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pulldown_cmark::CowStr;

    struct DenyingClipboard;

    #[async_trait]
    impl Clipboard for DenyingClipboard {
        async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable("denied".to_string()))
        }
    }

    #[test]
    fn language_token_is_word_characters_only() {
        assert_eq!(language_from_class_name("language-python"), Some("python"));
        assert_eq!(language_from_class_name("language-c++"), Some("c"));
        assert_eq!(language_from_class_name("foo language-rust bar"), Some("rust"));
        assert_eq!(language_from_class_name("language- language-go"), Some("go"));
        assert_eq!(language_from_class_name("lang-python"), None);
        assert_eq!(language_from_class_name(""), None);
    }

    #[test]
    fn classification_requires_block_and_language() {
        assert_eq!(
            classify_code_node(Some("language-python"), false),
            CodeClass::HighlightedBlock {
                language: "python".to_string()
            }
        );
        assert_eq!(classify_code_node(Some("language-python"), true), CodeClass::Inline);
        assert_eq!(classify_code_node(None, false), CodeClass::Inline);
        assert_eq!(classify_code_node(Some("plain"), false), CodeClass::Inline);
    }

    #[test]
    fn fenced_info_maps_to_language_class() {
        let fenced = CodeBlockKind::Fenced(CowStr::from("python title=x.py"));
        assert_eq!(
            class_name_for_codeblock_kind(&fenced).as_deref(),
            Some("language-python")
        );
        assert_eq!(
            class_name_for_codeblock_kind(&CodeBlockKind::Fenced(CowStr::from(""))),
            None
        );
        assert_eq!(class_name_for_codeblock_kind(&CodeBlockKind::Indented), None);
    }

    #[test]
    fn exactly_one_trailing_newline_is_trimmed() {
        assert_eq!(trim_trailing_newline("x = 1\n"), "x = 1");
        assert_eq!(trim_trailing_newline("x = 1\n\n"), "x = 1\n");
        assert_eq!(trim_trailing_newline("x = 1"), "x = 1");
        assert_eq!(trim_trailing_newline(""), "");
    }

    #[test]
    fn render_emits_header_then_code() {
        let block = CodeBlock::new(0, "python", "print('a')\nprint('b')\n");
        let rendered = block.render(&Theme::dark_default(), false);
        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[0].0.to_string(), " python  [1] ⧉ copy ");
        assert_eq!(rendered[1].0.to_string(), "print('a')");
        assert_eq!(rendered[2].0.to_string(), "print('b')");
        for (line, kinds) in &rendered {
            assert_eq!(line.spans.len(), kinds.len());
            assert!(kinds
                .iter()
                .all(|k| k.code_block_meta().map(|m| m.block_index()) == Some(0)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn header_shows_copied_after_success() {
        let mut block = CodeBlock::new(2, "rust", "fn main() {}\n");
        assert_eq!(block.finish_copy(Ok(())), CopyOutcome::Copied);
        let header = block.render(&Theme::light(), false)[0].0.to_string();
        assert_eq!(header, " rust  ✓ copied ");
    }

    #[tokio::test(start_paused = true)]
    async fn denied_copy_is_reported_not_raised() {
        let mut block = CodeBlock::new(0, "python", "x\n");
        assert_eq!(block.copy(&DenyingClipboard).await, CopyOutcome::Failed);
        assert!(!block.is_copied());
        assert!(!block.has_pending_reset());
    }
}
