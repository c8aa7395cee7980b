use super::code::CodeBlock;
use super::copy::CopyOutcome;
use super::render::{collect_code_blocks, MarkdownRenderConfig, MarkdownRenderer, RenderedMarkdown};
use crate::core::config::Config;
use crate::core::constants::{COLLAPSED_HEIGHT, TRUNCATION_INDICATOR};
use crate::core::content::{Content, ContentSizer};
use crate::core::display::DisplayState;
use crate::core::sanitize::{ContentProcessor, HtmlCodeFence};
use crate::ui::event::UiEvent;
use crate::ui::span::SpanKind;
use crate::ui::theme::Theme;
use crate::utils::clipboard::{Clipboard, ClipboardError};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use tokio::sync::mpsc;
use tracing::debug;

/// Presentation settings for a [`MarkdownContent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSettings {
    pub sizer: ContentSizer,
    /// Rows kept while collapsed.
    pub collapsed_height: usize,
    pub syntax_highlighting: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            sizer: ContentSizer::default(),
            collapsed_height: COLLAPSED_HEIGHT,
            syntax_highlighting: true,
        }
    }
}

impl ViewSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            sizer: ContentSizer::with_thresholds(
                config
                    .line_threshold
                    .unwrap_or(defaults.sizer.line_threshold()),
                config
                    .char_threshold
                    .unwrap_or(defaults.sizer.char_threshold()),
            ),
            collapsed_height: config
                .collapsed_height
                .unwrap_or(defaults.collapsed_height)
                .max(1),
            syntax_highlighting: config.syntax.unwrap_or(defaults.syntax_highlighting),
        }
    }
}

/// Output of [`MarkdownContent::render`].
#[derive(Debug, Default)]
pub struct RenderedContent {
    pub lines: Vec<Line<'static>>,
    pub span_metadata: Vec<Vec<SpanKind>>,
    /// True when rows were cut off by the collapsed view.
    pub clipped: bool,
}

/// One chat message: processed content, collapse state, and the code
/// blocks it contains. All state is private to the instance and dropped
/// with it, pending copy-indicator resets included.
pub struct MarkdownContent {
    content: Content,
    display: DisplayState,
    blocks: Vec<CodeBlock>,
    settings: ViewSettings,
    style: Option<Style>,
    processor: Box<dyn ContentProcessor>,
    notifier: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl MarkdownContent {
    pub fn new(raw: &str, settings: ViewSettings) -> Self {
        Self::with_processor(raw, settings, Box::new(HtmlCodeFence))
    }

    pub fn with_processor(
        raw: &str,
        settings: ViewSettings,
        processor: Box<dyn ContentProcessor>,
    ) -> Self {
        let content = Content::process(raw, processor.as_ref(), &settings.sizer);
        let display = DisplayState::new(content.size());
        let mut view = Self {
            content,
            display,
            blocks: Vec::new(),
            settings,
            style: None,
            processor,
            notifier: None,
        };
        view.rebuild_blocks();
        view
    }

    /// Base style applied beneath every rendered span.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Request redraws on `notifier` when a copy indicator resets.
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<UiEvent>) -> Self {
        self.notifier = Some(notifier);
        self.blocks.clear();
        self.rebuild_blocks();
        self
    }

    /// Replace the raw content, re-deriving the processed text, size and
    /// code blocks. Unchanged input is a no-op. Blocks whose language and
    /// code are unchanged keep their copy state.
    pub fn set_content(&mut self, raw: &str) {
        if raw == self.content.raw() {
            return;
        }
        self.content = Content::process(raw, self.processor.as_ref(), &self.settings.sizer);
        self.display.update_size(self.content.size());
        self.rebuild_blocks();
    }

    fn rebuild_blocks(&mut self) {
        let mut previous = std::mem::take(&mut self.blocks).into_iter();
        let found = collect_code_blocks(self.content.processed());
        debug!(count = found.len(), "collected code blocks");
        self.blocks = found
            .into_iter()
            .enumerate()
            .map(|(index, (language, code))| {
                let fresh = CodeBlock::new(index, language, &code);
                match previous.next() {
                    Some(old)
                        if old.language() == fresh.language() && old.code() == fresh.code() =>
                    {
                        old
                    }
                    _ => fresh.with_notifier(self.notifier.clone()),
                }
            })
            .collect();
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn toggle(&mut self) {
        self.display.toggle();
    }

    pub fn code_blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Copy block `index`. `None` when there is no such block.
    pub async fn copy_block(
        &mut self,
        index: usize,
        clipboard: &dyn Clipboard,
    ) -> Option<CopyOutcome> {
        let block = self.blocks.get_mut(index)?;
        Some(block.copy(clipboard).await)
    }

    /// Apply a clipboard write for block `index` that ran elsewhere. See
    /// [`CopyState::apply`](super::CopyState::apply) for the runtime caveat.
    pub fn finish_copy(
        &mut self,
        index: usize,
        result: Result<(), ClipboardError>,
    ) -> Option<CopyOutcome> {
        let block = self.blocks.get_mut(index)?;
        Some(block.finish_copy(result))
    }

    pub fn render(&self, theme: &Theme, terminal_width: Option<usize>) -> RenderedContent {
        let config = MarkdownRenderConfig {
            syntax_highlighting: self.settings.syntax_highlighting,
            terminal_width,
        };
        let RenderedMarkdown {
            mut lines,
            mut span_metadata,
        } = MarkdownRenderer::new(self.content.processed(), theme, config, &self.blocks).render();

        let clipped = self.display.is_clipped() && lines.len() > self.settings.collapsed_height;
        if self.display.is_clipped() {
            lines.truncate(self.settings.collapsed_height);
            span_metadata.truncate(self.settings.collapsed_height);
            lines.push(Line::from(Span::styled(
                TRUNCATION_INDICATOR,
                theme.muted_style,
            )));
            span_metadata.push(vec![SpanKind::Toggle]);
        }
        if let Some(label) = self.display.toggle_label() {
            lines.push(Line::from(Span::styled(label.to_string(), theme.muted_style)));
            span_metadata.push(vec![SpanKind::Toggle]);
        }

        if let Some(base) = self.style {
            for line in &mut lines {
                for span in &mut line.spans {
                    span.style = base.patch(span.style);
                }
            }
        }

        RenderedContent {
            lines,
            span_metadata,
            clipped,
        }
    }
}
