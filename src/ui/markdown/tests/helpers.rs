use crate::ui::markdown::{MarkdownContent, RenderedContent, ViewSettings};
use crate::ui::theme::Theme;
use crate::utils::clipboard::{Clipboard, ClipboardError};
use async_trait::async_trait;
use std::sync::Mutex;

pub fn plain_settings() -> ViewSettings {
    ViewSettings {
        syntax_highlighting: false,
        ..ViewSettings::default()
    }
}

pub fn view_for_test(markdown: &str) -> MarkdownContent {
    MarkdownContent::new(markdown, plain_settings())
}

pub fn render_for_test(view: &MarkdownContent, width: Option<usize>) -> RenderedContent {
    view.render(&Theme::dark_default(), width)
}

pub fn line_texts(lines: &[ratatui::text::Line<'static>]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

pub fn numbered_lines(n: usize) -> String {
    (0..n)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clipboard double that records writes or denies them.
#[derive(Default)]
pub struct FakeClipboard {
    pub writes: Mutex<Vec<String>>,
    pub deny: bool,
}

impl FakeClipboard {
    pub fn denying() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            deny: true,
        }
    }

    pub fn written(&self) -> Vec<String> {
        self.writes.lock().expect("clipboard lock").clone()
    }
}

#[async_trait]
impl Clipboard for FakeClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.deny {
            return Err(ClipboardError::Unavailable("permission denied".to_string()));
        }
        self.writes
            .lock()
            .expect("clipboard lock")
            .push(text.to_string());
        Ok(())
    }
}
