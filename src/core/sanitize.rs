//! Pre-processing applied to raw message content before rendering.
//!
//! Raw HTML in a chat message is shown literally rather than interpreted:
//! [`HtmlCodeFence`] moves top-level HTML blocks into ```` ```html ````
//! fences so the markdown renderer treats them as code.

use pulldown_cmark::{Event, Options, Parser, Tag};
use std::error::Error as StdError;
use std::fmt;
use std::ops::Range;

/// Errors raised while pre-processing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// The content contains a NUL character at the given byte offset.
    NulCharacter { offset: usize },
    /// A processor refused the content for its own reasons.
    Rejected(String),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::NulCharacter { offset } => {
                write!(f, "content contains a NUL character at byte {offset}")
            }
            ProcessError::Rejected(reason) => write!(f, "content rejected: {reason}"),
        }
    }
}

impl StdError for ProcessError {}

/// Transforms raw content into the string handed to the markdown renderer.
pub trait ContentProcessor {
    fn process(&self, content: &str) -> Result<String, ProcessError>;
}

/// Default processor: wraps raw HTML blocks in `html` code fences.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlCodeFence;

impl ContentProcessor for HtmlCodeFence {
    fn process(&self, content: &str) -> Result<String, ProcessError> {
        wrap_html_in_code_block(content)
    }
}

/// Markdown extensions understood by both the pre-processor and the
/// renderer, so both agree on where code and HTML blocks are.
pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_GFM);
    options
}

/// Byte ranges of HTML blocks that are not nested in any container.
fn top_level_html_blocks(content: &str) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    for (event, range) in Parser::new_ext(content, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::HtmlBlock) if depth == 0 => {
                blocks.push(range);
                depth += 1;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    blocks
}

/// Shortest backtick fence that cannot be closed from inside `body`.
fn fence_for(body: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for ch in body.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Wrap every top-level HTML block in an `html` fence.
///
/// Block boundaries come from the markdown parser itself, so HTML-looking
/// lines inside fenced or indented code, or inside lists and quotes, are
/// never touched.
pub fn wrap_html_in_code_block(content: &str) -> Result<String, ProcessError> {
    if let Some(offset) = content.find('\0') {
        return Err(ProcessError::NulCharacter { offset });
    }

    let blocks = top_level_html_blocks(content);
    if blocks.is_empty() {
        return Ok(content.to_string());
    }

    let mut out = String::with_capacity(content.len() + blocks.len() * 16);
    let mut last = 0usize;
    for range in blocks {
        out.push_str(&content[last..range.start]);
        let block = &content[range.start..range.end];
        let (body, newline) = match block.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (block, ""),
        };
        let fence = fence_for(body);
        out.push_str(&fence);
        out.push_str("html\n");
        out.push_str(body);
        out.push('\n');
        out.push_str(&fence);
        out.push_str(newline);
        last = range.end;
    }
    out.push_str(&content[last..]);
    Ok(out)
}
