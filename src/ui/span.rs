//! Semantic span metadata for rendered content.
//!
//! [`SpanKind`] classifies rendered spans so the viewer can find links and
//! code blocks without relying on styling heuristics.
//!
//! ```
//! use chatmark::ui::span::{extract_code_blocks, SpanKind};
//!
//! let metadata = vec![
//!     vec![SpanKind::Text],
//!     vec![SpanKind::code_block(Some("python"), 0)],
//!     vec![SpanKind::code_block(Some("python"), 0)],
//!     vec![SpanKind::Text],
//! ];
//!
//! let blocks = extract_code_blocks(&metadata);
//! assert_eq!(blocks.len(), 1);
//! assert_eq!(blocks[0].start_line, 1);
//! assert_eq!(blocks[0].end_line, 2);
//! ```

use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpanKind {
    Text,
    Link(LinkMeta),
    /// Part of a highlighted code block, header row included.
    CodeBlock(CodeBlockMeta),
    /// Truncation indicator or the show more/less toggle.
    Toggle,
}

impl SpanKind {
    pub fn link(href: impl Into<String>) -> Self {
        SpanKind::Link(LinkMeta::new(href))
    }

    pub fn code_block(language: Option<impl Into<String>>, block_index: usize) -> Self {
        SpanKind::CodeBlock(CodeBlockMeta::new(language, block_index))
    }

    pub fn link_meta(&self) -> Option<&LinkMeta> {
        match self {
            SpanKind::Link(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn code_block_meta(&self) -> Option<&CodeBlockMeta> {
        match self {
            SpanKind::CodeBlock(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn is_toggle(&self) -> bool {
        matches!(self, SpanKind::Toggle)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodeBlockMeta {
    language: Option<Arc<str>>,
    block_index: usize,
}

impl CodeBlockMeta {
    pub fn new(language: Option<impl Into<String>>, block_index: usize) -> Self {
        Self {
            language: language.map(|s| Arc::<str>::from(s.into())),
            block_index,
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Zero-based position of the block within its message.
    pub fn block_index(&self) -> usize {
        self.block_index
    }
}

/// Where a link opens when activated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    /// A separate browser tab/window, never the viewer itself.
    NewContext,
}

/// Link destination plus how it opens. Rendered links always open in a new
/// context and never hand the opened page a reference back to the viewer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinkMeta {
    href: Arc<str>,
    target: LinkTarget,
    no_opener: bool,
}

impl LinkMeta {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Arc::<str>::from(href.into()),
            target: LinkTarget::NewContext,
            no_opener: true,
        }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn target(&self) -> LinkTarget {
        self.target
    }

    pub fn no_opener(&self) -> bool {
        self.no_opener
    }

    /// Command that opens the link according to its target. With
    /// `no_opener` the launched process gets no handle on the viewer's
    /// terminal.
    pub fn open_command(&self) -> Command {
        let mut command = match self.target {
            LinkTarget::NewContext => new_context_launcher(&self.href),
        };
        if self.no_opener {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }
        command
    }
}

#[cfg(target_os = "macos")]
fn new_context_launcher(href: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(href);
    command
}

#[cfg(target_os = "windows")]
fn new_context_launcher(href: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", href]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn new_context_launcher(href: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(href);
    command
}

/// Distinct links in rendered order. Adjacent spans of one link (styled
/// text, destination suffix, wrapped rows) collapse into one entry.
pub fn extract_links(metadata: &[Vec<SpanKind>]) -> Vec<LinkMeta> {
    let mut links: Vec<LinkMeta> = Vec::new();
    let mut previous_was_same = false;
    for kind in metadata.iter().flatten() {
        match kind.link_meta() {
            Some(meta) => {
                let same = previous_was_same && links.last() == Some(meta);
                if !same {
                    links.push(meta.clone());
                }
                previous_was_same = true;
            }
            None => previous_was_same = false,
        }
    }
    links
}

/// Line range of one code block in rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockPosition {
    pub block_index: usize,
    /// First line of the block (inclusive).
    pub start_line: usize,
    /// Last line of the block (inclusive).
    pub end_line: usize,
    pub language: Option<String>,
}

/// Collect code block line ranges from span metadata, ordered by index.
pub fn extract_code_blocks(metadata: &[Vec<SpanKind>]) -> Vec<CodeBlockPosition> {
    let mut blocks: BTreeMap<usize, CodeBlockPosition> = BTreeMap::new();

    for (line_idx, line_meta) in metadata.iter().enumerate() {
        for meta in line_meta.iter().filter_map(SpanKind::code_block_meta) {
            blocks
                .entry(meta.block_index())
                .or_insert_with(|| CodeBlockPosition {
                    block_index: meta.block_index(),
                    start_line: line_idx,
                    end_line: line_idx,
                    language: meta.language().map(String::from),
                })
                .end_line = line_idx;
        }
    }

    blocks.into_values().collect()
}
