//! Markdown rendering for chat messages.
//!
//! [`MarkdownContent`] owns one message: it pre-processes and sizes the
//! content, tracks whether the message is expanded, and keeps one
//! [`CodeBlock`] per highlighted fenced block so each block's copy
//! feedback survives re-renders.

mod code;
mod content_view;
mod copy;
mod render;
mod wrap;

#[cfg(test)]
mod tests;

pub use code::{
    class_name_for_codeblock_kind, classify_code_node, language_from_class_name,
    trim_trailing_newline, CodeBlock, CodeClass,
};
pub use content_view::{MarkdownContent, RenderedContent, ViewSettings};
pub use copy::{CopyOutcome, CopyState};
pub use render::{collect_code_blocks, MarkdownRenderConfig, RenderedMarkdown};
