//! Terminal presentation of chat messages.
//!
//! - [`markdown`]: markdown rendering, collapse chrome and code block copy
//!   feedback for a single message.
//! - [`span`]: semantic metadata attached to rendered spans.
//! - [`theme`]: color and style policy.
//! - [`viewer`]: the interactive full-screen pager.

pub mod event;
pub mod markdown;
pub mod span;
pub mod theme;
pub mod viewer;
