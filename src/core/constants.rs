//! Shared constants used across the application

use std::time::Duration;

/// Content with more newline-delimited segments than this collapses.
pub const LINE_THRESHOLD: usize = 10;

/// Content with more characters than this collapses.
pub const CHAR_THRESHOLD: usize = 500;

/// Rows shown while a long message is collapsed.
pub const COLLAPSED_HEIGHT: usize = 10;

/// How long a code block keeps showing its "copied" indicator.
pub const COPY_FEEDBACK_DURATION: Duration = Duration::from_millis(2000);

pub const SHOW_MORE_LABEL: &str = "Show more";
pub const SHOW_LESS_LABEL: &str = "Show less";
pub const COLLAPSED_GLYPH: &str = "▶";
pub const EXPANDED_GLYPH: &str = "▼";
pub const TRUNCATION_INDICATOR: &str = "...";
