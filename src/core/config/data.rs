use crate::core::constants::{CHAR_THRESHOLD, COLLAPSED_HEIGHT, LINE_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// User configuration. Every field is optional; unset fields fall back to
/// built-in defaults and may be overridden on the command line.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// UI theme name ("dark" or "light")
    pub theme: Option<String>,
    /// Enable syntax highlighting for fenced code blocks
    pub syntax: Option<bool>,
    /// Messages with more lines than this are collapsed
    pub line_threshold: Option<usize>,
    /// Messages with more characters than this are collapsed
    pub char_threshold: Option<usize>,
    /// Rows shown while a message is collapsed
    pub collapsed_height: Option<usize>,
}

impl Config {
    /// A config with every field set to its built-in default.
    pub fn with_defaults() -> Self {
        Config {
            theme: Some("dark".to_string()),
            syntax: Some(true),
            line_threshold: Some(LINE_THRESHOLD),
            char_threshold: Some(CHAR_THRESHOLD),
            collapsed_height: Some(COLLAPSED_HEIGHT),
        }
    }
}

pub fn path_display(path: &Path) -> String {
    path.display().to_string()
}
