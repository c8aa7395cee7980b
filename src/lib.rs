//! Chatmark renders chat-style markdown messages in the terminal.
//!
//! - [`core`] sizes content, decides collapse state, pre-processes raw
//!   text, and loads configuration.
//! - [`ui`] renders markdown into styled lines, tracks code block copy
//!   feedback, and runs the full-screen viewer.
//! - [`utils`] wraps the system clipboard, syntax highlighting and logging.
//!
//! The binary (`src/main.rs`) routes through [`cli::main`].

pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
