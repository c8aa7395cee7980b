pub mod config;
pub mod constants;
pub mod content;
pub mod display;
pub mod sanitize;
