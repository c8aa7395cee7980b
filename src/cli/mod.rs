//! Command-line entry point.
//!
//! Parses arguments, layers CLI flags over the config file, and either
//! prints the rendered message or opens the interactive viewer.

use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::debug;

use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::ui::markdown::{MarkdownContent, ViewSettings};
use crate::ui::theme::Theme;
use crate::ui::viewer::run_viewer;
use crate::utils::clipboard::SystemClipboard;
use crate::utils::logging::init_tracing;

// build.rs always sets the git variables, falling back to "unknown"
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "chatmark", version, long_version = LONG_VERSION)]
#[command(about = "Render a chat message as markdown in the terminal")]
#[command(
    long_about = "Chatmark renders a chat-style markdown message in the terminal. Long \
messages start collapsed behind a Show more toggle, and fenced code blocks with a \
language are highlighted and can be copied to the clipboard.\n\n\
Controls:\n\
  Space/Enter       Show more / show less\n\
  1-9               Copy the N-th code block\n\
  Up/Down, j/k      Scroll\n\
  PgUp/PgDn         Scroll a page\n\
  q, Esc, Ctrl+C    Quit"
)]
pub struct Args {
    /// Markdown file to show; reads stdin when omitted or "-"
    pub file: Option<PathBuf>,

    /// Print the rendered message to stdout instead of opening the viewer
    #[arg(long)]
    pub print: bool,

    /// Start expanded
    #[arg(long)]
    pub expanded: bool,

    /// Wrap width for --print
    #[arg(long, value_name = "COLS")]
    pub width: Option<usize>,

    /// Disable syntax highlighting
    #[arg(long)]
    pub no_syntax: bool,

    /// Theme to use (dark or light)
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a config file with every default filled in, then exit
    #[arg(long)]
    pub init_config: bool,

    /// Enable diagnostic logging to the specified file
    #[arg(short = 'l', long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Log filter directives (defaults to RUST_LOG, then "info")
    #[arg(long, value_name = "DIRECTIVES")]
    pub log_filter: Option<String>,
}

impl Args {
    /// Layer command-line flags over `config`.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(theme) = &self.theme {
            config.theme = Some(theme.clone());
        }
        if self.no_syntax {
            config.syntax = Some(false);
        }
        config
    }
}

fn config_path(args: &Args) -> Result<PathBuf, Box<dyn Error>> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::default_path()?),
    }
}

fn read_input(file: Option<&Path>) -> Result<String, Box<dyn Error>> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path_display(path)).into()),
        _ => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

/// Render `view` as plain text, one rendered row per output line.
pub fn render_plain(view: &MarkdownContent, theme: &Theme, width: Option<usize>) -> String {
    let rendered = view.render(theme, width);
    let mut out = String::new();
    for line in &rendered.lines {
        out.push_str(line.to_string().trim_end());
        out.push('\n');
    }
    out
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log.as_deref(), args.log_filter.as_deref())?;

    let path = config_path(&args)?;
    if args.init_config {
        Config::with_defaults().save_to_path(&path)?;
        println!("Wrote default config to {}", path_display(&path));
        return Ok(());
    }

    let config = args.apply_overrides(Config::load_from_path(&path)?);
    debug!(path = %path_display(&path), ?config, "loaded config");

    let raw = read_input(args.file.as_deref())?;
    let theme = Theme::from_name(config.theme.as_deref().unwrap_or("dark"));
    let mut view = MarkdownContent::new(&raw, ViewSettings::from_config(&config));
    if args.expanded {
        view.toggle();
    }

    if args.print {
        print!("{}", render_plain(&view, &theme, args.width));
        return Ok(());
    }

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run_viewer(view, theme, Arc::new(SystemClipboard)))
}
