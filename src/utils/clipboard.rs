use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

/// Errors raised by a clipboard write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// No clipboard helper could be found on this system.
    Unavailable(String),
    /// The helper ran but reported failure.
    CommandFailed { command: String },
    /// The background write did not complete.
    Interrupted(String),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::Unavailable(reason) => write!(f, "clipboard unavailable: {reason}"),
            ClipboardError::CommandFailed { command } => {
                write!(f, "clipboard command `{command}` failed")
            }
            ClipboardError::Interrupted(reason) => {
                write!(f, "clipboard write interrupted: {reason}")
            }
        }
    }
}

impl StdError for ClipboardError {}

/// Write-only access to the system clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard backed by the platform's copy helper (`pbcopy`, `clip`,
/// `wl-copy`, `xclip` or `xsel`).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || copy_to_clipboard(&text))
            .await
            .map_err(|err| ClipboardError::Interrupted(err.to_string()))?
    }
}

pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    #[cfg(target_os = "macos")]
    {
        return run_with_stdin("pbcopy", &[], text);
    }
    #[cfg(target_os = "windows")]
    {
        return run_with_stdin("cmd", &["/C", "clip"], text);
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if run_with_stdin("wl-copy", &[], text).is_ok() {
            return Ok(());
        }
        if run_with_stdin("xclip", &["-selection", "clipboard"], text).is_ok() {
            return Ok(());
        }
        if run_with_stdin("xsel", &["--clipboard", "--input"], text).is_ok() {
            return Ok(());
        }
        Err(ClipboardError::Unavailable(
            "no clipboard command found (install wl-copy, xclip, or xsel)".to_string(),
        ))
    }
}

fn run_with_stdin(cmd: &str, args: &[&str], input: &str) -> Result<(), ClipboardError> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| ClipboardError::Unavailable(format!("`{cmd}` not available")))?;

    let write_result = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(input.as_bytes()),
        None => Ok(()),
    };

    match child.wait() {
        Ok(status) if status.success() && write_result.is_ok() => Ok(()),
        _ => Err(ClipboardError::CommandFailed {
            command: cmd.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_reports_unavailable() {
        let err = run_with_stdin("chatmark-definitely-missing-helper", &[], "x").unwrap_err();
        assert!(matches!(err, ClipboardError::Unavailable(_)));
    }

    #[test]
    fn errors_render_readable_messages() {
        let err = ClipboardError::CommandFailed {
            command: "xclip".to_string(),
        };
        assert_eq!(err.to_string(), "clipboard command `xclip` failed");
    }
}
