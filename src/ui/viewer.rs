//! Full-screen pager for one message.
//!
//! Terminal input is read on a blocking thread and funneled, together with
//! redraw requests and finished clipboard writes, through one
//! [`UiEvent`] channel. Clipboard writes run on their own tasks so the loop
//! keeps drawing while a helper process runs.

use std::error::Error;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ui::event::UiEvent;
use crate::ui::markdown::{CopyOutcome, MarkdownContent};
use crate::ui::span::{extract_links, LinkMeta};
use crate::ui::theme::Theme;
use crate::utils::clipboard::{Clipboard, ClipboardError};

const HELP_TEXT: &str =
    "space: more/less  1-9: copy block  tab: next link  o: open link  ↑↓: scroll  q: quit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Toggle,
    /// Copy the code block at this zero-based index.
    Copy(usize),
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    NextLink,
    OpenLink,
    Quit,
}

pub fn action_for_key(key: &KeyEvent) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(KeyAction::Quit);
    }
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => Some(KeyAction::Toggle),
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .map(|n| KeyAction::Copy(n as usize - 1)),
        KeyCode::Up | KeyCode::Char('k') => Some(KeyAction::ScrollUp),
        KeyCode::Down | KeyCode::Char('j') => Some(KeyAction::ScrollDown),
        KeyCode::PageUp => Some(KeyAction::PageUp),
        KeyCode::PageDown => Some(KeyAction::PageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(KeyAction::Top),
        KeyCode::End | KeyCode::Char('G') => Some(KeyAction::Bottom),
        KeyCode::Tab => Some(KeyAction::NextLink),
        KeyCode::Char('o') => Some(KeyAction::OpenLink),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

pub struct ViewerState {
    view: MarkdownContent,
    theme: Theme,
    clipboard: Arc<dyn Clipboard>,
    scroll: usize,
    viewport: usize,
    total_lines: usize,
    selected_link: Option<usize>,
    status: Option<String>,
}

impl ViewerState {
    pub fn new(view: MarkdownContent, theme: Theme, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            view,
            theme,
            clipboard,
            scroll: 0,
            viewport: 0,
            total_lines: 0,
            selected_link: None,
            status: None,
        }
    }

    pub fn view(&self) -> &MarkdownContent {
        &self.view
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn selected_link(&self) -> Option<usize> {
        self.selected_link
    }

    /// Links currently on screen; a collapsed view only offers its visible part.
    fn links(&self) -> Vec<LinkMeta> {
        extract_links(&self.view.render(&self.theme, None).span_metadata)
    }

    fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport)
    }

    fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll.saturating_add_signed(delta);
        self.scroll = target.min(self.max_scroll());
    }

    /// Apply a key action. Returns false when the viewer should exit.
    pub fn apply(&mut self, action: KeyAction, events: &mpsc::UnboundedSender<UiEvent>) -> bool {
        let page = self.viewport.max(1) as isize;
        match action {
            KeyAction::Quit => return false,
            KeyAction::Toggle => {
                if self.view.display().should_show_toggle() {
                    self.view.toggle();
                    self.scroll = 0;
                    self.selected_link = None;
                }
            }
            KeyAction::Copy(index) => self.start_copy(index, events),
            KeyAction::ScrollUp => self.scroll_by(-1),
            KeyAction::ScrollDown => self.scroll_by(1),
            KeyAction::PageUp => self.scroll_by(-page),
            KeyAction::PageDown => self.scroll_by(page),
            KeyAction::Top => self.scroll = 0,
            KeyAction::Bottom => self.scroll = self.max_scroll(),
            KeyAction::NextLink => self.select_next_link(),
            KeyAction::OpenLink => self.open_selected_link(),
        }
        true
    }

    fn select_next_link(&mut self) {
        let links = self.links();
        if links.is_empty() {
            self.selected_link = None;
            self.status = Some("No links".to_string());
            return;
        }
        let index = self
            .selected_link
            .map_or(0, |current| (current + 1) % links.len());
        self.selected_link = Some(index);
        self.status = Some(format!(
            "Link {}/{}: {}",
            index + 1,
            links.len(),
            links[index].href()
        ));
    }

    fn open_selected_link(&mut self) {
        let links = self.links();
        let Some(link) = self.selected_link.and_then(|index| links.get(index)) else {
            self.status = Some("No link selected".to_string());
            return;
        };
        let href = link.href().to_string();
        let mut command = link.open_command();
        info!(%href, "opening link");
        // Wait on a blocking thread so the launcher is reaped
        tokio::task::spawn_blocking(move || match command.status() {
            Ok(status) if status.success() => debug!("link launcher exited"),
            Ok(status) => warn!(%status, "link launcher failed"),
            Err(err) => warn!(error = %err, "could not start link launcher"),
        });
        self.status = Some(format!("Opening {href}"));
    }

    fn start_copy(&mut self, index: usize, events: &mpsc::UnboundedSender<UiEvent>) {
        let Some(block) = self.view.code_blocks().get(index) else {
            self.status = Some(format!("No code block {}", index + 1));
            return;
        };
        let code = block.code().to_string();
        let clipboard = Arc::clone(&self.clipboard);
        let events = events.clone();
        debug!(block = index, "copying code block");
        tokio::spawn(async move {
            let result = clipboard.write_text(&code).await;
            let _ = events.send(UiEvent::CopyFinished {
                block_index: index,
                result,
            });
        });
    }

    pub fn finish_copy(&mut self, index: usize, result: Result<(), ClipboardError>) {
        let error = result.as_ref().err().map(ToString::to_string);
        if let Some(outcome) = self.view.finish_copy(index, result) {
            info!(block = index, ?outcome, "copy finished");
            self.status = Some(match (outcome, error) {
                (CopyOutcome::Copied, _) => format!("Copied block {}", index + 1),
                (CopyOutcome::Failed, Some(err)) => format!("Copy failed: {err}"),
                (CopyOutcome::Failed, None) => "Copy failed".to_string(),
            });
        }
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let [body, footer] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());
        let rendered = self.view.render(&self.theme, Some(body.width as usize));
        self.viewport = body.height as usize;
        self.total_lines = rendered.lines.len();
        self.scroll = self.scroll.min(self.max_scroll());

        let background = Style::default().bg(self.theme.background_color);
        let paragraph = Paragraph::new(rendered.lines)
            .style(background)
            .scroll((u16::try_from(self.scroll).unwrap_or(u16::MAX), 0));
        frame.render_widget(paragraph, body);

        let footer_text = match &self.status {
            Some(status) => format!(" {status}  ·  {HELP_TEXT}"),
            None => format!(" {HELP_TEXT}"),
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(footer_text, self.theme.muted_style)))
                .style(background),
            footer,
        );
    }
}

/// Read terminal input on a blocking thread until `stop` is cancelled or
/// the loop hangs up.
fn spawn_event_reader(
    event_tx: mpsc::UnboundedSender<UiEvent>,
    stop: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !stop.is_cancelled() {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(err) => debug!(error = %err, "dropped unreadable terminal event"),
                },
                Ok(false) => {}
                Err(err) => {
                    warn!(error = %err, "terminal input unavailable");
                    break;
                }
            }
        }
    })
}

/// Process events until the user quits or every sender is gone.
pub async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    state: &mut ViewerState,
    events: &mpsc::UnboundedSender<UiEvent>,
    rx: &mut mpsc::UnboundedReceiver<UiEvent>,
) -> io::Result<()> {
    terminal.draw(|frame| state.draw(frame))?;
    while let Some(event) = rx.recv().await {
        match event {
            UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                let Some(action) = action_for_key(&key) else {
                    continue;
                };
                if !state.apply(action, events) {
                    break;
                }
            }
            UiEvent::Crossterm(Event::Resize(..)) | UiEvent::RequestRedraw => {}
            UiEvent::Crossterm(_) => continue,
            UiEvent::CopyFinished {
                block_index,
                result,
            } => state.finish_copy(block_index, result),
        }
        terminal.draw(|frame| state.draw(frame))?;
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout)).inspect_err(|_| {
        let _ = disable_raw_mode();
    })?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Show `view` full-screen until the user quits.
pub async fn run_viewer(
    view: MarkdownContent,
    theme: Theme,
    clipboard: Arc<dyn Clipboard>,
) -> Result<(), Box<dyn Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut state = ViewerState::new(view.with_notifier(tx.clone()), theme, clipboard);

    let mut terminal = setup_terminal()?;
    let stop = CancellationToken::new();
    let reader = spawn_event_reader(tx.clone(), stop.clone());
    let result = event_loop(&mut terminal, &mut state, &tx, &mut rx).await;
    stop.cancel();
    // The reader notices within one poll interval
    let _ = reader.await;
    restore_terminal(&mut terminal)?;
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::markdown::ViewSettings;
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryClipboard {
        contents: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Clipboard for MemoryClipboard {
        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            *self.contents.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn long_message() -> String {
        let mut text = (0..20)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        text.push_str("\n\n```python\nprint('hi')\n```");
        text
    }

    fn state_for(markdown: &str, clipboard: Arc<MemoryClipboard>) -> ViewerState {
        let settings = ViewSettings {
            syntax_highlighting: false,
            ..ViewSettings::default()
        };
        ViewerState::new(
            MarkdownContent::new(markdown, settings),
            Theme::dark_default(),
            clipboard,
        )
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(action_for_key(&key(KeyCode::Char(' '))), Some(KeyAction::Toggle));
        assert_eq!(action_for_key(&key(KeyCode::Enter)), Some(KeyAction::Toggle));
        assert_eq!(action_for_key(&key(KeyCode::Char('1'))), Some(KeyAction::Copy(0)));
        assert_eq!(action_for_key(&key(KeyCode::Char('9'))), Some(KeyAction::Copy(8)));
        assert_eq!(action_for_key(&key(KeyCode::Char('0'))), None);
        assert_eq!(action_for_key(&key(KeyCode::Char('j'))), Some(KeyAction::ScrollDown));
        assert_eq!(action_for_key(&key(KeyCode::Esc)), Some(KeyAction::Quit));
        assert_eq!(action_for_key(&key(KeyCode::Tab)), Some(KeyAction::NextLink));
        assert_eq!(action_for_key(&key(KeyCode::Char('o'))), Some(KeyAction::OpenLink));
        assert_eq!(
            action_for_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn collapsed_message_draws_toggle_and_expands() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = state_for(&long_message(), Arc::new(MemoryClipboard::default()));
        let mut terminal = Terminal::new(TestBackend::new(40, 30)).expect("terminal");

        terminal.draw(|f| state.draw(f)).expect("draw");
        let screen = screen_text(&terminal);
        assert!(screen.contains("▶ Show more"));
        assert!(!screen.contains("line 15"));

        assert!(state.apply(KeyAction::Toggle, &tx));
        terminal.draw(|f| state.draw(f)).expect("draw");
        let screen = screen_text(&terminal);
        assert!(screen.contains("line 15"));
        assert!(screen.contains("▼ Show less"));
    }

    #[tokio::test(start_paused = true)]
    async fn scrolling_is_clamped_to_content() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = state_for(&long_message(), Arc::new(MemoryClipboard::default()));
        state.apply(KeyAction::Toggle, &tx);
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).expect("terminal");
        terminal.draw(|f| state.draw(f)).expect("draw");

        state.apply(KeyAction::ScrollUp, &tx);
        assert_eq!(state.scroll(), 0);
        state.apply(KeyAction::Bottom, &tx);
        let bottom = state.scroll();
        assert!(bottom > 0);
        state.apply(KeyAction::PageDown, &tx);
        assert_eq!(state.scroll(), bottom);
        state.apply(KeyAction::Top, &tx);
        assert_eq!(state.scroll(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn copy_key_writes_clipboard_and_reports_back() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let clipboard = Arc::new(MemoryClipboard::default());
        let mut state = state_for(&long_message(), Arc::clone(&clipboard));

        assert!(state.apply(KeyAction::Copy(0), &tx));
        match rx.recv().await {
            Some(UiEvent::CopyFinished {
                block_index,
                result,
            }) => {
                assert_eq!(block_index, 0);
                state.finish_copy(block_index, result);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert_eq!(
            clipboard.contents.lock().unwrap().as_deref(),
            Some("print('hi')")
        );
        assert!(state.view().code_blocks()[0].is_copied());
        assert_eq!(state.status(), Some("Copied block 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn copy_key_without_block_sets_status() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = state_for("no code here", Arc::new(MemoryClipboard::default()));
        state.apply(KeyAction::Copy(2), &tx);
        assert_eq!(state.status(), Some("No code block 3"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_copy_reports_the_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = state_for(&long_message(), Arc::new(MemoryClipboard::default()));
        state.apply(KeyAction::Copy(0), &tx);
        state.finish_copy(0, Err(ClipboardError::Unavailable("no helper".to_string())));
        assert_eq!(state.status(), Some("Copy failed: clipboard unavailable: no helper"));
        assert!(!state.view().code_blocks()[0].is_copied());
    }

    #[tokio::test(start_paused = true)]
    async fn tab_cycles_through_links() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = state_for(
            "See [docs](https://a.example) and [more **docs**](https://b.example).",
            Arc::new(MemoryClipboard::default()),
        );
        assert_eq!(state.selected_link(), None);

        state.apply(KeyAction::NextLink, &tx);
        assert_eq!(state.selected_link(), Some(0));
        assert_eq!(state.status(), Some("Link 1/2: https://a.example"));

        state.apply(KeyAction::NextLink, &tx);
        assert_eq!(state.status(), Some("Link 2/2: https://b.example"));

        state.apply(KeyAction::NextLink, &tx);
        assert_eq!(state.selected_link(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn collapsed_view_only_offers_visible_links() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markdown = "[top](https://top.example)\n".to_string();
        markdown.push_str(&long_message());
        markdown.push_str("\n\n[bottom](https://bottom.example)");
        let mut state = state_for(&markdown, Arc::new(MemoryClipboard::default()));

        state.apply(KeyAction::NextLink, &tx);
        state.apply(KeyAction::NextLink, &tx);
        assert_eq!(state.status(), Some("Link 1/1: https://top.example"));

        state.apply(KeyAction::Toggle, &tx);
        assert_eq!(state.selected_link(), None);
        state.apply(KeyAction::NextLink, &tx);
        assert_eq!(state.status(), Some("Link 1/2: https://top.example"));
    }

    #[tokio::test(start_paused = true)]
    async fn links_need_a_selection_before_opening() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = state_for("plain text", Arc::new(MemoryClipboard::default()));
        state.apply(KeyAction::OpenLink, &tx);
        assert_eq!(state.status(), Some("No link selected"));
        state.apply(KeyAction::NextLink, &tx);
        assert_eq!(state.status(), Some("No links"));
    }

    #[tokio::test]
    async fn event_reader_stops_when_cancelled() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let reader = spawn_event_reader(tx, stop.clone());
        stop.cancel();
        tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("reader should stop")
            .expect("reader should not panic");
    }

    #[tokio::test(start_paused = true)]
    async fn quit_ends_the_loop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = state_for("hello", Arc::new(MemoryClipboard::default()));
        let mut terminal = Terminal::new(TestBackend::new(30, 5)).expect("terminal");

        tx.send(UiEvent::Crossterm(Event::Key(key(KeyCode::Char('q')))))
            .expect("send");
        event_loop(&mut terminal, &mut state, &tx, &mut rx)
            .await
            .expect("loop");
        assert!(screen_text(&terminal).contains("hello"));
    }
}
