//! Transient "copied" feedback for a single code block.
//!
//! After a successful clipboard write the block reports `copied` for
//! [`COPY_FEEDBACK_DURATION`], then resets. The reset runs as a spawned
//! task guarded by a [`CancellationToken`]; a newer copy, a failed copy, or
//! dropping the state cancels it, so at most one reset is ever pending and
//! none outlives its block.

use crate::core::constants::COPY_FEEDBACK_DURATION;
use crate::ui::event::UiEvent;
use crate::utils::clipboard::{Clipboard, ClipboardError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of a copy attempt. Failures are reported, never raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Failed,
}

#[derive(Debug)]
pub struct CopyState {
    // 0 while idle, otherwise the generation of the copy being shown
    shown: Arc<AtomicU64>,
    generation: u64,
    pending_reset: Option<CancellationToken>,
    feedback: Duration,
    notifier: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl Default for CopyState {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyState {
    pub fn new() -> Self {
        Self {
            shown: Arc::new(AtomicU64::new(0)),
            generation: 0,
            pending_reset: None,
            feedback: COPY_FEEDBACK_DURATION,
            notifier: None,
        }
    }

    /// Ask for a redraw on `notifier` whenever the indicator resets.
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<UiEvent>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn is_copied(&self) -> bool {
        self.shown.load(Ordering::Acquire) != 0
    }

    pub fn has_pending_reset(&self) -> bool {
        self.pending_reset
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Write `text` to `clipboard` and apply the result.
    pub async fn copy(&mut self, clipboard: &dyn Clipboard, text: &str) -> CopyOutcome {
        let result = clipboard.write_text(text).await;
        self.apply(result)
    }

    /// Apply the result of a clipboard write finished elsewhere, e.g. on a
    /// task spawned by the viewer so the loop keeps running meanwhile.
    ///
    /// A successful write applied outside a tokio runtime cannot schedule
    /// its reset; it is reported as [`CopyOutcome::Failed`] and the
    /// indicator stays off.
    pub fn apply(&mut self, result: Result<(), ClipboardError>) -> CopyOutcome {
        match result {
            Ok(()) => self.show_copied(),
            Err(err) => {
                warn!(error = %err, "failed to copy code block");
                self.clear();
                CopyOutcome::Failed
            }
        }
    }

    fn clear(&mut self) {
        self.cancel_reset();
        self.shown.store(0, Ordering::Release);
    }

    fn show_copied(&mut self) -> CopyOutcome {
        // The indicator is only shown when its reset can be scheduled
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime to schedule the copy indicator reset");
            self.clear();
            return CopyOutcome::Failed;
        };
        self.cancel_reset();
        self.generation += 1;
        let generation = self.generation;
        self.shown.store(generation, Ordering::Release);

        let token = CancellationToken::new();
        self.pending_reset = Some(token.clone());

        let shown = Arc::clone(&self.shown);
        let notifier = self.notifier.clone();
        let feedback = self.feedback;
        debug!(generation, ?feedback, "scheduled copy indicator reset");
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(feedback) => {
                    // A newer copy owns the indicator if the generation moved on
                    let _ = shown.compare_exchange(
                        generation,
                        0,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    token.cancel();
                    if let Some(notifier) = notifier {
                        let _ = notifier.send(UiEvent::RequestRedraw);
                    }
                }
            }
        });
        CopyOutcome::Copied
    }

    fn cancel_reset(&mut self) {
        if let Some(token) = self.pending_reset.take() {
            token.cancel();
        }
    }
}

impl Drop for CopyState {
    fn drop(&mut self) {
        self.cancel_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClipboard {
        writes: Mutex<Vec<String>>,
        deny: bool,
    }

    impl RecordingClipboard {
        fn denying() -> Self {
            Self {
                writes: Mutex::new(Vec::new()),
                deny: true,
            }
        }
    }

    #[async_trait]
    impl Clipboard for RecordingClipboard {
        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.deny {
                return Err(ClipboardError::Unavailable("denied".to_string()));
            }
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn copied_shows_immediately_then_resets_after_two_seconds() {
        let clipboard = RecordingClipboard::default();
        let mut state = CopyState::new();
        assert!(!state.is_copied());

        let outcome = state.copy(&clipboard, "print('hi')").await;
        assert_eq!(outcome, CopyOutcome::Copied);
        assert!(state.is_copied());
        assert!(state.has_pending_reset());
        assert_eq!(*clipboard.writes.lock().unwrap(), vec!["print('hi')"]);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(state.is_copied());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!state.is_copied());
        assert!(!state.has_pending_reset());
    }

    #[tokio::test(start_paused = true)]
    async fn denied_clipboard_leaves_indicator_off() {
        let clipboard = RecordingClipboard::denying();
        let mut state = CopyState::new();

        let outcome = state.copy(&clipboard, "secret").await;
        assert_eq!(outcome, CopyOutcome::Failed);
        assert!(!state.is_copied());
        assert!(!state.has_pending_reset());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_success_turns_indicator_off() {
        let mut state = CopyState::new();
        state.apply(Ok(()));
        assert!(state.is_copied());

        let outcome = state.apply(Err(ClipboardError::Unavailable("gone".to_string())));
        assert_eq!(outcome, CopyOutcome::Failed);
        assert!(!state.is_copied());
        assert!(!state.has_pending_reset());
    }

    #[tokio::test(start_paused = true)]
    async fn second_copy_restarts_the_window() {
        let clipboard = RecordingClipboard::default();
        let mut state = CopyState::new();

        state.copy(&clipboard, "a").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        state.copy(&clipboard, "a").await;
        assert!(state.is_copied());
        assert!(state.has_pending_reset());

        // The first window would have closed at 2000ms
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(state.is_copied());

        // The second closes at 3500ms
        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert!(!state.is_copied());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_requests_a_redraw() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = CopyState::new().with_notifier(tx);
        state.apply(Ok(()));

        tokio::time::sleep(COPY_FEEDBACK_DURATION + Duration::from_millis(1)).await;
        assert!(matches!(rx.try_recv(), Ok(UiEvent::RequestRedraw)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn success_outside_a_runtime_is_reported_as_failed() {
        let mut state = CopyState::new();
        assert_eq!(state.apply(Ok(())), CopyOutcome::Failed);
        assert!(!state.is_copied());
        assert!(!state.has_pending_reset());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_state_cancels_the_reset() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = CopyState::new().with_notifier(tx);
        state.apply(Ok(()));
        let shown = Arc::clone(&state.shown);
        drop(state);

        tokio::time::sleep(COPY_FEEDBACK_DURATION * 2).await;
        // The cancelled task never ran its reset
        assert_ne!(shown.load(Ordering::Acquire), 0);
        assert!(rx.try_recv().is_err());
    }
}
