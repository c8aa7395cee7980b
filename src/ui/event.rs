use crate::utils::clipboard::ClipboardError;
use ratatui::crossterm::event::Event;

/// Events delivered to the viewer loop.
#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
    RequestRedraw,
    /// A clipboard write started for the code block at `block_index` finished.
    CopyFinished {
        block_index: usize,
        result: Result<(), ClipboardError>,
    },
}
