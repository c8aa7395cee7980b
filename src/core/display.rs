use crate::core::constants::{
    COLLAPSED_GLYPH, EXPANDED_GLYPH, SHOW_LESS_LABEL, SHOW_MORE_LABEL,
};
use crate::core::content::SizeReport;

/// Expand/collapse state of one rendered message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayState {
    is_expanded: bool,
    should_show_toggle: bool,
}

impl DisplayState {
    pub fn new(size: SizeReport) -> Self {
        Self {
            is_expanded: false,
            should_show_toggle: size.should_show_toggle,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    pub fn should_show_toggle(&self) -> bool {
        self.should_show_toggle
    }

    /// Content is clipped only while a toggle exists and is collapsed.
    pub fn is_clipped(&self) -> bool {
        self.should_show_toggle && !self.is_expanded
    }

    /// Flip between expanded and collapsed. No-op when there is no toggle.
    pub fn toggle(&mut self) {
        if self.should_show_toggle {
            self.is_expanded = !self.is_expanded;
        }
    }

    /// Re-derive the toggle after the content changed. The expansion flag
    /// is kept.
    pub fn update_size(&mut self, size: SizeReport) {
        self.should_show_toggle = size.should_show_toggle;
    }

    pub fn toggle_label(&self) -> Option<ToggleLabel> {
        self.should_show_toggle.then(|| {
            if self.is_expanded {
                ToggleLabel {
                    glyph: EXPANDED_GLYPH,
                    text: SHOW_LESS_LABEL,
                }
            } else {
                ToggleLabel {
                    glyph: COLLAPSED_GLYPH,
                    text: SHOW_MORE_LABEL,
                }
            }
        })
    }
}

/// Text of the toggle control: a directional glyph plus its label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleLabel {
    pub glyph: &'static str,
    pub text: &'static str,
}

impl std::fmt::Display for ToggleLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.glyph, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::evaluate;

    #[test]
    fn short_content_never_toggles() {
        let mut state = DisplayState::new(evaluate("short"));
        assert!(!state.should_show_toggle());
        assert!(!state.is_clipped());
        assert_eq!(state.toggle_label(), None);
        state.toggle();
        assert!(!state.is_expanded());
    }

    #[test]
    fn long_content_starts_collapsed_and_flips() {
        let mut state = DisplayState::new(evaluate(&"x\n".repeat(15)));
        assert!(state.is_clipped());
        assert_eq!(
            state.toggle_label().map(|l| l.to_string()).as_deref(),
            Some("▶ Show more")
        );

        state.toggle();
        assert!(state.is_expanded());
        assert!(!state.is_clipped());
        assert_eq!(
            state.toggle_label().map(|l| l.to_string()).as_deref(),
            Some("▼ Show less")
        );

        state.toggle();
        assert!(state.is_clipped());
    }

    #[test]
    fn toggle_flag_does_not_depend_on_expansion() {
        let size = evaluate(&"x\n".repeat(15));
        let mut state = DisplayState::new(size);
        state.toggle();
        state.update_size(size);
        assert!(state.should_show_toggle());
        assert!(state.is_expanded());
    }
}
