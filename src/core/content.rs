//! Content sizing and the raw/processed content pair.
//!
//! [`ContentSizer`] decides whether a processed message is long enough to be
//! shown collapsed. It is pure: the same string always yields the same
//! [`SizeReport`], independent of any display state.

use crate::core::constants::{CHAR_THRESHOLD, LINE_THRESHOLD};
use crate::core::sanitize::ContentProcessor;
use tracing::{debug, warn};

/// Measurements of a processed content string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeReport {
    pub line_count: usize,
    pub char_count: usize,
    pub should_show_toggle: bool,
}

/// Thresholds beyond which content is rendered collapsed with a toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentSizer {
    line_threshold: usize,
    char_threshold: usize,
}

impl Default for ContentSizer {
    fn default() -> Self {
        Self {
            line_threshold: LINE_THRESHOLD,
            char_threshold: CHAR_THRESHOLD,
        }
    }
}

impl ContentSizer {
    pub fn with_thresholds(line_threshold: usize, char_threshold: usize) -> Self {
        Self {
            line_threshold,
            char_threshold,
        }
    }

    pub fn line_threshold(&self) -> usize {
        self.line_threshold
    }

    pub fn char_threshold(&self) -> usize {
        self.char_threshold
    }

    pub fn evaluate(&self, processed: &str) -> SizeReport {
        let line_count = line_count(processed);
        let char_count = char_count(processed);
        SizeReport {
            line_count,
            char_count,
            should_show_toggle: line_count > self.line_threshold
                || char_count > self.char_threshold,
        }
    }
}

/// Evaluate with the default thresholds.
pub fn evaluate(processed: &str) -> SizeReport {
    ContentSizer::default().evaluate(processed)
}

/// Number of newline-delimited segments. The empty string is one segment.
pub fn line_count(s: &str) -> usize {
    s.split('\n').count()
}

pub fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// A raw message together with its processed form and size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    raw: String,
    processed: String,
    size: SizeReport,
}

impl Content {
    /// Run `raw` through the processor and measure the result.
    ///
    /// A processor failure is logged and the raw text is used for both
    /// display and sizing.
    pub fn process(raw: &str, processor: &dyn ContentProcessor, sizer: &ContentSizer) -> Self {
        let processed = match processor.process(raw) {
            Ok(processed) => processed,
            Err(err) => {
                warn!(error = %err, "content processing failed; using raw content");
                raw.to_string()
            }
        };
        let size = sizer.evaluate(&processed);
        debug!(
            lines = size.line_count,
            chars = size.char_count,
            collapsible = size.should_show_toggle,
            "evaluated content size"
        );
        Self {
            raw: raw.to_string(),
            processed,
            size,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn processed(&self) -> &str {
        &self.processed
    }

    pub fn size(&self) -> SizeReport {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sanitize::{HtmlCodeFence, ProcessError};

    struct FailingProcessor;

    impl ContentProcessor for FailingProcessor {
        fn process(&self, _content: &str) -> Result<String, ProcessError> {
            Err(ProcessError::Rejected("boom".to_string()))
        }
    }

    fn lines(n: usize) -> String {
        (0..n)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_string_is_one_short_line() {
        let report = evaluate("");
        assert_eq!(report.line_count, 1);
        assert_eq!(report.char_count, 0);
        assert!(!report.should_show_toggle);
    }

    #[test]
    fn trailing_newline_counts_an_extra_segment() {
        assert_eq!(line_count("a\n"), 2);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("\n\n"), 3);
    }

    #[test]
    fn short_content_has_no_toggle() {
        let mut content = lines(5);
        while content.len() < 100 {
            content.push('x');
        }
        let report = evaluate(&content);
        assert_eq!(report.line_count, 5);
        assert_eq!(report.char_count, 100);
        assert!(!report.should_show_toggle);
    }

    #[test]
    fn fifteen_lines_show_toggle() {
        let report = evaluate(&lines(15));
        assert_eq!(report.line_count, 15);
        assert!(report.should_show_toggle);
    }

    #[test]
    fn thresholds_are_strict() {
        assert!(!evaluate(&lines(10)).should_show_toggle);
        assert!(evaluate(&lines(11)).should_show_toggle);
        assert!(!evaluate(&"a".repeat(500)).should_show_toggle);
        assert!(evaluate(&"a".repeat(501)).should_show_toggle);
    }

    #[test]
    fn toggle_matches_either_threshold() {
        let samples = [
            String::new(),
            "x".repeat(499),
            "x".repeat(800),
            "\n".repeat(9),
            "\n".repeat(10),
            format!("{}\n{}", "y".repeat(300), "z".repeat(300)),
            "é".repeat(300),
        ];
        for sample in &samples {
            let report = evaluate(sample);
            let expected = line_count(sample) > 10 || sample.chars().count() > 500;
            assert_eq!(report.should_show_toggle, expected, "sample {sample:?}");
        }
    }

    #[test]
    fn evaluate_is_idempotent() {
        let text = lines(12);
        assert_eq!(evaluate(&text), evaluate(&text));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let report = evaluate(&"é".repeat(300));
        assert_eq!(report.char_count, 300);
        assert!(!report.should_show_toggle);
    }

    #[test]
    fn custom_thresholds_apply() {
        let sizer = ContentSizer::with_thresholds(2, 1000);
        assert!(sizer.evaluate("a\nb\nc").should_show_toggle);
        assert!(!sizer.evaluate("a\nb").should_show_toggle);
    }

    #[test]
    fn processing_failure_falls_back_to_raw() {
        let raw = lines(20);
        let content = Content::process(&raw, &FailingProcessor, &ContentSizer::default());
        assert_eq!(content.processed(), raw);
        assert_eq!(content.size().line_count, 20);
        assert!(content.size().should_show_toggle);
    }

    #[test]
    fn size_is_measured_on_processed_text() {
        let raw = "<div>\n<p>hi</p>\n</div>";
        let content = Content::process(raw, &HtmlCodeFence, &ContentSizer::default());
        assert_eq!(content.raw(), raw);
        assert_ne!(content.processed(), raw);
        assert_eq!(
            content.size().line_count,
            line_count(content.processed())
        );
    }
}
