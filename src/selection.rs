use thiserror::Error;
use tracing::debug;

use crate::models::Rect;
use crate::utils::{head_chars, tail_chars};

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no active selection")]
    NoSelection,

    #[error("selection {start}..{end} is outside the page ({len} chars)")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// What the content side can ask about the user's current selection.
pub trait SelectionProvider {
    /// Raw selected text, untrimmed. Empty when nothing is selected.
    fn selected_text(&self) -> String;

    /// Bounding box of the selection, relative to the viewport.
    fn anchor_rect(&self) -> Option<Rect>;

    /// All page text before the selection start.
    fn text_before(&self) -> Result<String, SelectionError>;

    /// All page text after the selection end.
    fn text_after(&self) -> Result<String, SelectionError>;
}

/// Up to `chars` characters on each side of the selection, joined and
/// trimmed. Never fails: a provider error yields an empty context.
pub fn extract_context(selection: &dyn SelectionProvider, chars: usize) -> String {
    let window = || -> Result<String, SelectionError> {
        let before = selection.text_before()?;
        let after = selection.text_after()?;
        Ok(format!("{}{}", tail_chars(&before, chars), head_chars(&after, chars)))
    };
    match window() {
        Ok(context) => context.trim().to_string(),
        Err(err) => {
            debug!("failed to extract context: {err}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::char_len;

    struct Fixed {
        before: Result<String, ()>,
        after: String,
    }

    impl SelectionProvider for Fixed {
        fn selected_text(&self) -> String {
            "word".into()
        }

        fn anchor_rect(&self) -> Option<Rect> {
            None
        }

        fn text_before(&self) -> Result<String, SelectionError> {
            self.before.clone().map_err(|_| SelectionError::NoSelection)
        }

        fn text_after(&self) -> Result<String, SelectionError> {
            Ok(self.after.clone())
        }
    }

    #[test]
    fn takes_the_window_on_both_sides() {
        let sel = Fixed {
            before: Ok(format!("{}{}", "x".repeat(500), "  near before ")),
            after: format!(" near after  {}", "y".repeat(500)),
        };
        let context = extract_context(&sel, 300);
        assert!(char_len(&context) <= 600);
        assert!(context.contains("near before  near after"));
        assert!(context.starts_with('x'));
        assert!(context.ends_with('y'));
    }

    #[test]
    fn short_page_is_trimmed_whole() {
        let sel = Fixed {
            before: Ok("  Plants use ".into()),
            after: " to grow.\n".into(),
        };
        assert_eq!(extract_context(&sel, 300), "Plants use  to grow.");
    }

    #[test]
    fn provider_failure_degrades_to_empty() {
        let sel = Fixed {
            before: Err(()),
            after: "after".into(),
        };
        assert_eq!(extract_context(&sel, 300), "");
    }
}
