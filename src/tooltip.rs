//! The floating explanation overlay.
//!
//! At most one tooltip exists. Its bounds are in page coordinates, so
//! scrolling moves it with the text it belongs to. The outside-click
//! listener is armed one tick after `show`, so the click that produced the
//! selection can't dismiss the tooltip it just opened.

use tracing::{debug, warn};

use crate::models::{Rect, Scroll};
use crate::utils::{char_len, wrap_text};

/// Placement rules for the tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooltipLayout {
    /// Space between the tooltip and the top of the anchor.
    pub gap: i32,
    /// Smallest allowed distance from the top of the viewport.
    pub min_top: i32,
    /// Widest the tooltip may grow, border included.
    pub max_width: u16,
}

impl Default for TooltipLayout {
    fn default() -> Self {
        Self {
            gap: 8,
            min_top: 8,
            max_width: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub text: String,
    pub lines: Vec<String>,
    pub bounds: Rect,
    /// Which `show` call created this tooltip.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listener {
    Detached,
    Pending,
    Armed,
}

pub struct TooltipPresenter {
    layout: TooltipLayout,
    current: Option<Tooltip>,
    listener: Listener,
    shown: u64,
}

impl TooltipPresenter {
    pub fn new(layout: TooltipLayout) -> Self {
        Self {
            layout,
            current: None,
            listener: Listener::Detached,
            shown: 0,
        }
    }

    pub fn current(&self) -> Option<&Tooltip> {
        self.current.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    pub fn listener_armed(&self) -> bool {
        self.listener == Listener::Armed
    }

    /// Replaces any tooltip with a new one above `anchor`. Returns the new
    /// tooltip's generation.
    pub fn show(&mut self, anchor: Option<Rect>, scroll: Scroll, text: &str) -> u64 {
        self.remove();
        self.shown += 1;

        let (lines, width, height) = self.measure(text);
        let (left, top) = match anchor {
            Some(rect) => (
                rect.left + scroll.x,
                rect.top + scroll.y - height - self.layout.gap,
            ),
            None => (scroll.x + self.layout.min_top, scroll.y + self.layout.min_top),
        };
        let bounds = Rect::new(left, top.max(scroll.y + self.layout.min_top), width, height);

        debug!(generation = self.shown, ?bounds, "tooltip shown");
        self.current = Some(Tooltip {
            text: text.to_string(),
            lines,
            bounds,
            generation: self.shown,
        });
        self.listener = Listener::Pending;
        self.shown
    }

    /// Changes the visible tooltip's text in place. Position is kept, size
    /// follows the text. Returns false when there is no tooltip.
    pub fn update(&mut self, text: &str) -> bool {
        let (lines, width, height) = self.measure(text);
        let Some(tooltip) = self.current.as_mut() else {
            warn!("tooltip is gone, cannot update it");
            return false;
        };
        tooltip.text = text.to_string();
        tooltip.lines = lines;
        tooltip.bounds.width = width;
        tooltip.bounds.height = height;
        true
    }

    /// Like [`update`](Self::update), but only if the visible tooltip is the
    /// one created by `generation`.
    pub fn update_for(&mut self, generation: u64, text: &str) -> bool {
        match self.current.as_ref() {
            Some(tooltip) if tooltip.generation != generation => {
                debug!(generation, current = tooltip.generation, "discarding stale reply");
                false
            }
            _ => self.update(text),
        }
    }

    /// Drops the tooltip and detaches the listener. Safe to call repeatedly.
    pub fn remove(&mut self) {
        if self.current.take().is_some() {
            debug!("tooltip removed");
        }
        self.listener = Listener::Detached;
    }

    /// Next turn of the event loop: a pending listener becomes live.
    pub fn tick(&mut self) {
        if self.listener == Listener::Pending {
            self.listener = Listener::Armed;
        }
    }

    /// Pointer pressed at page coordinates `(x, y)`. Removes the tooltip when
    /// the press lands outside it. Returns true if it was removed.
    pub fn pointer_down(&mut self, x: i32, y: i32) -> bool {
        if self.listener != Listener::Armed {
            return false;
        }
        match &self.current {
            Some(tooltip) if !tooltip.bounds.contains(x, y) => {
                self.remove();
                true
            }
            _ => false,
        }
    }

    fn measure(&self, text: &str) -> (Vec<String>, i32, i32) {
        let inner = usize::from(self.layout.max_width.saturating_sub(2)).max(1);
        let lines = wrap_text(text, inner);
        let widest = lines.iter().map(|l| char_len(l)).max().unwrap_or(0).max(1);
        let width = widest as i32 + 2;
        let height = lines.len() as i32 + 2;
        (lines, width, height)
    }
}

impl Default for TooltipPresenter {
    fn default() -> Self {
        Self::new(TooltipLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presenter() -> TooltipPresenter {
        TooltipPresenter::default()
    }

    #[test]
    fn shows_above_the_anchor() {
        let mut p = presenter();
        p.show(Some(Rect::new(40, 100, 14, 1)), Scroll::default(), "Loading...");
        let t = p.current().unwrap();
        assert_eq!(t.text, "Loading...");
        // 1 line + border = 3 tall, 8 gap above top 100
        assert_eq!(t.bounds, Rect::new(40, 100 - 3 - 8, 12, 3));
    }

    #[test]
    fn adds_scroll_offsets() {
        let mut p = presenter();
        p.show(Some(Rect::new(5, 50, 3, 1)), Scroll { x: 2, y: 30 }, "hi");
        let b = p.current().unwrap().bounds;
        assert_eq!((b.left, b.top), (7, 50 + 30 - 3 - 8));
    }

    #[test]
    fn clamps_to_min_top() {
        let mut p = presenter();
        p.show(Some(Rect::new(0, 2, 3, 1)), Scroll::default(), "hi");
        assert_eq!(p.current().unwrap().bounds.top, 8);

        let mut p = TooltipPresenter::new(TooltipLayout { gap: 1, min_top: 1, max_width: 40 });
        p.show(Some(Rect::new(0, 1, 3, 1)), Scroll::default(), "hi");
        assert_eq!(p.current().unwrap().bounds.top, 1);
    }

    #[test]
    fn without_anchor_sits_at_the_viewport_corner() {
        let mut p = presenter();
        let scroll = Scroll { x: 3, y: 400 };
        p.show(None, scroll, "Please select a word or short phrase.");
        let b = p.current().unwrap().bounds;
        assert_eq!((b.left, b.top), (3 + 8, 400 + 8));
        assert!(b.top - scroll.y >= 8);
    }

    #[test]
    fn anchor_near_viewport_top_stays_visible_when_scrolled() {
        let mut p = TooltipPresenter::new(TooltipLayout { gap: 1, min_top: 1, max_width: 40 });
        let scroll = Scroll { x: 0, y: 10 };
        p.show(Some(Rect::new(0, 0, 5, 1)), scroll, "Loading...");
        let b = p.current().unwrap().bounds;
        assert_eq!(b.top, 11);
        assert!(b.top - scroll.y >= 1);

        let mut p = presenter();
        let scroll = Scroll { x: 0, y: 250 };
        p.show(Some(Rect::new(4, 5, 5, 1)), scroll, "hi");
        assert_eq!(p.current().unwrap().bounds.top - scroll.y, 8);
    }

    #[test]
    fn show_replaces_the_previous_tooltip() {
        let mut p = presenter();
        let first = p.show(None, Scroll::default(), "one");
        let second = p.show(None, Scroll::default(), "two");
        assert_ne!(first, second);
        let t = p.current().unwrap();
        assert_eq!(t.text, "two");
        assert_eq!(t.generation, second);
    }

    #[test]
    fn long_text_wraps_within_max_width() {
        let mut p = TooltipPresenter::new(TooltipLayout { gap: 1, min_top: 1, max_width: 12 });
        p.show(None, Scroll::default(), "The process plants use to convert light");
        let t = p.current().unwrap();
        assert!(t.bounds.width <= 12);
        assert_eq!(t.bounds.height, t.lines.len() as i32 + 2);
        assert!(t.lines.len() > 1);
    }

    #[test]
    fn update_changes_text_and_keeps_position() {
        let mut p = presenter();
        p.show(Some(Rect::new(10, 100, 4, 1)), Scroll::default(), "Loading...");
        let before = p.current().unwrap().bounds;
        assert!(p.update("A much longer explanation text"));
        let t = p.current().unwrap();
        assert_eq!(t.text, "A much longer explanation text");
        assert_eq!((t.bounds.left, t.bounds.top), (before.left, before.top));
    }

    #[test]
    fn update_without_tooltip_is_a_no_op() {
        let mut p = presenter();
        assert!(!p.update("late"));
        assert!(p.current().is_none());
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut p = presenter();
        let old = p.show(None, Scroll::default(), "Loading...");
        let new = p.show(None, Scroll::default(), "Loading...");
        assert!(!p.update_for(old, "old answer"));
        assert_eq!(p.current().unwrap().text, "Loading...");
        assert!(p.update_for(new, "new answer"));
        assert_eq!(p.current().unwrap().text, "new answer");
    }

    #[test]
    fn remove_is_idempotent() {
        let mut p = presenter();
        p.show(None, Scroll::default(), "x");
        p.remove();
        p.remove();
        assert!(!p.is_visible());
        assert!(!p.listener_armed());
    }

    #[test]
    fn outside_click_needs_a_tick_to_arm() {
        let mut p = presenter();
        p.show(Some(Rect::new(10, 100, 4, 1)), Scroll::default(), "hello");
        assert!(!p.pointer_down(0, 0));
        assert!(p.is_visible());

        p.tick();
        assert!(p.listener_armed());
        let b = p.current().unwrap().bounds;
        assert!(!p.pointer_down(b.left, b.top));
        assert!(p.is_visible());
        assert!(p.pointer_down(0, 0));
        assert!(!p.is_visible());
        assert!(!p.listener_armed());
    }
}
