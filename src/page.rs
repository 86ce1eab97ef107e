//! The document being read: text wrapped to the viewport width, a scroll
//! offset, and the user's selection as char offsets into the text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Rect, Scroll};
use crate::selection::{SelectionError, SelectionProvider};

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w'-]+").unwrap());

/// One visual row: chars `start..end` of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Row {
    start: usize,
    end: usize,
}

pub struct Page {
    chars: Vec<char>,
    rows: Vec<Row>,
    width: usize,
    height: usize,
    scroll: Scroll,
    /// Where the drag started and where it is now.
    selection: Option<(usize, usize)>,
}

impl Page {
    pub fn new(text: &str, width: u16, height: u16) -> Self {
        let mut page = Self {
            chars: text.chars().collect(),
            rows: Vec::new(),
            width: usize::from(width).max(1),
            height: usize::from(height).max(1),
            scroll: Scroll::default(),
            selection: None,
        };
        page.layout();
        page
    }

    fn layout(&mut self) {
        self.rows.clear();
        let mut start = 0;
        for (i, c) in self.chars.iter().enumerate() {
            if *c == '\n' {
                push_line(&mut self.rows, self.width, start, i);
                start = i + 1;
            }
        }
        push_line(&mut self.rows, self.width, start, self.chars.len());
    }

    /// Re-wraps for a new viewport size. The selection survives.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = usize::from(width).max(1);
        self.height = usize::from(height).max(1);
        self.layout();
        self.scroll_by(0);
    }

    pub fn scroll(&self) -> Scroll {
        self.scroll
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn scroll_by(&mut self, rows: i32) {
        let max = self.rows.len().saturating_sub(self.height) as i32;
        self.scroll.y = (self.scroll.y + rows).clamp(0, max);
    }

    pub fn page_rows(&self) -> i32 {
        self.height as i32
    }

    /// Visible rows as `(text, selected char range within the row)`.
    pub fn visible_rows(&self) -> Vec<(String, Option<(usize, usize)>)> {
        let range = self.range();
        self.rows
            .iter()
            .skip(self.scroll.y as usize)
            .take(self.height)
            .map(|row| {
                let text: String = self.chars[row.start..row.end].iter().collect();
                let highlight = range.and_then(|(s, e)| {
                    let from = s.max(row.start);
                    let to = e.min(row.end);
                    (from < to).then(|| (from - row.start, to - row.start))
                });
                (text, highlight)
            })
            .collect()
    }

    /// Char offset under viewport cell `(col, row)`.
    pub fn offset_at(&self, col: u16, row: u16) -> usize {
        let index = self.scroll.y as usize + usize::from(row);
        match self.rows.get(index) {
            Some(r) => (r.start + usize::from(col)).min(r.end),
            None => self.chars.len(),
        }
    }

    fn row_of(&self, offset: usize) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.start <= offset)
            .unwrap_or(0)
    }

    /// Pointer pressed: the selection collapses to the press point.
    pub fn begin_drag(&mut self, col: u16, row: u16) {
        let at = self.offset_at(col, row);
        self.selection = Some((at, at));
    }

    pub fn drag_to(&mut self, col: u16, row: u16) {
        let at = self.offset_at(col, row);
        if let Some((anchor, _)) = self.selection {
            self.selection = Some((anchor, at));
        }
    }

    /// Selects chars `start..end` directly.
    pub fn select(&mut self, start: usize, end: usize) {
        self.selection = Some((start, end));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Selects the word under the pointer, as a double-click does.
    pub fn select_word_at(&mut self, col: u16, row: u16) {
        let at = self.offset_at(col, row);
        let r = self.rows[self.row_of(at)];
        let line: String = self.chars[r.start..r.end].iter().collect();
        let col = at - r.start;
        for m in WORD_REGEX.find_iter(&line) {
            let from = line[..m.start()].chars().count();
            let to = from + m.as_str().chars().count();
            if from <= col && col < to {
                self.selection = Some((r.start + from, r.start + to));
                return;
            }
        }
        self.selection = Some((at, at));
    }

    /// Selection as an ordered `start..end`, if any.
    pub fn range(&self) -> Option<(usize, usize)> {
        self.selection.map(|(a, b)| (a.min(b), a.max(b)))
    }

    fn checked_range(&self) -> Result<(usize, usize), SelectionError> {
        let (start, end) = self.range().ok_or(SelectionError::NoSelection)?;
        let len = self.chars.len();
        if end > len {
            return Err(SelectionError::OutOfBounds { start, end, len });
        }
        Ok((start, end))
    }
}

/// Splits the logical line `start..end` into rows of at most `width` chars.
fn push_line(rows: &mut Vec<Row>, width: usize, start: usize, end: usize) {
    if start == end {
        rows.push(Row { start, end });
        return;
    }
    let mut at = start;
    while at < end {
        let stop = (at + width).min(end);
        rows.push(Row { start: at, end: stop });
        at = stop;
    }
}

impl SelectionProvider for Page {
    fn selected_text(&self) -> String {
        match self.checked_range() {
            Ok((start, end)) => self.chars[start..end].iter().collect(),
            Err(_) => String::new(),
        }
    }

    fn anchor_rect(&self) -> Option<Rect> {
        let (start, end) = self.checked_range().ok()?;
        let first = self.row_of(start);
        let last = if end > start { self.row_of(end - 1) } else { first };

        let mut left = i32::MAX;
        let mut right = 0;
        for index in first..=last {
            let r = self.rows[index];
            let from = start.max(r.start) - r.start;
            let to = end.min(r.end).max(start.max(r.start)) - r.start;
            left = left.min(from as i32);
            right = right.max(to as i32);
        }
        Some(Rect::new(
            left - self.scroll.x,
            first as i32 - self.scroll.y,
            (right - left).max(0),
            (last - first + 1) as i32,
        ))
    }

    fn text_before(&self) -> Result<String, SelectionError> {
        let (start, _) = self.checked_range()?;
        Ok(self.chars[..start].iter().collect())
    }

    fn text_after(&self) -> Result<String, SelectionError> {
        let (_, end) = self.checked_range()?;
        Ok(self.chars[end..].iter().collect())
    }
}
