use std::time::{Duration, Instant};

use arboard::Clipboard;
use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use tracing::warn;

use crate::content::{ContentScript, LOADING_MESSAGE};
use crate::page::Page;
use crate::popup::Popup;

const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const WHEEL_ROWS: i32 = 3;

/// Everything the terminal host holds between events.
pub struct App {
    pub page: Page,
    pub content: ContentScript,
    pub popup: Popup,
    pub status: Option<String>,
    last_click: Option<(Instant, u16, u16)>,
    dragging: bool,
    quit: bool,
}

impl App {
    pub fn new(page: Page, content: ContentScript, popup: Popup) -> Self {
        Self {
            page,
            content,
            popup,
            status: None,
            last_click: None,
            dragging: false,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char('e') => self.toggle(),
            KeyCode::Char('c') => self.copy_tooltip(),
            KeyCode::Up | KeyCode::Char('k') => self.page.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.page.scroll_by(1),
            KeyCode::PageUp => self.page.scroll_by(-self.page.page_rows()),
            KeyCode::PageDown | KeyCode::Char(' ') => self.page.scroll_by(self.page.page_rows()),
            KeyCode::Home => self.page.scroll_by(-(self.page.row_count() as i32)),
            KeyCode::End => self.page.scroll_by(self.page.row_count() as i32),
            _ => {}
        }
    }

    fn toggle(&mut self) {
        match self.popup.toggle() {
            Ok(enabled) => {
                self.status = Some(if enabled { "QuickExplain on" } else { "QuickExplain off" }.to_string());
            }
            Err(err) => {
                warn!("could not change the preference: {err}");
                self.status = Some("Could not save preference".to_string());
            }
        }
    }

    /// Mouse events below the page (the footer) only count while a drag
    /// that started on the page is in progress.
    pub fn handle_mouse(&mut self, event: MouseEvent) {
        let last_row = self.page.page_rows().saturating_sub(1) as u16;
        if event.row > last_row && !self.dragging {
            return;
        }
        let col = event.column;
        let row = event.row.min(last_row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.dragging = true;
                self.content.on_pointer_down(i32::from(col), i32::from(row), self.page.scroll());
                if self.is_double_click(col, row) {
                    self.page.select_word_at(col, row);
                } else {
                    self.page.begin_drag(col, row);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => self.page.drag_to(col, row),
            MouseEventKind::Up(MouseButton::Left) => {
                self.dragging = false;
                self.content.on_pointer_up(&self.page, self.page.scroll());
            }
            MouseEventKind::ScrollUp => self.page.scroll_by(-WHEEL_ROWS),
            MouseEventKind::ScrollDown => self.page.scroll_by(WHEEL_ROWS),
            _ => {}
        }
    }

    fn is_double_click(&mut self, col: u16, row: u16) -> bool {
        let now = Instant::now();
        let double = matches!(
            self.last_click,
            Some((at, c, r)) if now.duration_since(at) < DOUBLE_CLICK && (c, r) == (col, row)
        );
        self.last_click = if double { None } else { Some((now, col, row)) };
        double
    }

    fn copy_tooltip(&mut self) {
        let Some(text) = self.content.tooltip_text() else {
            return;
        };
        if text == LOADING_MESSAGE {
            return;
        }
        let text = text.to_string();
        match Clipboard::new().and_then(|mut cb| cb.set_text(text)) {
            Ok(()) => self.status = Some("Copied to clipboard".to_string()),
            Err(err) => {
                warn!("clipboard unavailable: {err}");
                self.status = Some("Clipboard unavailable".to_string());
            }
        }
    }
}
