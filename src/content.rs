//! The content side: watches pointer releases, asks the background for an
//! explanation and drives the tooltip.
//!
//! Replies come back on a queue the owner drains with [`ContentScript::tick`]
//! (or awaits with [`ContentScript::next_reply`]), so the tooltip is only
//! ever touched from the content side's own loop.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::messaging::BackgroundHandle;
use crate::models::{ExplainRequest, Message, Scroll};
use crate::prefs::{ENABLED_KEY, PreferenceStore, StorageChange, load_enabled, resolve_enabled};
use crate::selection::{SelectionProvider, extract_context};
use crate::tooltip::{TooltipLayout, TooltipPresenter};
use crate::utils::char_len;

pub const LOADING_MESSAGE: &str = "Loading...";
pub const TOO_LONG_MESSAGE: &str = "Please select a word or short phrase.";
pub const COULD_NOT_EXPLAIN: &str = "Could not explain text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub max_chars: usize,
    pub context_chars: usize,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_chars: 120,
            context_chars: 300,
        }
    }
}

/// What a pointer release led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Watch {
    Disabled,
    Cleared,
    TooLong,
    Requested(ExplainRequest),
}

/// A reply on its way back to the tooltip it was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub generation: u64,
    pub text: String,
}

pub struct ContentScript {
    enabled: bool,
    limits: SelectionLimits,
    presenter: TooltipPresenter,
    background: BackgroundHandle,
    runtime: Handle,
    store: Arc<dyn PreferenceStore>,
    changes: broadcast::Receiver<StorageChange>,
    replies_tx: mpsc::UnboundedSender<Reply>,
    replies_rx: mpsc::UnboundedReceiver<Reply>,
}

impl ContentScript {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        background: BackgroundHandle,
        runtime: Handle,
        limits: SelectionLimits,
        layout: TooltipLayout,
    ) -> Self {
        let changes = store.subscribe();
        let enabled = load_enabled(store.as_ref());
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        info!(enabled, "content script loaded");
        Self {
            enabled,
            limits,
            presenter: TooltipPresenter::new(layout),
            background,
            runtime,
            store,
            changes,
            replies_tx,
            replies_rx,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn presenter(&self) -> &TooltipPresenter {
        &self.presenter
    }

    /// The text currently shown, if any.
    pub fn tooltip_text(&self) -> Option<&str> {
        self.presenter.current().map(|t| t.text.as_str())
    }

    /// Pointer released somewhere on the page.
    pub fn on_pointer_up(&mut self, selection: &dyn SelectionProvider, scroll: Scroll) -> Watch {
        if !self.enabled {
            return Watch::Disabled;
        }

        let text = selection.selected_text().trim().to_string();
        if text.is_empty() {
            self.presenter.remove();
            return Watch::Cleared;
        }
        if char_len(&text) > self.limits.max_chars {
            self.presenter.show(None, scroll, TOO_LONG_MESSAGE);
            return Watch::TooLong;
        }

        let anchor = selection.anchor_rect();
        let generation = self.presenter.show(anchor, scroll, LOADING_MESSAGE);
        let context = extract_context(selection, self.limits.context_chars);
        debug!(%text, %context, generation, "sending explain request");

        let message = Message::ExplainText {
            text: text.clone(),
            context: Some(context.clone()),
        };
        let background = self.background.clone();
        let replies = self.replies_tx.clone();
        self.runtime.spawn(async move {
            let text = match background.send_message(message).await {
                Ok(Some(response)) => match response.text() {
                    Some(explanation) => explanation.to_string(),
                    None => {
                        error!(?response, "reply has no explanation");
                        COULD_NOT_EXPLAIN.to_string()
                    }
                },
                Ok(None) => {
                    error!("no reply from background");
                    COULD_NOT_EXPLAIN.to_string()
                }
                Err(err) => {
                    error!("message send failed: {err}");
                    COULD_NOT_EXPLAIN.to_string()
                }
            };
            let _ = replies.send(Reply { generation, text });
        });

        Watch::Requested(ExplainRequest {
            text,
            context: Some(context),
        })
    }

    /// Pointer pressed at viewport cell `(x, y)`.
    pub fn on_pointer_down(&mut self, x: i32, y: i32, scroll: Scroll) {
        self.presenter.pointer_down(x + scroll.x, y + scroll.y);
    }

    pub fn on_storage_change(&mut self, change: &StorageChange) {
        if change.key != ENABLED_KEY {
            return;
        }
        self.enabled = resolve_enabled(change.new_value);
        info!(enabled = self.enabled, "preference changed");
        if !self.enabled {
            self.presenter.remove();
        }
    }

    pub fn apply_reply(&mut self, reply: &Reply) {
        self.presenter.update_for(reply.generation, &reply.text);
    }

    /// One turn of the content loop: arm the tooltip's outside-click
    /// listener and apply whatever arrived since the last turn, including
    /// preference writes made by another process.
    pub fn tick(&mut self) {
        self.presenter.tick();
        self.store.refresh();
        loop {
            match self.changes.try_recv() {
                Ok(change) => self.on_storage_change(&change),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "missed storage changes");
                }
                Err(_) => break,
            }
        }
        while let Ok(reply) = self.replies_rx.try_recv() {
            self.apply_reply(&reply);
        }
    }

    /// Waits for the next reply and applies it.
    pub async fn next_reply(&mut self) -> Option<Reply> {
        let reply = self.replies_rx.recv().await?;
        self.apply_reply(&reply);
        Some(reply)
    }

    /// Removes the tooltip, e.g. when the page goes away.
    pub fn dismiss(&mut self) {
        self.presenter.remove();
    }
}
