//! The channel between the content side and the background.
//!
//! The two sides share no state: the content side holds a
//! [`BackgroundHandle`], the background drains [`Envelope`]s.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::models::{ExplainResponse, Message};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("background is not running")]
    Disconnected,
}

/// A message plus the one-shot slot its reply goes into.
#[derive(Debug)]
pub struct Envelope {
    pub message: Message,
    pub reply: oneshot::Sender<ExplainResponse>,
}

#[derive(Debug, Clone)]
pub struct BackgroundHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl BackgroundHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Sends `message` and waits for the reply.
    ///
    /// `Ok(None)` means the background took the message but never answered.
    pub async fn send_message(&self, message: Message) -> Result<Option<ExplainResponse>, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { message, reply })
            .map_err(|_| TransportError::Disconnected)?;
        Ok(rx.await.ok())
    }
}
