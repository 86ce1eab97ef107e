//! The background side: admits at most one explain call at a time and
//! proxies it to the explain service.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::messaging::{BackgroundHandle, Envelope};
use crate::models::{ExplainRequest, ExplainResponse, Message};
use crate::network::Explainer;

pub const WAIT_MESSAGE: &str = "Please wait for the previous explanation to finish.";
pub const FALLBACK_EXPLANATION: &str = "Sorry, I couldn't explain this clearly. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Busy,
}

/// Outcome of offering a message to the gate.
pub enum Admission {
    /// Not an explain request. Nobody gets a reply.
    Ignored,
    /// A call is already in flight. Carries the wait reply.
    Rejected(ExplainResponse),
    /// The gate is now busy until the ticket is settled or dropped.
    Accepted(Ticket),
}

pub struct RequestGate {
    state: Mutex<GateState>,
    explainer: Arc<dyn Explainer>,
}

impl RequestGate {
    pub fn new(explainer: Arc<dyn Explainer>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(GateState::Idle),
            explainer,
        })
    }

    pub fn state(&self) -> GateState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = GateState::Idle;
    }

    /// Decides synchronously whether `message` gets a backend call.
    pub fn admit(self: &Arc<Self>, message: Message) -> Admission {
        let Message::ExplainText { text, context } = message else {
            debug!("ignoring message that is not an explain request");
            return Admission::Ignored;
        };

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == GateState::Busy {
                info!("request already in flight, rejecting");
                return Admission::Rejected(ExplainResponse::new(WAIT_MESSAGE));
            }
            *state = GateState::Busy;
        }

        let request = ExplainRequest {
            text: text.trim().to_string(),
            context: context.filter(|c| !c.is_empty()),
        };
        debug!(text = %request.text, "request admitted");
        Admission::Accepted(Ticket {
            gate: Arc::clone(self),
            request,
        })
    }

    /// Admits and settles in one step.
    pub async fn handle(self: &Arc<Self>, message: Message) -> Option<ExplainResponse> {
        match self.admit(message) {
            Admission::Ignored => None,
            Admission::Rejected(reply) => Some(reply),
            Admission::Accepted(ticket) => Some(ticket.settle().await),
        }
    }
}

/// An admitted request. Dropping it returns the gate to idle.
pub struct Ticket {
    gate: Arc<RequestGate>,
    request: ExplainRequest,
}

impl Ticket {
    pub fn request(&self) -> &ExplainRequest {
        &self.request
    }

    /// Runs the backend call. Failures become the fallback explanation.
    pub async fn settle(self) -> ExplainResponse {
        match self.gate.explainer.explain(&self.request).await {
            Ok(response) => {
                debug!(?response, "backend replied");
                response
            }
            Err(err) => {
                error!("backend call failed: {err}");
                ExplainResponse::new(FALLBACK_EXPLANATION)
            }
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.gate.release();
        debug!("request completed");
    }
}

/// Starts the background loop on `runtime` and returns the content side's
/// handle to it.
pub fn spawn(runtime: &Handle, gate: Arc<RequestGate>, shutdown: CancellationToken) -> BackgroundHandle {
    let (handle, rx) = BackgroundHandle::channel();
    runtime.spawn(serve(gate, rx, shutdown));
    handle
}

/// Drains envelopes until cancelled or every handle is gone. Admission is
/// decided in arrival order; accepted calls run in their own task so later
/// arrivals see the busy state.
pub async fn serve(gate: Arc<RequestGate>, mut rx: mpsc::UnboundedReceiver<Envelope>, shutdown: CancellationToken) {
    info!("background ready");
    loop {
        let envelope = tokio::select! {
            _ = shutdown.cancelled() => break,
            envelope = rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };
        dispatch(&gate, envelope);
    }
    info!("background stopped");
}

fn dispatch(gate: &Arc<RequestGate>, envelope: Envelope) {
    let Envelope { message, reply } = envelope;
    match gate.admit(message) {
        Admission::Ignored => {}
        Admission::Rejected(response) => {
            let _ = reply.send(response);
        }
        Admission::Accepted(ticket) => {
            tokio::spawn(async move {
                let response = ticket.settle().await;
                if reply.send(response).is_err() {
                    debug!("sender went away before the reply");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ExplainError, HttpExplainer};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Answers "explained: <text>" once released.
    struct HeldExplainer {
        calls: AtomicUsize,
        release: Notify,
    }

    impl HeldExplainer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl Explainer for HeldExplainer {
        async fn explain(&self, request: &ExplainRequest) -> Result<ExplainResponse, ExplainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(ExplainResponse::new(format!("explained: {}", request.text)))
        }
    }

    fn explain(text: &str) -> Message {
        Message::ExplainText {
            text: text.into(),
            context: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn second_request_while_busy_is_rejected() {
        let explainer = HeldExplainer::new();
        let gate = RequestGate::new(explainer.clone());

        let Admission::Accepted(ticket) = gate.admit(explain("one")) else {
            panic!("first request should be admitted");
        };
        assert_eq!(gate.state(), GateState::Busy);
        let first = tokio::spawn(ticket.settle());

        let reply = gate.handle(explain("two")).await.unwrap();
        assert_eq!(reply.text(), Some(WAIT_MESSAGE));
        assert_eq!(gate.state(), GateState::Busy);

        explainer.release.notify_one();
        let reply = first.await.unwrap();
        assert_eq!(reply.text(), Some("explained: one"));
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(explainer.calls.load(Ordering::SeqCst), 1);

        explainer.release.notify_one();
        let reply = gate.handle(explain("three")).await.unwrap();
        assert_eq!(reply.text(), Some("explained: three"));
        assert_eq!(explainer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn admitted_request_is_trimmed_and_empty_context_dropped() {
        let gate = RequestGate::new(HeldExplainer::new());
        let Admission::Accepted(ticket) = gate.admit(explain("  word \n")) else {
            panic!("should be admitted");
        };
        assert_eq!(ticket.request(), &ExplainRequest { text: "word".into(), context: None });
        drop(ticket);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn unknown_messages_are_ignored_without_state_change() {
        let explainer = HeldExplainer::new();
        let gate = RequestGate::new(explainer.clone());
        assert!(gate.handle(Message::Unknown).await.is_none());
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(explainer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_yields_fallback_and_frees_the_gate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal detail"))
            .mount(&server)
            .await;
        let gate = RequestGate::new(Arc::new(HttpExplainer::new(&server.uri())));

        let reply = gate.handle(explain("x")).await.unwrap();
        assert_eq!(reply.text(), Some(FALLBACK_EXPLANATION));
        assert!(!reply.text().unwrap().contains("500"));
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn body_without_explanation_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"detail": "?"})))
            .mount(&server)
            .await;
        let gate = RequestGate::new(Arc::new(HttpExplainer::new(&server.uri())));

        let reply = gate.handle(explain("x")).await.unwrap();
        assert_eq!(reply.explanation, None);
    }

    #[tokio::test]
    async fn serve_rejects_overlap_with_a_single_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"explanation": "slow"}))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gate = RequestGate::new(Arc::new(HttpExplainer::new(&server.uri())));
        let shutdown = CancellationToken::new();
        let handle = spawn(&Handle::current(), gate.clone(), shutdown.clone());

        let first = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.send_message(explain("one")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = handle.send_message(explain("two")).await.unwrap().unwrap();
        assert_eq!(second.text(), Some(WAIT_MESSAGE));

        let first = first.await.unwrap().unwrap().unwrap();
        assert_eq!(first.text(), Some("slow"));
        assert_eq!(gate.state(), GateState::Idle);

        shutdown.cancel();
        server.verify().await;
    }

    #[tokio::test]
    async fn serve_drops_replies_for_ignored_messages() {
        let gate = RequestGate::new(HeldExplainer::new());
        let handle = spawn(&Handle::current(), gate, CancellationToken::new());
        assert!(handle.send_message(Message::Unknown).await.unwrap().is_none());
    }
}
