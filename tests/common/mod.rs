//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::{Notify, oneshot};
use voice_ask::answer::{AnswerClient, Outcome};
use voice_ask::config::AnswerConfig;
use voice_ask::voice::{CaptureEvent, SpeechCapture, SpeechOutput};
use voice_ask::{Error, Result, SessionHandle, SessionState};

/// Recognizer stand-in; tests decide when and how a session ends
#[derive(Default)]
pub struct FakeCapture {
    pending: Mutex<Option<oneshot::Sender<CaptureEvent>>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: Mutex<Option<fn() -> Error>>,
}

impl FakeCapture {
    /// Make the next `start` fail with the given error
    pub fn fail_next_start(&self, make: fn() -> Error) {
        *self.fail_start.lock().unwrap() = Some(make);
    }

    /// Deliver the terminal event of the active session
    pub fn emit(&self, event: CaptureEvent) -> bool {
        self.pending
            .lock()
            .unwrap()
            .take()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl SpeechCapture for FakeCapture {
    fn start(&self) -> Result<oneshot::Receiver<CaptureEvent>> {
        if let Some(make) = self.fail_start.lock().unwrap().take() {
            return Err(make());
        }

        self.starts.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().take();
    }
}

/// Output stand-in recording everything it was asked to say
#[derive(Default)]
pub struct FakeOutput {
    spoken: Mutex<Vec<String>>,
}

impl FakeOutput {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechOutput for FakeOutput {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

/// Answer client returning a canned outcome, optionally held until released
pub struct FakeAnswers {
    outcome: Outcome,
    questions: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl FakeAnswers {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            questions: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every answer until `gate` is notified
    pub fn gated(outcome: Outcome, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(outcome)
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerClient for FakeAnswers {
    async fn ask(&self, question: &str) -> Outcome {
        self.questions.lock().unwrap().push(question.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

/// Wait until the session state satisfies `f`
pub async fn wait_for(
    session: &SessionHandle,
    f: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    let mut rx = session.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
        .await
        .expect("timed out waiting for session state")
        .expect("session controller stopped")
        .clone()
}

/// Spawn a question-answering backend on an ephemeral port
///
/// Replies with `status` and `body` to every `POST /ask`, recording the
/// request bodies it receives.
pub async fn spawn_backend(
    status: StatusCode,
    body: &'static str,
) -> (AnswerConfig, Arc<Mutex<Vec<serde_json::Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&received);

    let app = Router::new().route(
        "/ask",
        post(move |Json(request): Json<serde_json::Value>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(request);
                (status, [("content-type", "application/json")], body)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let config = AnswerConfig {
        endpoint: format!("http://{addr}/ask"),
        timeout: Some(Duration::from_secs(5)),
    };
    (config, received)
}

/// An endpoint on a port nothing listens on
pub fn unreachable_endpoint() -> AnswerConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    AnswerConfig {
        endpoint: format!("http://{addr}/ask"),
        timeout: Some(Duration::from_secs(5)),
    }
}
