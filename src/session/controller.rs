//! Session controller
//!
//! Runs as a single task that owns the [`SessionState`]. Toggles arrive over
//! a command channel; capture events and answer outcomes are awaited inside
//! the same `select!` loop, so at most one recognition session and one
//! answer request exist at any time.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::SessionState;
use crate::answer::{AnswerClient, Outcome, TRANSPORT_FAILURE};
use crate::voice::{CaptureEvent, SpeechCapture, SpeechOutput};
use crate::{Error, Result};

/// Shown when no speech recognizer could be set up
pub const UNSUPPORTED_NOTICE: &str = "Speech recognition is not supported on this machine. \
     Check the microphone and the STT API key.";

#[derive(Debug)]
enum Command {
    /// Acknowledged once the toggle has been applied to the state
    Toggle(oneshot::Sender<()>),
}

/// Handle for driving and observing a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Toggle between idle and listening
    ///
    /// Returns once the controller has applied the toggle, so a state read
    /// right after it reflects the new mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` if the controller has stopped
    pub async fn toggle(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::Toggle(ack_tx))
            .await
            .map_err(|_| Error::SessionClosed)?;
        ack_rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch the state for changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}

/// Sequences capture, the answer request and spoken output
pub struct SessionController {
    capture: Option<Arc<dyn SpeechCapture>>,
    output: Option<Arc<dyn SpeechOutput>>,
    answers: Arc<dyn AnswerClient>,
}

impl SessionController {
    /// Create a controller with no speech capabilities attached
    #[must_use]
    pub fn new(answers: Arc<dyn AnswerClient>) -> Self {
        Self {
            capture: None,
            output: None,
            answers,
        }
    }

    /// Attach a speech recognizer
    #[must_use]
    pub fn with_capture(mut self, capture: Arc<dyn SpeechCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Attach a speech synthesizer
    #[must_use]
    pub fn with_output(mut self, output: Arc<dyn SpeechOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Start the controller task
    ///
    /// The task ends once every [`SessionHandle`] has been dropped.
    #[must_use]
    pub fn spawn(self) -> (SessionHandle, JoinHandle<()>) {
        let initial = SessionState {
            notice: self
                .capture
                .is_none()
                .then(|| UNSUPPORTED_NOTICE.to_string()),
            ..SessionState::default()
        };

        let (state_tx, state_rx) = watch::channel(initial);
        let (command_tx, command_rx) = mpsc::channel(16);

        let actor = Actor {
            capture: self.capture,
            output: self.output,
            answers: self.answers,
            state: state_tx,
            pending_capture: None,
            pending_answer: None,
        };

        let task = tokio::spawn(actor.run(command_rx));

        (
            SessionHandle {
                commands: command_tx,
                state: state_rx,
            },
            task,
        )
    }
}

struct Actor {
    capture: Option<Arc<dyn SpeechCapture>>,
    output: Option<Arc<dyn SpeechOutput>>,
    answers: Arc<dyn AnswerClient>,
    state: watch::Sender<SessionState>,
    pending_capture: Option<oneshot::Receiver<CaptureEvent>>,
    pending_answer: Option<JoinHandle<Outcome>>,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::debug!("session controller started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Toggle(ack)) => {
                        self.toggle();
                        let _ = ack.send(());
                    }
                    None => break,
                },
                event = next_capture_event(&mut self.pending_capture) => {
                    self.pending_capture = None;
                    self.on_capture_event(event);
                }
                outcome = next_outcome(&mut self.pending_answer) => {
                    self.pending_answer = None;
                    self.on_outcome(outcome);
                }
            }
        }

        if self.pending_capture.take().is_some()
            && let Some(capture) = &self.capture
        {
            capture.stop();
        }

        tracing::debug!("session controller stopped");
    }

    fn toggle(&mut self) {
        let Some(capture) = self.capture.clone() else {
            tracing::warn!("toggle ignored: speech recognition unavailable");
            return;
        };

        if self.pending_answer.is_some() {
            tracing::debug!("toggle ignored while an answer is pending");
            return;
        }

        if self.pending_capture.take().is_some() {
            capture.stop();
            self.state.send_modify(|s| s.listening = false);
            tracing::info!("listening stopped before a transcript arrived");
            return;
        }

        match capture.start() {
            Ok(events) => {
                self.pending_capture = Some(events);
                self.state.send_modify(|s| {
                    s.listening = true;
                    s.answer.clear();
                });
                tracing::info!("listening");
            }
            Err(Error::Unsupported(reason)) => {
                tracing::error!(%reason, "speech recognition unsupported");
                self.state.send_modify(|s| {
                    s.notice = Some(UNSUPPORTED_NOTICE.to_string());
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start speech recognition");
            }
        }
    }

    fn on_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Transcript(text) if !text.trim().is_empty() => {
                tracing::info!(question = %text, "transcript ready");

                self.state.send_modify(|s| {
                    s.listening = false;
                    s.question.clone_from(&text);
                    s.loading = true;
                });

                let answers = Arc::clone(&self.answers);
                self.pending_answer = Some(tokio::spawn(async move { answers.ask(&text).await }));
            }
            CaptureEvent::Transcript(_) => {
                tracing::warn!("speech recognition returned an empty transcript");
                self.state.send_modify(|s| s.listening = false);
            }
            CaptureEvent::Failed(reason) => {
                tracing::warn!(%reason, "speech recognition error");
                self.state.send_modify(|s| s.listening = false);
            }
        }
    }

    fn on_outcome(&self, outcome: Outcome) {
        self.state.send_modify(|s| {
            s.loading = false;
            s.listening = false;
            outcome.text().clone_into(&mut s.answer);
        });

        if let (Outcome::Answer(text), Some(output)) = (&outcome, &self.output) {
            output.speak(text);
        }
    }
}

async fn next_capture_event(slot: &mut Option<oneshot::Receiver<CaptureEvent>>) -> CaptureEvent {
    match slot.as_mut() {
        Some(events) => events
            .await
            .unwrap_or_else(|_| CaptureEvent::Failed("aborted".to_string())),
        None => std::future::pending().await,
    }
}

async fn next_outcome(slot: &mut Option<JoinHandle<Outcome>>) -> Outcome {
    match slot.as_mut() {
        Some(request) => request.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "answer task failed");
            Outcome::Failure(TRANSPORT_FAILURE.to_string())
        }),
        None => std::future::pending().await,
    }
}
