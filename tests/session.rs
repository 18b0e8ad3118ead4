//! Session controller tests
//!
//! Drive full turns with fake speech capabilities; no audio hardware needed.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::sync::Notify;
use voice_ask::answer::{HttpAnswerClient, Outcome, TRANSPORT_FAILURE};
use voice_ask::session::UNSUPPORTED_NOTICE;
use voice_ask::voice::CaptureEvent;
use voice_ask::{Error, SessionController, SessionHandle};

mod common;
use common::{FakeAnswers, FakeCapture, FakeOutput, spawn_backend, unreachable_endpoint, wait_for};

struct Harness {
    session: SessionHandle,
    capture: Arc<FakeCapture>,
    output: Arc<FakeOutput>,
}

fn start(answers: Arc<dyn voice_ask::AnswerClient>) -> Harness {
    let capture = Arc::new(FakeCapture::default());
    let output = Arc::new(FakeOutput::default());

    let (session, _task) = SessionController::new(answers)
        .with_capture(capture.clone())
        .with_output(output.clone())
        .spawn();

    Harness {
        session,
        capture,
        output,
    }
}

/// Toggle on and wait until the controller is listening
async fn begin_turn(h: &Harness) {
    h.session.toggle().await.unwrap();
    wait_for(&h.session, |s| s.listening).await;
}

#[tokio::test]
async fn test_initial_state() {
    let h = start(Arc::new(FakeAnswers::new(Outcome::Answer("unused".to_string()))));
    let state = h.session.state();

    assert!(!state.listening);
    assert!(!state.loading);
    assert!(state.question.is_empty());
    assert!(state.answer.is_empty());
    assert!(state.notice.is_none());
}

#[tokio::test]
async fn test_toggle_returns_after_state_change() {
    let h = start(Arc::new(FakeAnswers::new(Outcome::Answer("unused".to_string()))));

    h.session.toggle().await.unwrap();
    assert!(h.session.state().listening);
    assert_eq!(h.capture.starts(), 1);

    h.session.toggle().await.unwrap();
    assert!(h.session.state().is_idle());
    assert_eq!(h.capture.stops(), 1);
}

#[tokio::test]
async fn test_answer_is_shown_and_spoken() {
    let answers = Arc::new(FakeAnswers::new(Outcome::Answer("Paris".to_string())));
    let h = start(answers.clone());

    begin_turn(&h).await;
    assert!(h.capture.emit(CaptureEvent::Transcript(
        "What is the capital of France?".to_string()
    )));

    let state = wait_for(&h.session, |s| s.answer == "Paris").await;
    assert_eq!(state.question, "What is the capital of France?");
    assert!(!state.loading);
    assert!(!state.listening);
    assert_eq!(answers.questions(), vec!["What is the capital of France?"]);
    assert_eq!(h.output.spoken(), vec!["Paris"]);
}

#[tokio::test]
async fn test_application_error_is_not_spoken() {
    let h = start(Arc::new(FakeAnswers::new(Outcome::Failure(
        "Error: no model available".to_string(),
    ))));

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("hello".to_string()));

    let state = wait_for(&h.session, |s| !s.answer.is_empty()).await;
    assert_eq!(state.answer, "Error: no model available");
    assert!(state.is_idle());
    assert!(h.output.spoken().is_empty());
}

#[tokio::test]
async fn test_loading_raised_while_answer_pending() {
    let gate = Arc::new(Notify::new());
    let h = start(Arc::new(FakeAnswers::gated(
        Outcome::Answer("42".to_string()),
        gate.clone(),
    )));

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("meaning of life".to_string()));

    let state = wait_for(&h.session, |s| s.loading).await;
    assert!(!state.listening);
    assert_eq!(state.question, "meaning of life");
    assert!(state.answer.is_empty());

    gate.notify_one();
    let state = wait_for(&h.session, |s| !s.loading).await;
    assert_eq!(state.answer, "42");
    assert!(state.is_idle());
}

#[tokio::test]
async fn test_toggle_ignored_while_loading() {
    let gate = Arc::new(Notify::new());
    let answers = Arc::new(FakeAnswers::gated(
        Outcome::Answer("done".to_string()),
        gate.clone(),
    ));
    let h = start(answers.clone());

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("first".to_string()));
    wait_for(&h.session, |s| s.loading).await;

    h.session.toggle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.capture.starts(), 1);
    assert!(!h.session.state().listening);

    gate.notify_one();
    wait_for(&h.session, |s| s.answer == "done").await;
    assert_eq!(answers.questions().len(), 1);
}

#[tokio::test]
async fn test_stop_before_transcript_makes_no_request() {
    let answers = Arc::new(FakeAnswers::new(Outcome::Answer("unused".to_string())));
    let h = start(answers.clone());

    begin_turn(&h).await;
    h.session.toggle().await.unwrap();

    let state = wait_for(&h.session, |s| !s.listening).await;
    assert!(state.is_idle());
    assert_eq!(h.capture.stops(), 1);

    // The stopped session cannot deliver anything any more
    assert!(!h.capture.emit(CaptureEvent::Transcript("late".to_string())));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(answers.questions().is_empty());
    assert!(h.session.state().question.is_empty());
}

#[tokio::test]
async fn test_recognition_error_returns_to_idle() {
    let answers = Arc::new(FakeAnswers::new(Outcome::Answer("Paris".to_string())));
    let h = start(answers.clone());

    // Complete one turn so there is something on screen
    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("capital of France".to_string()));
    wait_for(&h.session, |s| s.answer == "Paris").await;

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Failed("no-speech".to_string()));

    let state = wait_for(&h.session, |s| !s.listening).await;
    assert!(state.is_idle());
    assert_eq!(state.question, "capital of France");
    assert!(state.answer.is_empty());
    assert_eq!(answers.questions().len(), 1);
}

#[tokio::test]
async fn test_new_turn_clears_previous_answer() {
    let h = start(Arc::new(FakeAnswers::new(Outcome::Answer("Paris".to_string()))));

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("capital of France".to_string()));
    wait_for(&h.session, |s| s.answer == "Paris").await;

    h.session.toggle().await.unwrap();
    let state = wait_for(&h.session, |s| s.listening).await;
    assert!(state.answer.is_empty());
    assert_eq!(state.question, "capital of France");
}

#[tokio::test]
async fn test_empty_transcript_is_treated_as_recognition_error() {
    let answers = Arc::new(FakeAnswers::new(Outcome::Answer("unused".to_string())));
    let h = start(answers.clone());

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("   ".to_string()));

    let state = wait_for(&h.session, |s| !s.listening).await;
    assert!(state.is_idle());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(answers.questions().is_empty());
}

#[tokio::test]
async fn test_start_failure_stays_idle() {
    let h = start(Arc::new(FakeAnswers::new(Outcome::Answer("unused".to_string()))));

    h.capture
        .fail_next_start(|| Error::Audio("device busy".to_string()));
    h.session.toggle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.session.state().is_idle());
    assert!(h.session.state().notice.is_none());

    // Recovers on the next toggle
    begin_turn(&h).await;
}

#[tokio::test]
async fn test_unsupported_start_sets_notice() {
    let h = start(Arc::new(FakeAnswers::new(Outcome::Answer("unused".to_string()))));

    h.capture
        .fail_next_start(|| Error::Unsupported("no input device available".to_string()));
    h.session.toggle().await.unwrap();

    let state = wait_for(&h.session, |s| s.notice.is_some()).await;
    assert_eq!(state.notice.as_deref(), Some(UNSUPPORTED_NOTICE));
    assert!(state.is_idle());
}

#[tokio::test]
async fn test_without_capture_toggle_is_ignored() {
    let answers = Arc::new(FakeAnswers::new(Outcome::Answer("unused".to_string())));
    let (session, _task) = SessionController::new(answers.clone()).spawn();

    assert_eq!(session.state().notice.as_deref(), Some(UNSUPPORTED_NOTICE));

    session.toggle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.state().is_idle());
    assert!(answers.questions().is_empty());
}

#[tokio::test]
async fn test_without_output_answer_is_still_shown() {
    let capture = Arc::new(FakeCapture::default());
    let (session, _task) =
        SessionController::new(Arc::new(FakeAnswers::new(Outcome::Answer("Paris".to_string()))))
            .with_capture(capture.clone())
            .spawn();

    session.toggle().await.unwrap();
    wait_for(&session, |s| s.listening).await;
    capture.emit(CaptureEvent::Transcript("capital of France".to_string()));

    let state = wait_for(&session, |s| s.answer == "Paris").await;
    assert!(state.is_idle());
}

#[tokio::test]
async fn test_controller_stops_when_handles_dropped() {
    let capture = Arc::new(FakeCapture::default());
    let (session, task) =
        SessionController::new(Arc::new(FakeAnswers::new(Outcome::Answer("x".to_string()))))
            .with_capture(capture.clone())
            .spawn();

    session.toggle().await.unwrap();
    wait_for(&session, |s| s.listening).await;
    drop(session);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(capture.stops(), 1);
}

#[tokio::test]
async fn test_full_turn_over_http() {
    let (config, received) = spawn_backend(StatusCode::OK, r#"{"answer":"Paris"}"#).await;
    let h = start(Arc::new(HttpAnswerClient::new(&config).unwrap()));

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript(
        "What is the capital of France?".to_string(),
    ));

    let state = wait_for(&h.session, |s| !s.answer.is_empty()).await;
    assert_eq!(state.answer, "Paris");
    assert!(state.is_idle());
    assert_eq!(h.output.spoken(), vec!["Paris"]);
    assert_eq!(
        received.lock().unwrap().as_slice(),
        &[serde_json::json!({ "question": "What is the capital of France?" })]
    );
}

#[tokio::test]
async fn test_backend_error_over_http() {
    let (config, _) = spawn_backend(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"no model available"}"#,
    )
    .await;
    let h = start(Arc::new(HttpAnswerClient::new(&config).unwrap()));

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("anything".to_string()));

    let state = wait_for(&h.session, |s| !s.answer.is_empty()).await;
    assert_eq!(state.answer, "Error: no model available");
    assert!(state.is_idle());
    assert!(h.output.spoken().is_empty());
}

#[tokio::test]
async fn test_connection_refused_over_http() {
    let h = start(Arc::new(HttpAnswerClient::new(&unreachable_endpoint()).unwrap()));

    begin_turn(&h).await;
    h.capture.emit(CaptureEvent::Transcript("anything".to_string()));

    let state = wait_for(&h.session, |s| !s.answer.is_empty()).await;
    assert_eq!(state.answer, TRANSPORT_FAILURE);
    assert!(state.is_idle());
    assert!(h.output.spoken().is_empty());
}
