//! Voice Ask - push-to-talk voice assistant
//!
//! Listens for one spoken question, sends the transcript to a remote
//! question-answering service, shows the answer and speaks it back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Web surface (api)                     │
//! │      /  →  /assistant  ·  toggle  ·  /api/state       │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ SessionHandle
//! ┌──────────────────────────▼───────────────────────────┐
//! │              Session controller (session)             │
//! │        idle ⇄ listening  ·  loading  ·  turn          │
//! └───────┬────────────────────┬───────────────────┬─────┘
//!         │ SpeechCapture      │ AnswerClient      │ SpeechOutput
//! ┌───────▼───────┐   ┌────────▼────────┐   ┌──────▼───────┐
//! │ mic + STT     │   │ POST /ask JSON  │   │ TTS + speaker│
//! └───────────────┘   └─────────────────┘   └──────────────┘
//! ```

pub mod answer;
pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod voice;

pub use answer::{AnswerClient, HttpAnswerClient, Outcome};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{SessionController, SessionHandle, SessionState};
pub use voice::{CaptureEvent, SpeechCapture, SpeechOutput};
