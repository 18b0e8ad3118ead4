//! Voice processing module
//!
//! The session controller only sees two capabilities: [`SpeechCapture`]
//! (one utterance in, one transcript out) and [`SpeechOutput`]
//! (fire-and-forget speech). The concrete adapters here implement them with
//! the local microphone and speakers plus hosted STT/TTS APIs.

mod capture;
mod endpoint;
mod playback;
mod recognizer;
mod speaker;
mod stt;
mod tts;

use tokio::sync::oneshot;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use endpoint::{EndpointState, UtteranceDetector};
pub use playback::{AudioPlayback, decode_mp3};
pub use recognizer::MicrophoneRecognizer;
pub use speaker::SpokenAnswers;
pub use stt::SpeechToText;
pub use tts::TextToSpeech;

use crate::Result;

/// Terminal event of a recognition session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Best transcript of the single utterance
    Transcript(String),
    /// Recognition failed (e.g. "no-speech", "network: ...")
    Failed(String),
}

/// Speech-to-text capability
///
/// Each started session resolves its receiver with exactly one
/// [`CaptureEvent`], unless it was stopped first.
pub trait SpeechCapture: Send + Sync {
    /// Begin listening for a single utterance
    ///
    /// # Errors
    ///
    /// Returns error if recognition cannot start (device busy, already active)
    fn start(&self) -> Result<oneshot::Receiver<CaptureEvent>>;

    /// Stop the active session early; no-op when idle
    fn stop(&self);
}

/// Text-to-speech capability
pub trait SpeechOutput: Send + Sync {
    /// Speak `text` without waiting for playback; failures are only logged
    fn speak(&self, text: &str);
}
