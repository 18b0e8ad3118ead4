//! Microphone-backed speech recognizer
//!
//! Audio is recorded on a dedicated thread (cpal streams are not `Send`)
//! until the endpointer sees a complete utterance, then the utterance is
//! transcribed on the async runtime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::endpoint::{EndpointState, UtteranceDetector};
use super::stt::SpeechToText;
use super::{CaptureEvent, SpeechCapture};
use crate::config::{Config, SttBackend};
use crate::{Error, Result};

/// How often the capture thread drains the microphone buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What the capture thread hands back
#[derive(Debug)]
enum Recording {
    Utterance(Vec<f32>),
    Failed(String),
    Cancelled,
}

struct ActiveSession {
    id: u64,
    cancel: Arc<AtomicBool>,
}

/// Single-utterance recognizer using the default microphone
pub struct MicrophoneRecognizer {
    stt: Arc<SpeechToText>,
    active: Arc<Mutex<Option<ActiveSession>>>,
    next_id: AtomicU64,
}

impl MicrophoneRecognizer {
    /// Create a recognizer, verifying a microphone is present
    ///
    /// # Errors
    ///
    /// Returns `Error::Unsupported` if no microphone can be opened
    pub fn new(stt: SpeechToText) -> Result<Self> {
        AudioCapture::probe()?;

        tracing::info!(language = stt.language(), "speech recognizer ready");

        Ok(Self {
            stt: Arc::new(stt),
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        })
    }

    /// Build the recognizer from configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Unsupported` if the STT key or microphone is missing
    pub fn from_config(config: &Config) -> Result<Self> {
        let voice = &config.voice;
        let key = match voice.stt_backend {
            SttBackend::Whisper => config.api_keys.openai.clone(),
            SttBackend::Deepgram => config.api_keys.deepgram.clone(),
        }
        .unwrap_or_default();

        let stt = SpeechToText::new(
            voice.stt_backend,
            key,
            voice.stt_model.clone(),
            voice.language.clone(),
        )?;

        Self::new(stt)
    }
}

impl SpeechCapture for MicrophoneRecognizer {
    fn start(&self) -> Result<oneshot::Receiver<CaptureEvent>> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| Error::Audio("recognizer state poisoned".to_string()))?;

        if active.is_some() {
            return Err(Error::Audio("recognition already active".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = Arc::new(AtomicBool::new(false));

        let (recording_tx, recording_rx) = oneshot::channel();
        let thread_cancel = Arc::clone(&cancel);
        std::thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || {
                let recording = record_utterance(&thread_cancel);
                let _ = recording_tx.send(recording);
            })?;

        *active = Some(ActiveSession { id, cancel });
        drop(active);

        tracing::info!(session = id, "recognition started");

        let (event_tx, event_rx) = oneshot::channel();
        let stt = Arc::clone(&self.stt);
        let slot = Arc::clone(&self.active);

        tokio::spawn(async move {
            let recording = recording_rx.await.unwrap_or(Recording::Cancelled);
            let event = resolve_recording(&stt, recording).await;

            if let Ok(mut active) = slot.lock()
                && active.as_ref().is_some_and(|a| a.id == id)
            {
                *active = None;
            }

            match event {
                Some(event) => {
                    if event_tx.send(event).is_err() {
                        tracing::debug!(session = id, "recognition result discarded");
                    }
                }
                None => tracing::debug!(session = id, "recognition cancelled"),
            }
        });

        Ok(event_rx)
    }

    fn stop(&self) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };

        if let Some(session) = active.take() {
            session.cancel.store(true, Ordering::Release);
            tracing::info!(session = session.id, "recognition stopped");
        }
    }
}

/// Record from the microphone until one utterance is complete
fn record_utterance(cancel: &AtomicBool) -> Recording {
    let mut capture = match AudioCapture::new() {
        Ok(capture) => capture,
        Err(e) => return Recording::Failed(format!("audio-capture: {e}")),
    };

    if let Err(e) = capture.start() {
        return Recording::Failed(format!("audio-capture: {e}"));
    }

    let mut detector = UtteranceDetector::new();

    loop {
        if cancel.load(Ordering::Acquire) {
            return Recording::Cancelled;
        }

        std::thread::sleep(POLL_INTERVAL);

        match detector.process(&capture.take_buffer()) {
            EndpointState::Complete => return Recording::Utterance(detector.take_utterance()),
            EndpointState::NoSpeech => return Recording::Failed("no-speech".to_string()),
            EndpointState::Waiting | EndpointState::Speaking => {}
        }
    }
}

/// Turn a finished recording into the session's terminal event
async fn resolve_recording(stt: &SpeechToText, recording: Recording) -> Option<CaptureEvent> {
    let samples = match recording {
        Recording::Utterance(samples) => samples,
        Recording::Failed(reason) => return Some(CaptureEvent::Failed(reason)),
        Recording::Cancelled => return None,
    };

    let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
        Ok(wav) => wav,
        Err(e) => return Some(CaptureEvent::Failed(format!("audio-capture: {e}"))),
    };

    match stt.transcribe(&wav).await {
        Ok(text) if text.is_empty() => Some(CaptureEvent::Failed("no-match".to_string())),
        Ok(text) => Some(CaptureEvent::Transcript(text)),
        Err(e) => Some(CaptureEvent::Failed(format!("network: {e}"))),
    }
}
