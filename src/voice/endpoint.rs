//! Single-utterance endpointing
//!
//! Decides when one spoken utterance has started and ended using a local
//! energy detector, so only that utterance is sent for transcription.

use super::capture::{SAMPLE_RATE, rms};

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum voiced audio for an utterance (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 3 / 10;

/// Trailing silence that ends an utterance (0.8 seconds)
const SILENCE_SAMPLES: usize = SAMPLE_RATE as usize * 8 / 10;

/// Give up if nobody speaks within this window (8 seconds)
const NO_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 8;

/// Hard cap on utterance length (30 seconds)
const MAX_UTTERANCE_SAMPLES: usize = SAMPLE_RATE as usize * 30;

/// Endpointing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for speech to begin
    Waiting,
    /// Speech in progress, accumulating
    Speaking,
    /// Utterance finished; take it with [`UtteranceDetector::take_utterance`]
    Complete,
    /// No speech arrived in time
    NoSpeech,
}

/// Detects the start and end of a single utterance
pub struct UtteranceDetector {
    state: EndpointState,
    threshold: f32,
    speech_buffer: Vec<f32>,
    voiced: usize,
    silence_counter: usize,
    waited: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    /// Create a detector with the default energy threshold
    #[must_use]
    pub const fn new() -> Self {
        Self::with_threshold(ENERGY_THRESHOLD)
    }

    /// Create a detector with a custom energy threshold
    #[must_use]
    pub const fn with_threshold(threshold: f32) -> Self {
        Self {
            state: EndpointState::Waiting,
            threshold,
            speech_buffer: Vec::new(),
            voiced: 0,
            silence_counter: 0,
            waited: 0,
        }
    }

    /// Feed a block of samples and return the resulting state
    ///
    /// `Complete` and `NoSpeech` are terminal until [`reset`](Self::reset).
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        if samples.is_empty() {
            return self.state;
        }

        let energy = rms(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            EndpointState::Waiting => {
                self.waited += samples.len();

                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.voiced = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                } else if self.waited > NO_SPEECH_SAMPLES {
                    tracing::debug!(waited = self.waited, "no speech detected");
                    self.state = EndpointState::NoSpeech;
                }
            }
            EndpointState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                tracing::trace!(
                    buffer_len = self.speech_buffer.len(),
                    voiced = self.voiced,
                    silence = self.silence_counter,
                    energy,
                    "speaking"
                );

                if self.speech_buffer.len() >= MAX_UTTERANCE_SAMPLES {
                    tracing::debug!("utterance reached maximum length");
                    self.state = EndpointState::Complete;
                } else if self.silence_counter > SILENCE_SAMPLES {
                    if self.voiced >= MIN_SPEECH_SAMPLES {
                        tracing::debug!(
                            samples = self.speech_buffer.len(),
                            "utterance complete"
                        );
                        self.state = EndpointState::Complete;
                    } else {
                        // Too short to be speech; keep waiting
                        tracing::trace!(voiced = self.voiced, "discarding blip");
                        self.state = EndpointState::Waiting;
                        self.waited += self.speech_buffer.len();
                        self.speech_buffer.clear();
                        self.voiced = 0;
                        self.silence_counter = 0;
                    }
                }
            }
            EndpointState::Complete | EndpointState::NoSpeech => {}
        }

        self.state
    }

    /// Take the accumulated utterance, clearing the buffer
    pub fn take_utterance(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Reset to waiting for a new utterance
    pub fn reset(&mut self) {
        self.state = EndpointState::Waiting;
        self.speech_buffer.clear();
        self.voiced = 0;
        self.silence_counter = 0;
        self.waited = 0;
    }
}
