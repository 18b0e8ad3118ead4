//! Speech-to-text (STT) processing

use crate::config::SttBackend;
use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEEPGRAM_URL: &str = "https://api.deepgram.com/v1/listen";

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
    #[serde(default)]
    confidence: f64,
}

/// Transcribes a single utterance to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
    backend: SttBackend,
    base_url: String,
}

impl SpeechToText {
    /// Create a new STT instance for the given backend
    ///
    /// # Errors
    ///
    /// Returns `Error::Unsupported` if the backend's API key is missing
    pub fn new(
        backend: SttBackend,
        api_key: String,
        model: String,
        language: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            let name = match backend {
                SttBackend::Whisper => "OpenAI",
                SttBackend::Deepgram => "Deepgram",
            };
            return Err(Error::Unsupported(format!(
                "{name} API key required for speech recognition"
            )));
        }

        let base_url = match backend {
            SttBackend::Whisper => WHISPER_URL,
            SttBackend::Deepgram => DEEPGRAM_URL,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            language,
            backend,
            base_url: base_url.to_string(),
        })
    }

    /// Point the client at a different API URL (self-hosted or test servers)
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Configured recognition locale
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let text = match self.backend {
            SttBackend::Whisper => self.transcribe_whisper(audio).await?,
            SttBackend::Deepgram => self.transcribe_deepgram(audio).await?,
        };
        Ok(text.trim().to_string())
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", whisper_language(&self.language).to_string());

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Whisper request failed"))?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to parse response"))?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let response = self
            .client
            .post(&self.base_url)
            .query(&[
                ("model", self.model.as_str()),
                ("language", self.language.as_str()),
                ("punctuate", "true"),
            ])
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Deepgram request failed"))?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response
            .json()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to parse Deepgram response"))?;

        let transcript = best_alternative(&result).unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// Pick the highest-confidence alternative of the first channel
fn best_alternative(response: &DeepgramResponse) -> Option<String> {
    response
        .results
        .channels
        .first()?
        .alternatives
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|a| a.transcript.clone())
}

/// Whisper takes ISO-639-1 codes, so "en-US" becomes "en"
fn whisper_language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}
