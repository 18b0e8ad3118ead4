//! Spoken answers through TTS and the default speakers

use std::sync::Arc;

use tokio::sync::Mutex;

use super::playback::AudioPlayback;
use super::tts::TextToSpeech;
use super::SpeechOutput;
use crate::config::Config;
use crate::{Error, Result};

/// Speaks text via hosted TTS and local playback
///
/// Overlapping calls queue behind each other rather than talking over one
/// another.
#[derive(Clone)]
pub struct SpokenAnswers {
    tts: Arc<TextToSpeech>,
    queue: Arc<Mutex<()>>,
}

impl SpokenAnswers {
    /// Create the output adapter, verifying a speaker is present
    ///
    /// # Errors
    ///
    /// Returns `Error::Unsupported` if no output device can be opened
    pub fn new(tts: TextToSpeech) -> Result<Self> {
        AudioPlayback::new()?;

        Ok(Self {
            tts: Arc::new(tts),
            queue: Arc::new(Mutex::new(())),
        })
    }

    /// Build the output adapter from configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Unsupported` if the TTS key or speaker is missing
    pub fn from_config(config: &Config) -> Result<Self> {
        let voice = &config.voice;
        let tts = TextToSpeech::new(
            config.api_keys.openai.clone().unwrap_or_default(),
            voice.tts_model.clone(),
            voice.tts_voice.clone(),
            voice.tts_speed,
        )?
        .with_language(voice.language.clone());

        Self::new(tts)
    }

    /// Synthesize and play `text`, waiting until playback finishes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    pub async fn say(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        // Held across synthesis so answers play in the order requested
        let _turn = self.queue.lock().await;

        let audio = self.tts.synthesize(text).await?;
        tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&audio))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

impl SpeechOutput for SpokenAnswers {
    fn speak(&self, text: &str) {
        let speaker = self.clone();
        let text = text.to_string();

        tokio::spawn(async move {
            if let Err(e) = speaker.say(&text).await {
                tracing::warn!(error = %e, "failed to speak answer");
            }
        });
    }
}
