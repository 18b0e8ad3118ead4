//! Configuration management for the voice assistant
//!
//! Values resolve in the order env > TOML file > default.

pub mod file;

use std::time::Duration;

use crate::{Error, Result};

/// Default question-answering endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/ask";

/// Default recognition and synthesis locale
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default port for the web surface
pub const DEFAULT_PORT: u16 = 3000;

/// Voice assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice capture and output configuration
    pub voice: VoiceConfig,

    /// Question-answering service configuration
    pub answer: AnswerConfig,

    /// Web surface configuration
    pub server: ServerConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone capture and spoken answers
    pub enabled: bool,

    /// BCP 47 locale used for recognition and synthesis (e.g. "en-US")
    pub language: String,

    /// Speech-to-text backend
    pub stt_backend: SttBackend,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: DEFAULT_LANGUAGE.to_string(),
            stt_backend: SttBackend::Whisper,
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Speech-to-text backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttBackend {
    /// `OpenAI` Whisper transcription API
    Whisper,
    /// Deepgram listen API
    Deepgram,
}

impl SttBackend {
    /// Parse a backend name, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns error if the name is not a known backend
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT backend: {other}"))),
        }
    }
}

/// Question-answering service configuration
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    /// Full URL the question is POSTed to
    pub endpoint: String,

    /// Request timeout; `None` leaves the HTTP client default in place
    pub timeout: Option<Duration>,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
        }
    }
}

/// Web surface configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (bound to localhost)
    pub port: u16,

    /// Label of the navigation link to the assistant view
    pub assistant_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            assistant_name: "Agent 03".to_string(),
        }
    }
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &self.openai.as_ref().map(|_| "<redacted>"))
            .field("deepgram", &self.deepgram.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        let fc = file::load_config_file();
        let config = Self::resolve(fc, |key| std::env::var(key).ok(), disable_voice)?;

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
        }

        Ok(config)
    }

    /// Merge a parsed config file with environment lookups
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn resolve<F>(fc: file::ConfigFile, env: F, disable_voice: bool) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let voice_defaults = VoiceConfig::default();

        let stt_backend = match env("VOICE_ASK_STT_PROVIDER").or(fc.voice.stt_provider) {
            Some(name) => SttBackend::parse(&name)?,
            None => voice_defaults.stt_backend,
        };
        let stt_model = env("VOICE_ASK_STT_MODEL")
            .or(fc.voice.stt_model)
            .unwrap_or_else(|| match stt_backend {
                SttBackend::Whisper => voice_defaults.stt_model.clone(),
                SttBackend::Deepgram => "nova-2".to_string(),
            });

        let tts_speed = fc.voice.tts_speed.unwrap_or(voice_defaults.tts_speed);
        if !(0.25..=4.0).contains(&tts_speed) {
            return Err(Error::Config(format!(
                "tts_speed must be between 0.25 and 4.0, got {tts_speed}"
            )));
        }

        let voice = VoiceConfig {
            enabled: !disable_voice && fc.voice.enabled.unwrap_or(voice_defaults.enabled),
            language: env("VOICE_ASK_LANG")
                .or(fc.voice.language)
                .unwrap_or(voice_defaults.language),
            stt_backend,
            stt_model,
            tts_model: env("VOICE_ASK_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(voice_defaults.tts_model),
            tts_voice: env("VOICE_ASK_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(voice_defaults.tts_voice),
            tts_speed,
        };

        let endpoint = env("VOICE_ASK_ENDPOINT")
            .or(fc.answer.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        validate_endpoint(&endpoint)?;
        let answer = AnswerConfig {
            endpoint,
            timeout: fc
                .answer
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            port: env("VOICE_ASK_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(server_defaults.port),
            assistant_name: fc
                .server
                .assistant_name
                .unwrap_or(server_defaults.assistant_name),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .filter(|k| !k.is_empty()),
            deepgram: env("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .filter(|k| !k.is_empty()),
        };

        Ok(Self {
            voice,
            answer,
            server,
            api_keys,
        })
    }

    /// Replace the answer endpoint, e.g. from a command-line flag
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not an http(s) URL
    pub fn set_endpoint(&mut self, endpoint: String) -> Result<()> {
        validate_endpoint(&endpoint)?;
        self.answer.endpoint = endpoint;
        Ok(())
    }
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "answer endpoint must be an http(s) URL: {endpoint}"
        )))
    }
}
