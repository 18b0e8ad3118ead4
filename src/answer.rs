//! Client for the remote question-answering service
//!
//! One request per question, no retries. Every reply is folded into an
//! [`Outcome`] so callers never deal with transport errors directly.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AnswerConfig;
use crate::Result;

/// Shown when the service cannot be reached or replies with garbage
pub const TRANSPORT_FAILURE: &str = "Error connecting to backend.";

/// Result of asking one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The service answered
    Answer(String),
    /// Application or transport failure, already formatted for display
    Failure(String),
}

impl Outcome {
    /// Text to show in the answer panel
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) | Self::Failure(text) => text,
        }
    }

    /// Short label for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Answer(_) => "answer",
            Self::Failure(_) => "failure",
        }
    }
}

/// Request body sent to the service
#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

/// Reply body from the service; exactly one field is expected
#[derive(Debug, Default, Deserialize)]
pub struct AskReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AskReply {
    /// Normalize the reply into an outcome
    ///
    /// A non-empty `answer` wins; otherwise a non-empty `error` is shown
    /// prefixed; a reply with neither counts as a transport failure.
    #[must_use]
    pub fn into_outcome(self) -> Outcome {
        match (self.answer, self.error) {
            (Some(answer), _) if !answer.is_empty() => Outcome::Answer(answer),
            (_, Some(error)) if !error.is_empty() => Outcome::Failure(format!("Error: {error}")),
            _ => Outcome::Failure(TRANSPORT_FAILURE.to_string()),
        }
    }
}

/// Question-answering capability
#[async_trait]
pub trait AnswerClient: Send + Sync {
    /// Ask one question and wait for the outcome
    async fn ask(&self, question: &str) -> Outcome;
}

/// [`AnswerClient`] speaking JSON over HTTP
pub struct HttpAnswerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnswerClient {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint questions are sent to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, question: &str) -> Result<AskReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { question })
            .send()
            .await?;

        // The service reports application errors with 4xx/5xx and an
        // `error` body, so the body is parsed whatever the status
        let status = response.status();
        let body = response.bytes().await?;
        let reply: AskReply = serde_json::from_slice(&body)?;

        if !status.is_success() {
            tracing::debug!(status = %status, "answer service returned error status");
        }

        Ok(reply)
    }
}

#[async_trait]
impl AnswerClient for HttpAnswerClient {
    async fn ask(&self, question: &str) -> Outcome {
        let started = Instant::now();

        let outcome = match self.request(question).await {
            Ok(reply) => reply.into_outcome(),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "answer request failed");
                Outcome::Failure(TRANSPORT_FAILURE.to_string())
            }
        };

        tracing::info!(
            question_chars = question.chars().count(),
            outcome = outcome.kind(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "answer received"
        );

        outcome
    }
}
