//! Speech input and output collaborators.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod google;

pub use google::{GoogleTranslateTts, MicrophoneRecognizer};

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("recorder failed: {0}")]
    Recorder(String),

    #[error("speech service request failed: {0}")]
    Request(reqwest::Error),

    #[error("speech service returned HTTP {status}")]
    Service { status: u16 },

    #[error("nothing to synthesize")]
    EmptyText,
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        // Both the recognizer key and the spoken text end up in the URL.
        Self::Request(err.without_url())
    }
}

/// Result of one bounded listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Text(String),
    /// Silence, timeout, or audio the service could not understand.
    NoSpeech,
    ServiceError(String),
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Block until one utterance is captured and decoded, or `timeout` passes.
    async fn listen(&self, timeout: Duration) -> SpeechOutcome;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// MP3 audio for `text` spoken in `language` (e.g. `tr`).
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, SpeechError>;
}
