use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config::SpeechConfig;

use super::{SpeechError, SpeechOutcome, SpeechRecognizer, SpeechSynthesizer};

/// Longest text the translate TTS endpoint accepts per request.
const TTS_MAX_CHARS: usize = 100;
const SAMPLE_RATE: u32 = 16_000;

/// Text-to-speech through the Google Translate voice endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    url: String,
    http: Client,
}

impl GoogleTranslateTts {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.tts_url.clone())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, SpeechError> {
        let chunks = split_text(text, TTS_MAX_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            debug!(idx, total = %total, "Requesting TTS chunk");
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();

            let res = self
                .http
                .get(&self.url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            let status = res.status();
            if !status.is_success() {
                return Err(SpeechError::Service {
                    status: status.as_u16(),
                });
            }

            audio.extend_from_slice(&res.bytes().await?);
        }

        Ok(audio)
    }
}

/// Split on whitespace into chunks of at most `max` characters.
///
/// Words longer than `max` are cut mid-word.
fn split_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Records one utterance with an external command, then decodes it with the
/// Google speech endpoint.
#[derive(Debug, Clone)]
pub struct MicrophoneRecognizer {
    recorder_command: Vec<String>,
    url: String,
    key: Option<SecretString>,
    language: String,
    http: Client,
}

impl MicrophoneRecognizer {
    pub fn new(
        recorder_command: Vec<String>,
        url: impl Into<String>,
        key: Option<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            recorder_command,
            url: url.into(),
            key: key.map(SecretString::from),
            language: language.into(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(
            config.recorder_command.clone(),
            config.recognizer_url.clone(),
            config.recognizer_key.clone(),
            config.recognition_language.clone(),
        )
    }

    /// FLAC bytes, or `None` when nothing was captured within `timeout`.
    async fn record(&self, timeout: Duration) -> Result<Option<Vec<u8>>, SpeechError> {
        let (program, args) = self
            .recorder_command
            .split_first()
            .ok_or_else(|| SpeechError::Recorder("no recorder command configured".to_string()))?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Err(_) => {
                debug!(?timeout, "Listen window elapsed");
                Ok(None)
            }
            Ok(Err(e)) => Err(SpeechError::Recorder(format!("{program}: {e}"))),
            Ok(Ok(output)) if !output.status.success() => Err(SpeechError::Recorder(format!(
                "{program} exited with {}",
                output.status
            ))),
            Ok(Ok(output)) if output.stdout.is_empty() => Ok(None),
            Ok(Ok(output)) => Ok(Some(output.stdout)),
        }
    }

    async fn recognize(&self, flac: Vec<u8>) -> Result<Option<String>, SpeechError> {
        let mut query = vec![
            ("client", "chromium".to_string()),
            ("lang", self.language.clone()),
        ];
        if let Some(key) = &self.key {
            query.push(("key", key.expose_secret().to_string()));
        }

        let res = self
            .http
            .post(&self.url)
            .query(&query)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("audio/x-flac; rate={SAMPLE_RATE}"),
            )
            .body(flac)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(SpeechError::Service {
                status: status.as_u16(),
            });
        }

        let body = res.text().await?;
        Ok(parse_recognition(&body))
    }
}

#[async_trait]
impl SpeechRecognizer for MicrophoneRecognizer {
    #[instrument(skip(self))]
    async fn listen(&self, timeout: Duration) -> SpeechOutcome {
        let audio = match self.record(timeout).await {
            Ok(Some(audio)) => audio,
            Ok(None) => return SpeechOutcome::NoSpeech,
            Err(e) => {
                warn!(error = %e, "Audio capture failed");
                return SpeechOutcome::ServiceError(e.to_string());
            }
        };

        debug!(bytes = audio.len(), "Captured audio");

        match self.recognize(audio).await {
            Ok(Some(text)) => SpeechOutcome::Text(text),
            Ok(None) => SpeechOutcome::NoSpeech,
            Err(e) => {
                warn!(error = %e, "Speech recognition failed");
                SpeechOutcome::ServiceError(e.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecognitionLine {
    #[serde(default)]
    result: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternative: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: Option<String>,
}

/// The endpoint streams one JSON object per line; the first is usually an
/// empty `{"result":[]}`.
fn parse_recognition(body: &str) -> Option<String> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<RecognitionLine>(line).ok())
        .flat_map(|line| line.result)
        .flat_map(|result| result.alternative)
        .filter_map(|alt| alt.transcript)
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
}
