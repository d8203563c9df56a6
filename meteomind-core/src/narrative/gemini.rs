use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    config::{Config, Credentials},
    icon::icon_url,
    model::{CurrentConditions, Narrative},
};

use super::{GenerationConfig, NarrativeError, NarrativeGenerator, build_prompt};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` client.
///
/// Every call is a fresh conversation containing only the prompt, so no
/// history is kept between lookups.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    generation: GenerationConfig,
    http: Client,
}

impl GeminiGenerator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.map(SecretString::from),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            generation: GenerationConfig::default(),
            http: Client::new(),
        }
    }

    pub fn from_config(credentials: &Credentials, config: &Config) -> Self {
        Self::new(credentials.gemini_api_key.clone())
            .with_base_url(config.gemini.base_url.clone())
            .with_model(config.gemini.model.clone())
            .with_generation(config.gemini.generation())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    async fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        let api_key = self.api_key.as_ref().ok_or(NarrativeError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: &self.generation,
        };

        debug!(%url, model = %self.model, "Sending prompt to Gemini");

        let res = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(NarrativeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| NarrativeError::Parse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiGenerator {
    #[instrument(skip_all, fields(city = %current.city))]
    async fn describe(&self, current: &CurrentConditions) -> Narrative {
        let prompt = build_prompt(current);

        match self.generate(&prompt).await {
            Ok(text) => Narrative::Generated {
                text,
                icon_url: icon_url(&current.icon),
            },
            Err(e) => {
                warn!(error = %e, "Narrative generation failed");
                Narrative::failed(e)
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
