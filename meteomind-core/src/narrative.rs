//! Natural-language description of the current conditions.
//!
//! The prompt is fixed; judging whether the weather is severe enough to warn
//! about is left to the model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{model::CurrentConditions, model::Narrative, units::kelvin_to_celsius};

pub mod gemini;

pub use gemini::GeminiGenerator;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("no Gemini API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(reqwest::Error),

    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("service returned no text")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for NarrativeError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs can carry credentials.
        Self::Request(err.without_url())
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Never fails: errors come back as [`Narrative::Failed`].
    async fn describe(&self, current: &CurrentConditions) -> Narrative;
}

/// Turkish prompt asking for a summary, an activity suggestion and a warning
/// for severe conditions.
pub fn build_prompt(current: &CurrentConditions) -> String {
    let temperature = kelvin_to_celsius(current.temperature_k);
    format!(
        "Şu an şehrinizdeki hava durumu {description} \
         ve sıcaklık {temperature:.1}°C. Bu hava koşulunu basit bir şekilde açıklayın. \
         Ayrıca, bu hava koşuluna uygun bir etkinlik önerisi yapın. \
         Eğer şiddetli bir hava durumu varsa (örneğin, fırtına, yoğun yağış, aşırı sıcaklık), \
         kullanıcılara bu duruma karşı bir uyarıda bulunun.",
        description = current.description,
    )
}
