use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::narrative::GenerationConfig;

/// API keys for the two remote services.
///
/// Passed explicitly to whatever builds the collaborators; never kept in a global.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub openweather_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl Credentials {
    /// Merge command-line/env values over the ones stored on disk.
    ///
    /// Empty strings count as "not set".
    pub fn resolve(
        openweather_api_key: Option<String>,
        gemini_api_key: Option<String>,
        config: &Config,
    ) -> Self {
        Self {
            openweather_api_key: non_empty(openweather_api_key)
                .or_else(|| non_empty(config.credentials.openweather_api_key.clone())),
            gemini_api_key: non_empty(gemini_api_key)
                .or_else(|| non_empty(config.credentials.gemini_api_key.clone())),
        }
    }

    pub fn openweather_api_key(&self) -> Option<&str> {
        self.openweather_api_key.as_deref()
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.gemini_api_key.as_deref()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    pub base_url: String,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        let generation = GenerationConfig::default();
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-pro".to_string(),
            temperature: generation.temperature,
            top_p: generation.top_p,
            top_k: generation.top_k,
            max_output_tokens: generation.max_output_tokens,
        }
    }
}

impl GeminiConfig {
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
            ..GenerationConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Language the recognizer decodes, e.g. `tr-TR`.
    pub recognition_language: String,
    /// Language code for synthesized narration, e.g. `tr`.
    pub tts_language: String,
    pub listen_timeout_secs: u64,
    pub recognizer_url: String,
    pub recognizer_key: Option<String>,
    pub tts_url: String,
    /// Command that records one utterance as 16 kHz mono FLAC on stdout.
    pub recorder_command: Vec<String>,
    /// Command that plays an MP3 file; the file path is appended.
    pub player_command: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            recognition_language: "tr-TR".to_string(),
            tts_language: "tr".to_string(),
            listen_timeout_secs: 5,
            recognizer_url: "http://www.google.com/speech-api/v2/recognize".to_string(),
            recognizer_key: None,
            tts_url: "https://translate.google.com/translate_tts".to_string(),
            recorder_command: [
                "rec", "-q", "-c", "1", "-r", "16000", "-b", "16", "-t", "flac", "-", "silence",
                "1", "0.1", "1%", "1", "1.5", "1%",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            player_command: vec!["mpg123".to_string(), "-q".to_string()],
        }
    }
}

impl SpeechConfig {
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// City shown in prompts when none is given.
    pub default_city: String,

    /// Example TOML:
    /// [credentials]
    /// openweather_api_key = "..."
    pub credentials: Credentials,

    pub openweather: OpenWeatherConfig,
    pub gemini: GeminiConfig,
    pub speech: SpeechConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_city: "London".to_string(),
            credentials: Credentials::default(),
            openweather: OpenWeatherConfig::default(),
            gemini: GeminiConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteomind", "meteomind")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Store both keys; blank input leaves the existing value alone.
    pub fn set_credentials(&mut self, openweather_api_key: String, gemini_api_key: String) {
        if let Some(key) = non_empty(Some(openweather_api_key)) {
            self.credentials.openweather_api_key = Some(key);
        }
        if let Some(key) = non_empty(Some(gemini_api_key)) {
            self.credentials.gemini_api_key = Some(key);
        }
    }
}
