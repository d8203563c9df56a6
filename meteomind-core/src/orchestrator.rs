//! One lookup, start to finish: current conditions, narrative, map,
//! forecast table and chart.

use std::time::Duration;

use chrono::FixedOffset;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::{
    chart::TemperatureChart,
    config::{Config, Credentials},
    forecast,
    model::Lookup,
    narrative::{GeminiGenerator, NarrativeGenerator},
    presenter::{Presenter, current_metrics},
    provider::{WeatherError, WeatherProvider, provider_from_config},
    speech::{GoogleTranslateTts, SpeechError, SpeechOutcome, SpeechRecognizer, SpeechSynthesizer},
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("another lookup is already running")]
    Busy,

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error("speech synthesis failed: {0}")]
    Speech(#[from] SpeechError),

    #[error("audio playback failed: {0:#}")]
    Playback(anyhow::Error),
}

/// Whether the narrative is also read aloud.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NarrationMode {
    #[default]
    Text,
    Audio,
}

/// How far a run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    CityNotFound,
    /// Current conditions were shown; the forecast was not available.
    ForecastUnavailable,
    Completed,
}

pub struct Orchestrator {
    weather: Box<dyn WeatherProvider>,
    narrator: Box<dyn NarrativeGenerator>,
    voice: Box<dyn SpeechSynthesizer>,
    tts_language: String,
    /// Date boundaries for the forecast; `None` uses the local zone.
    time_zone: Option<FixedOffset>,
    gate: Mutex<()>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("weather", &self.weather)
            .field("tts_language", &self.tts_language)
            .field("time_zone", &self.time_zone)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        weather: Box<dyn WeatherProvider>,
        narrator: Box<dyn NarrativeGenerator>,
        voice: Box<dyn SpeechSynthesizer>,
        tts_language: impl Into<String>,
    ) -> Self {
        Self {
            weather,
            narrator,
            voice,
            tts_language: tts_language.into(),
            time_zone: None,
            gate: Mutex::new(()),
        }
    }

    /// Group forecast steps by date in `tz` instead of the local zone.
    pub fn with_time_zone(mut self, tz: FixedOffset) -> Self {
        self.time_zone = Some(tz);
        self
    }

    /// Wire the real services with the given credentials.
    pub fn from_config(credentials: &Credentials, config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            provider_from_config(credentials, config)?,
            Box::new(GeminiGenerator::from_config(credentials, config)),
            Box::new(GoogleTranslateTts::from_config(&config.speech)),
            config.speech.tts_language.clone(),
        ))
    }

    /// Run one lookup for `city`.
    ///
    /// Rejects the call with [`OrchestratorError::Busy`] while another run
    /// or listen is in progress.
    pub async fn run(
        &self,
        city: &str,
        mode: NarrationMode,
        presenter: &mut dyn Presenter,
    ) -> Result<Outcome, OrchestratorError> {
        let _guard = self.gate.try_lock().map_err(|_| OrchestratorError::Busy)?;
        self.lookup(city, mode, presenter).await
    }

    /// Capture a spoken city name, then run an audio-mode lookup for it.
    ///
    /// Returns `Ok(None)` when nothing usable was heard; the reason has
    /// already been shown through the presenter.
    pub async fn listen_and_run(
        &self,
        recognizer: &dyn SpeechRecognizer,
        timeout: Duration,
        presenter: &mut dyn Presenter,
    ) -> Result<Option<Outcome>, OrchestratorError> {
        let _guard = self.gate.try_lock().map_err(|_| OrchestratorError::Busy)?;

        presenter.info("Konuşmaya başlayabilirsiniz...");

        match recognizer.listen(timeout).await {
            SpeechOutcome::Text(city) => {
                presenter.info(&format!("Saptanan metin: {city}"));
                self.lookup(&city, NarrationMode::Audio, presenter)
                    .await
                    .map(Some)
            }
            SpeechOutcome::NoSpeech => {
                presenter.error("Ses anlaşılamadı, lütfen tekrar deneyin.");
                Ok(None)
            }
            SpeechOutcome::ServiceError(e) => {
                presenter.error(&format!(
                    "Ses tanıma servisiyle ilgili bir sorun oluştu: {e}"
                ));
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, presenter))]
    async fn lookup(
        &self,
        city: &str,
        mode: NarrationMode,
        presenter: &mut dyn Presenter,
    ) -> Result<Outcome, OrchestratorError> {
        presenter.title(&format!("Weather Updates for {city}"));

        let current = match self.weather.fetch_current(city).await? {
            Lookup::Found(current) => current,
            Lookup::NotFound => {
                info!("City not found");
                presenter.error(&format!(
                    "City '{city}' not found. Please check the spelling and try again."
                ));
                return Ok(Outcome::CityNotFound);
            }
        };

        presenter.metrics(&current_metrics(&current));

        let narrative = self.narrator.describe(&current).await;
        if !narrative.is_generated() {
            warn!("Showing failed narrative");
        }
        presenter.narrative(&narrative);

        if mode == NarrationMode::Audio {
            let audio = self
                .voice
                .synthesize(narrative.text(), &self.tts_language)
                .await?;
            presenter
                .play_audio(&audio)
                .await
                .map_err(OrchestratorError::Playback)?;
        }

        presenter.map_pin(current.coord);

        let outlook = match self.weather.fetch_forecast(current.coord).await? {
            Lookup::Found(outlook) => outlook,
            Lookup::NotFound => {
                info!("Forecast not found");
                presenter.error("Error fetching weekly forecast data!");
                return Ok(Outcome::ForecastUnavailable);
            }
        };

        let days = match &self.time_zone {
            Some(tz) => forecast::aggregate_in(&outlook, tz),
            None => forecast::aggregate(&outlook),
        };
        info!(days = days.len(), "Forecast aggregated");

        if let Err(e) = presenter.forecast_table(&days) {
            presenter.error(&format!("Error displaying the weekly forecast: {e}"));
        }

        let chart = TemperatureChart::from_daily(&days);
        if let Err(e) = presenter.temperature_chart(&chart) {
            presenter.error(&format!("Error plotting the temperature graph: {e}"));
        }

        Ok(Outcome::Completed)
    }
}
