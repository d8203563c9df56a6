//! Core library for MeteoMind.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and the Gemini narrative generator
//! - Forecast aggregation and the temperature chart
//! - Speech collaborators and the presenter port
//! - The orchestrator that sequences one lookup
//!
//! It is used by `meteomind-cli`, but any front end implementing
//! [`Presenter`] can drive it.

pub mod chart;
pub mod config;
pub mod forecast;
pub mod icon;
pub mod model;
pub mod narrative;
pub mod orchestrator;
pub mod presenter;
pub mod provider;
pub mod speech;
pub mod units;

pub use chart::TemperatureChart;
pub use config::{Config, Credentials};
pub use model::{
    Coordinates, CurrentConditions, DailyAggregate, Forecast, ForecastEntry, Lookup, Narrative,
};
pub use narrative::{GeminiGenerator, NarrativeGenerator};
pub use orchestrator::{NarrationMode, Orchestrator, OrchestratorError, Outcome};
pub use presenter::{Metric, Presenter};
pub use provider::{WeatherError, WeatherProvider};
pub use speech::{SpeechError, SpeechOutcome, SpeechRecognizer, SpeechSynthesizer};
