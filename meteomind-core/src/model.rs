use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Snapshot reading for a city, in provider units (Kelvin, hPa, m/s).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub city: String,
    pub temperature_k: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed_mps: f64,
    pub description: String,
    pub icon: String,
    pub coord: Coordinates,
}

/// One 3-hour step of the 5-day forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub temp_min_k: f64,
    pub temp_max_k: f64,
    pub description: String,
    pub icon: String,
}

/// Forecast entries in the order the provider returned them (chronological).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub entries: Vec<ForecastEntry>,
}

/// One display row per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    /// Display form, e.g. `Wednesday, May 01`.
    pub label: String,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub description: String,
    pub icon_url: String,
}

/// Outcome of a provider lookup that succeeded at the transport level.
///
/// `NotFound` mirrors the provider's `"cod": "404"` body, which is how
/// OpenWeather reports unknown cities and unavailable forecasts.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// Text produced for the current conditions.
///
/// Generation failures are carried as data so callers always get something
/// to display.
#[derive(Debug, Clone, PartialEq)]
pub enum Narrative {
    Generated { text: String, icon_url: String },
    Failed { error: String },
}

impl Narrative {
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Narrative::Failed {
            error: format!("Error generating description: {error}"),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Narrative::Generated { text, .. } => text,
            Narrative::Failed { error } => error,
        }
    }

    pub fn icon_url(&self) -> Option<&str> {
        match self {
            Narrative::Generated { icon_url, .. } => Some(icon_url),
            Narrative::Failed { .. } => None,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Narrative::Generated { .. })
    }

    pub fn into_parts(self) -> (String, Option<String>) {
        match self {
            Narrative::Generated { text, icon_url } => (text, Some(icon_url)),
            Narrative::Failed { error } => (error, None),
        }
    }
}
