use crate::{
    Config, Coordinates, CurrentConditions, Forecast, Lookup, config::Credentials,
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

pub mod openweather;

/// Failures that abort the current lookup.
///
/// "City not found" is not one of them: it comes back as [`Lookup::NotFound`].
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Request to weather provider failed: {0}")]
    Request(reqwest::Error),

    #[error("Weather provider returned code {code}: {message}")]
    Provider { code: u16, message: String },

    #[error("Failed to parse weather provider response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        // `appid` travels in the query string.
        Self::Request(err.without_url())
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for a city name.
    async fn fetch_current(&self, city: &str) -> Result<Lookup<CurrentConditions>, WeatherError>;

    /// 5-day / 3-hour forecast for a point.
    async fn fetch_forecast(&self, coord: Coordinates) -> Result<Lookup<Forecast>, WeatherError>;
}

/// Construct the weather provider from the resolved credentials.
pub fn provider_from_config(
    credentials: &Credentials,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = credentials.openweather_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `meteomind configure` or pass --openweather-key."
        )
    })?;

    Ok(Box::new(OpenWeatherProvider::with_base_url(
        api_key.to_owned(),
        config.openweather.base_url.clone(),
    )))
}
