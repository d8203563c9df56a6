use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::model::{Coordinates, CurrentConditions, Forecast, ForecastEntry, Lookup};

use super::{WeatherError, WeatherProvider};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const NOT_FOUND: u16 = 404;
const OK: u16 = 200;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: SecretString,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key: SecretString::from(api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// GET `{base}/{endpoint}` and classify the body by its `cod` field.
    ///
    /// OpenWeather answers unknown cities with HTTP 404 *and* a JSON body;
    /// only the body decides success.
    async fn get(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Lookup<Value>, WeatherError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%url, "Requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.expose_secret())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        let json: Value = serde_json::from_str(&body).map_err(|e| {
            WeatherError::Parse(format!("HTTP {status}, {e}: {}", truncate_body(&body)))
        })?;

        match response_code(&json) {
            Some(NOT_FOUND) => {
                debug!(endpoint, "OpenWeather reported not found");
                Ok(Lookup::NotFound)
            }
            Some(code) if code != OK => Err(WeatherError::Provider {
                code,
                message: json
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message")
                    .to_string(),
            }),
            _ => Ok(Lookup::Found(json)),
        }
    }
}

/// `cod` is a number on `/weather` success and a string everywhere else.
fn response_code(body: &Value) -> Option<u16> {
    match body.get("cod")? {
        Value::Number(n) => n.as_u64().and_then(|c| u16::try_from(c).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: Option<String>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    coord: OwCoord,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn first_weather(weather: Vec<OwWeather>) -> Result<OwWeather, WeatherError> {
    weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::Parse("response contained no weather entry".to_string()))
}

fn parse_current(city: &str, body: Value) -> Result<CurrentConditions, WeatherError> {
    let parsed: OwCurrentResponse =
        serde_json::from_value(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let weather = first_weather(parsed.weather)?;

    Ok(CurrentConditions {
        city: parsed.name.unwrap_or_else(|| city.to_string()),
        temperature_k: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        pressure_hpa: parsed.main.pressure,
        wind_speed_mps: parsed.wind.speed,
        description: weather.description,
        icon: weather.icon,
        coord: Coordinates {
            lat: parsed.coord.lat,
            lon: parsed.coord.lon,
        },
    })
}

fn parse_forecast(body: Value) -> Result<Forecast, WeatherError> {
    let parsed: OwForecastResponse =
        serde_json::from_value(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let entries = parsed
        .list
        .into_iter()
        .map(|entry| {
            let weather = first_weather(entry.weather)?;
            Ok(ForecastEntry {
                dt: entry.dt,
                temp_min_k: entry.main.temp_min,
                temp_max_k: entry.main.temp_max,
                description: weather.description,
                icon: weather.icon,
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    Ok(Forecast { entries })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self))]
    async fn fetch_current(&self, city: &str) -> Result<Lookup<CurrentConditions>, WeatherError> {
        match self.get("weather", &[("q", city.to_string())]).await? {
            Lookup::Found(body) => Ok(Lookup::Found(parse_current(city, body)?)),
            Lookup::NotFound => Ok(Lookup::NotFound),
        }
    }

    #[instrument(skip(self), fields(lat = %coord.lat, lon = %coord.lon))]
    async fn fetch_forecast(&self, coord: Coordinates) -> Result<Lookup<Forecast>, WeatherError> {
        let query = [("lat", coord.lat.to_string()), ("lon", coord.lon.to_string())];

        match self.get("forecast", &query).await? {
            Lookup::Found(body) => {
                let forecast = parse_forecast(body)?;
                debug!(entries = forecast.entries.len(), "Parsed forecast");
                Ok(Lookup::Found(forecast))
            }
            Lookup::NotFound => Ok(Lookup::NotFound),
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
