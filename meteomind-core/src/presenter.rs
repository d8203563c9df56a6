//! Output port for an orchestration run.
//!
//! The orchestrator decides *what* to show and in which order; a presenter
//! decides how it looks (terminal, web page, test recorder).

use async_trait::async_trait;

use crate::{
    chart::TemperatureChart,
    model::{Coordinates, CurrentConditions, DailyAggregate, Narrative},
    units::format_metric_celsius,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Temperature, humidity, pressure and wind, formatted for display.
pub fn current_metrics(current: &CurrentConditions) -> Vec<Metric> {
    vec![
        Metric::new("Temperature 🌡️", format_metric_celsius(current.temperature_k)),
        Metric::new("Humidity 💧", format!("{}%", current.humidity_pct)),
        Metric::new("Pressure", format!("{} hPa", current.pressure_hpa)),
        Metric::new("Wind Speed 🍃", format!("{} m/s", current.wind_speed_mps)),
    ]
}

/// Presenters live on the task driving the lookup, so they need not be `Send`.
#[async_trait(?Send)]
pub trait Presenter {
    fn title(&mut self, text: &str);

    fn info(&mut self, text: &str);

    fn error(&mut self, text: &str);

    fn metrics(&mut self, metrics: &[Metric]);

    fn narrative(&mut self, narrative: &Narrative);

    /// Play synthesized MP3 audio once, returning when playback ends.
    async fn play_audio(&mut self, mp3: &[u8]) -> anyhow::Result<()>;

    fn map_pin(&mut self, coord: Coordinates);

    fn forecast_table(&mut self, days: &[DailyAggregate]) -> anyhow::Result<()>;

    fn temperature_chart(&mut self, chart: &TemperatureChart) -> anyhow::Result<()>;
}
