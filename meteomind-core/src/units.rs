//! Temperature conversion and the display formats used across the app.

const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Metric tile format, two decimals: `12.35 °C`.
pub fn format_metric_celsius(kelvin: f64) -> String {
    format!("{:.2} °C", kelvin_to_celsius(kelvin))
}

/// Forecast table format, one decimal: `12.3°C`.
pub fn format_table_celsius(celsius: f64) -> String {
    format!("{celsius:.1}°C")
}
