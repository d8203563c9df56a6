const ICON_BASE_URL: &str = "http://openweathermap.org/img/wn/";

/// Display URL for an OpenWeather icon code such as `10d`.
pub fn icon_url(code: &str) -> String {
    format!("{ICON_BASE_URL}{code}@2x.png")
}
