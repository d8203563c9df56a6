//! Min/max temperature chart for the daily forecast, rendered as SVG.

use std::fmt::Write as _;

use crate::model::DailyAggregate;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 170.0;

const MIN_COLOR: &str = "blue";
const MAX_COLOR: &str = "red";
const BAND_COLOR: &str = "lightgray";

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// X axis categories, in first-seen order.
    pub labels: Vec<String>,
    pub min_c: Vec<f64>,
    pub max_c: Vec<f64>,
}

impl TemperatureChart {
    pub fn from_daily(days: &[DailyAggregate]) -> Self {
        Self {
            title: "Weekly Temperature Forecast".to_string(),
            x_label: "Date".to_string(),
            y_label: "Temperature (°C)".to_string(),
            labels: days.iter().map(|d| d.label.clone()).collect(),
            min_c: days.iter().map(|d| d.temp_min_c).collect(),
            max_c: days.iter().map(|d| d.temp_max_c).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Temperature range covered by the y axis, padded by one degree.
    fn y_range(&self) -> (f64, f64) {
        let lo = self.min_c.iter().chain(&self.max_c).copied().fold(f64::INFINITY, f64::min);
        let hi = self.min_c.iter().chain(&self.max_c).copied().fold(f64::NEG_INFINITY, f64::max);

        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        (lo.floor() - 1.0, hi.ceil() + 1.0)
    }

    fn x(&self, i: usize) -> f64 {
        let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        match self.labels.len() {
            0 | 1 => MARGIN_LEFT + plot_width / 2.0,
            n => MARGIN_LEFT + plot_width * i as f64 / (n - 1) as f64,
        }
    }

    fn y(&self, value: f64, (lo, hi): (f64, f64)) -> f64 {
        let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        MARGIN_TOP + plot_height * (hi - value) / (hi - lo)
    }

    fn points(&self, series: &[f64], range: (f64, f64)) -> Vec<(f64, f64)> {
        series
            .iter()
            .enumerate()
            .map(|(i, v)| (self.x(i), self.y(*v, range)))
            .collect()
    }

    pub fn render_svg(&self) -> String {
        let range = self.y_range();
        let mut svg = String::new();

        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="30" text-anchor="middle" font-size="20">{}</text>"#,
            WIDTH / 2.0,
            escape(&self.title)
        );

        self.render_axes(&mut svg, range);

        if !self.is_empty() {
            let min_points = self.points(&self.min_c, range);
            let max_points = self.points(&self.max_c, range);

            // Band: along the max line, back along the min line.
            let band: Vec<_> = max_points.iter().chain(min_points.iter().rev()).collect();
            let _ = writeln!(
                svg,
                r#"<polygon class="band" points="{}" fill="{BAND_COLOR}" fill-opacity="0.3" stroke="none"/>"#,
                join_points(band.into_iter().copied())
            );

            render_series(&mut svg, "min", &min_points, MIN_COLOR);
            render_series(&mut svg, "max", &max_points, MAX_COLOR);
            self.render_x_labels(&mut svg);
        }

        render_legend(&mut svg);
        svg.push_str("</svg>\n");
        svg
    }

    fn render_axes(&self, svg: &mut String, range: (f64, f64)) {
        let bottom = HEIGHT - MARGIN_BOTTOM;
        let right = WIDTH - MARGIN_RIGHT;

        let _ = writeln!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="black"/>"#
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{bottom}" stroke="black"/>"#
        );

        let (lo, hi) = range;
        let steps = 5;
        for step in 0..=steps {
            let value = lo + (hi - lo) * f64::from(step) / f64::from(steps);
            let y = self.y(value, range);
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{y:.1}" text-anchor="end" font-size="12">{value:.1}</text>"#,
                MARGIN_LEFT - 8.0
            );
        }

        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="14">{}</text>"#,
            MARGIN_LEFT + (right - MARGIN_LEFT) / 2.0,
            HEIGHT - 15.0,
            escape(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text x="20" y="{mid}" text-anchor="middle" font-size="14" transform="rotate(-90 20 {mid})">{}</text>"#,
            escape(&self.y_label),
            mid = MARGIN_TOP + (bottom - MARGIN_TOP) / 2.0,
        );
    }

    fn render_x_labels(&self, svg: &mut String) {
        let y = HEIGHT - MARGIN_BOTTOM + 20.0;
        for (i, label) in self.labels.iter().enumerate() {
            let x = self.x(i);
            let _ = writeln!(
                svg,
                r#"<text x="{x:.1}" y="{y}" text-anchor="end" font-size="12" transform="rotate(-45 {x:.1} {y})">{}</text>"#,
                escape(label)
            );
        }
    }
}

fn render_series(svg: &mut String, class: &str, points: &[(f64, f64)], color: &str) {
    let _ = writeln!(
        svg,
        r#"<polyline class="{class}" points="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
        join_points(points.iter().copied())
    );
    for (x, y) in points {
        let _ = writeln!(svg, r#"<circle cx="{x:.1}" cy="{y:.1}" r="4" fill="{color}"/>"#);
    }
}

fn render_legend(svg: &mut String) {
    let x = WIDTH - MARGIN_RIGHT - 150.0;
    for (row, (color, label)) in [(MIN_COLOR, "Min Temp (°C)"), (MAX_COLOR, "Max Temp (°C)")]
        .iter()
        .enumerate()
    {
        let y = MARGIN_TOP + 10.0 + 20.0 * row as f64;
        let _ = writeln!(
            svg,
            r#"<line x1="{x}" y1="{y}" x2="{}" y2="{y}" stroke="{color}" stroke-width="2"/>"#,
            x + 25.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="12">{label}</text>"#,
            x + 32.0,
            y + 4.0
        );
    }
}

fn join_points(points: impl Iterator<Item = (f64, f64)>) -> String {
    points
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
