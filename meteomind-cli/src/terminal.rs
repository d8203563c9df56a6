use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use meteomind_core::{
    Coordinates, DailyAggregate, Metric, Narrative, Presenter, TemperatureChart,
    units::format_table_celsius,
};
use tokio::process::Command;
use tracing::debug;

/// Presenter that writes plain text to a terminal.
///
/// The chart goes to an SVG file and narration audio to an external player.
pub struct TerminalPresenter<W: Write> {
    out: W,
    chart_path: PathBuf,
    player_command: Vec<String>,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout(chart_path: PathBuf, player_command: Vec<String>) -> Self {
        Self::new(io::stdout(), chart_path, player_command)
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, chart_path: PathBuf, player_command: Vec<String>) -> Self {
        Self {
            out,
            chart_path,
            player_command,
        }
    }

    fn line(&mut self, text: &str) {
        // A closed stdout is not worth aborting a lookup for.
        let _ = writeln!(self.out, "{text}");
    }

    fn subheader(&mut self, text: &str) {
        self.line("");
        self.line(&format!("## {text}"));
    }
}

#[async_trait(?Send)]
impl<W: Write> Presenter for TerminalPresenter<W> {
    fn title(&mut self, text: &str) {
        self.line("");
        self.line(&format!("# {text}"));
    }

    fn info(&mut self, text: &str) {
        self.line(&format!("ℹ️  {text}"));
    }

    fn error(&mut self, text: &str) {
        self.line(&format!("❌ {text}"));
    }

    fn metrics(&mut self, metrics: &[Metric]) {
        // Two columns, filled left then right, like a 2x2 tile grid.
        let half = metrics.len().div_ceil(2);
        let (left, right) = metrics.split_at(half);
        let width = left.iter().map(metric_cell_width).max().unwrap_or(0);

        for (i, l) in left.iter().enumerate() {
            let left_cell = format!("{}: {}", l.label, l.value);
            match right.get(i) {
                Some(r) => {
                    let pad = width.saturating_sub(metric_cell_width(l));
                    self.line(&format!(
                        "{left_cell}{}    {}: {}",
                        " ".repeat(pad),
                        r.label,
                        r.value
                    ));
                }
                None => self.line(&left_cell),
            }
        }
    }

    fn narrative(&mut self, narrative: &Narrative) {
        self.subheader("Weather Description");
        self.line(narrative.text());
        if let Some(icon) = narrative.icon_url() {
            self.line(&format!("Icon: {icon}"));
        }
    }

    async fn play_audio(&mut self, mp3: &[u8]) -> anyhow::Result<()> {
        let (program, args) = self
            .player_command
            .split_first()
            .ok_or_else(|| anyhow!("No audio player configured (speech.player_command)"))?;

        let mut file = tempfile::Builder::new()
            .prefix("meteomind-")
            .suffix(".mp3")
            .tempfile()
            .context("Failed to create temporary audio file")?;
        file.write_all(mp3).context("Failed to write temporary audio file")?;
        file.flush()?;

        debug!(path = %file.path().display(), bytes = mp3.len(), "Playing narration");

        let status = Command::new(program)
            .args(args)
            .arg(file.path())
            .status()
            .await
            .with_context(|| format!("Failed to start audio player `{program}`"))?;

        if !status.success() {
            bail!("Audio player `{program}` exited with {status}");
        }
        Ok(())
    }

    fn map_pin(&mut self, coord: Coordinates) {
        self.subheader("City Location on Map");
        self.line(&format!("📍 {}, {}", coord.lat, coord.lon));
        self.line(&format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map=10/{lat}/{lon}",
            lat = coord.lat,
            lon = coord.lon
        ));
    }

    fn forecast_table(&mut self, days: &[DailyAggregate]) -> anyhow::Result<()> {
        self.line("");
        self.line("### Weekly Weather Forecast");
        for row in forecast_rows(days) {
            writeln!(self.out, "{row}").context("Failed to write forecast table")?;
        }
        Ok(())
    }

    fn temperature_chart(&mut self, chart: &TemperatureChart) -> anyhow::Result<()> {
        fs::write(&self.chart_path, chart.render_svg())
            .with_context(|| format!("Failed to write {}", self.chart_path.display()))?;

        self.subheader("Temperature Graph");
        let path = self.chart_path.display().to_string();
        self.line(&format!("Saved to {path}"));
        Ok(())
    }
}

fn metric_cell_width(metric: &Metric) -> usize {
    metric.label.chars().count() + 2 + metric.value.chars().count()
}

const HEADERS: [&str; 5] = ["Date", "Description", "Min Temp", "Max Temp", "Icon"];

/// Header plus one aligned line per day.
fn forecast_rows(days: &[DailyAggregate]) -> Vec<String> {
    let cells: Vec<[String; 5]> = days
        .iter()
        .map(|d| {
            [
                d.label.clone(),
                capitalize(&d.description),
                format_table_celsius(d.temp_min_c),
                format_table_celsius(d.temp_max_c),
                d.icon_url.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let render = |row: [&str; 5]| {
        row.iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(HEADERS)];
    lines.extend(cells.iter().map(|row| render(row.each_ref().map(String::as_str))));
    lines
}

/// First letter upper case, the rest lower case.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}
