//! Orchestrator behaviour with in-memory collaborators.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::FixedOffset;
use meteomind_core::{
    Coordinates, CurrentConditions, DailyAggregate, Forecast, ForecastEntry, Lookup, Metric,
    NarrationMode, Narrative, NarrativeGenerator, Orchestrator, OrchestratorError, Outcome,
    Presenter, SpeechError, SpeechOutcome, SpeechRecognizer, SpeechSynthesizer, TemperatureChart,
    WeatherError, WeatherProvider,
};
use tokio::sync::Notify;

const LONDON: Coordinates = Coordinates { lat: 51.5085, lon: -0.1257 };

fn london() -> CurrentConditions {
    CurrentConditions {
        city: "London".to_string(),
        temperature_k: 285.5,
        humidity_pct: 82,
        pressure_hpa: 1009,
        wind_speed_mps: 4.63,
        description: "light rain".to_string(),
        icon: "10d".to_string(),
        coord: LONDON,
    }
}

/// Three steps on 2024-05-01 followed by one on 2024-05-02, between 10:00
/// and 12:00 UTC.
fn forecast() -> Forecast {
    let may_1_10h = 1_714_557_600;
    let entry = |dt: i64, min_k: f64, max_k: f64, description: &str| ForecastEntry {
        dt,
        temp_min_k: min_k,
        temp_max_k: max_k,
        description: description.to_string(),
        icon: "01d".to_string(),
    };

    Forecast {
        entries: vec![
            entry(may_1_10h, 283.15, 285.15, "clear sky"),
            entry(may_1_10h + 3600, 280.15, 299.15, "few clouds"),
            entry(may_1_10h + 7200, 279.15, 300.15, "rain"),
            entry(may_1_10h + 86_400, 284.15, 286.15, "overcast clouds"),
        ],
    }
}

#[derive(Debug, Clone)]
enum CurrentReply {
    Found,
    NotFound,
    Fail,
}

#[derive(Debug)]
struct FakeWeather {
    current: CurrentReply,
    forecast_found: bool,
    forecast_calls: Arc<AtomicUsize>,
    /// When set, `fetch_current` waits for a notification before replying.
    hold: Option<Arc<Notify>>,
}

impl FakeWeather {
    fn new(current: CurrentReply, forecast_found: bool) -> Self {
        Self {
            current,
            forecast_found,
            forecast_calls: Arc::new(AtomicUsize::new(0)),
            hold: None,
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn fetch_current(&self, _city: &str) -> Result<Lookup<CurrentConditions>, WeatherError> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        match self.current {
            CurrentReply::Found => Ok(Lookup::Found(london())),
            CurrentReply::NotFound => Ok(Lookup::NotFound),
            CurrentReply::Fail => Err(WeatherError::Parse("boom".to_string())),
        }
    }

    async fn fetch_forecast(&self, coord: Coordinates) -> Result<Lookup<Forecast>, WeatherError> {
        assert_eq!(coord, LONDON);
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        if self.forecast_found {
            Ok(Lookup::Found(forecast()))
        } else {
            Ok(Lookup::NotFound)
        }
    }
}

struct FakeNarrator {
    fail: bool,
}

#[async_trait]
impl NarrativeGenerator for FakeNarrator {
    async fn describe(&self, current: &CurrentConditions) -> Narrative {
        if self.fail {
            Narrative::failed("API key not valid")
        } else {
            Narrative::Generated {
                text: format!("{} için yağmur bekleniyor.", current.city),
                icon_url: "http://openweathermap.org/img/wn/10d@2x.png".to_string(),
            }
        }
    }
}

#[derive(Default)]
struct FakeVoice {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeVoice {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, SpeechError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((text.to_string(), language.to_string()));
        }
        Ok(b"ID3fake".to_vec())
    }
}

struct FakeRecognizer(SpeechOutcome);

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn listen(&self, timeout: Duration) -> SpeechOutcome {
        assert_eq!(timeout, Duration::from_secs(5));
        self.0.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Title(String),
    Info(String),
    Error(String),
    Metrics(Vec<Metric>),
    Narrative(String),
    Audio(usize),
    MapPin(Coordinates),
    Table(Vec<DailyAggregate>),
    Chart(TemperatureChart),
}

#[derive(Default)]
struct RecordingPresenter {
    shown: Vec<Shown>,
    fail_chart: bool,
}

impl RecordingPresenter {
    fn errors(&self) -> Vec<&str> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::Error(e) => Some(e.as_str()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Shown) -> bool) -> usize {
        self.shown.iter().filter(|s| pred(s)).count()
    }
}

#[async_trait(?Send)]
impl Presenter for RecordingPresenter {
    fn title(&mut self, text: &str) {
        self.shown.push(Shown::Title(text.to_string()));
    }

    fn info(&mut self, text: &str) {
        self.shown.push(Shown::Info(text.to_string()));
    }

    fn error(&mut self, text: &str) {
        self.shown.push(Shown::Error(text.to_string()));
    }

    fn metrics(&mut self, metrics: &[Metric]) {
        self.shown.push(Shown::Metrics(metrics.to_vec()));
    }

    fn narrative(&mut self, narrative: &Narrative) {
        self.shown.push(Shown::Narrative(narrative.text().to_string()));
    }

    async fn play_audio(&mut self, mp3: &[u8]) -> anyhow::Result<()> {
        self.shown.push(Shown::Audio(mp3.len()));
        Ok(())
    }

    fn map_pin(&mut self, coord: Coordinates) {
        self.shown.push(Shown::MapPin(coord));
    }

    fn forecast_table(&mut self, days: &[DailyAggregate]) -> anyhow::Result<()> {
        self.shown.push(Shown::Table(days.to_vec()));
        Ok(())
    }

    fn temperature_chart(&mut self, chart: &TemperatureChart) -> anyhow::Result<()> {
        if self.fail_chart {
            anyhow::bail!("no writable output");
        }
        self.shown.push(Shown::Chart(chart.clone()));
        Ok(())
    }
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("valid offset")
}

fn orchestrator(weather: FakeWeather, narrator_fails: bool, voice: FakeVoice) -> Orchestrator {
    Orchestrator::new(
        Box::new(weather),
        Box::new(FakeNarrator { fail: narrator_fails }),
        Box::new(voice),
        "tr",
    )
    .with_time_zone(utc())
}

#[tokio::test]
async fn text_mode_renders_everything_without_audio() {
    let voice = FakeVoice::default();
    let synth_calls = voice.calls.clone();
    let orch = orchestrator(FakeWeather::new(CurrentReply::Found, true), false, voice);
    let mut presenter = RecordingPresenter::default();

    let outcome = orch
        .run("London", NarrationMode::Text, &mut presenter)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, Outcome::Completed);
    assert!(synth_calls.lock().expect("lock").is_empty());
    assert_eq!(presenter.count(|s| matches!(s, Shown::Audio(_))), 0);

    assert_eq!(presenter.shown[0], Shown::Title("Weather Updates for London".to_string()));
    assert_eq!(
        presenter.shown[1],
        Shown::Metrics(vec![
            Metric::new("Temperature 🌡️", "12.35 °C"),
            Metric::new("Humidity 💧", "82%"),
            Metric::new("Pressure", "1009 hPa"),
            Metric::new("Wind Speed 🍃", "4.63 m/s"),
        ])
    );
    assert_eq!(
        presenter.shown[2],
        Shown::Narrative("London için yağmur bekleniyor.".to_string())
    );
    assert_eq!(presenter.shown[3], Shown::MapPin(LONDON));

    match &presenter.shown[4] {
        Shown::Table(days) => {
            assert_eq!(days.len(), 2);
            assert_eq!(days[0].description, "clear sky");
            assert!((days[0].temp_max_c - 12.0).abs() < 1e-9);
            assert_eq!(days[1].description, "overcast clouds");
        }
        other => panic!("expected table, got {other:?}"),
    }
    match &presenter.shown[5] {
        Shown::Chart(chart) => {
            assert_eq!(chart.labels.len(), 2);
            assert!((chart.min_c[0] - 10.0).abs() < 1e-9);
        }
        other => panic!("expected chart, got {other:?}"),
    }
    assert!(presenter.errors().is_empty());
}

#[tokio::test]
async fn forecast_days_follow_configured_time_zone() {
    // At UTC+13 the 11:00 UTC step already falls on May 2.
    let auckland = FixedOffset::east_opt(13 * 3600).expect("valid offset");
    let orch = orchestrator(
        FakeWeather::new(CurrentReply::Found, true),
        false,
        FakeVoice::default(),
    )
    .with_time_zone(auckland);
    let mut presenter = RecordingPresenter::default();

    orch.run("London", NarrationMode::Text, &mut presenter)
        .await
        .expect("run succeeds");

    let days = presenter
        .shown
        .iter()
        .find_map(|s| match s {
            Shown::Table(days) => Some(days.clone()),
            _ => None,
        })
        .expect("table shown");
    let descriptions: Vec<_> = days.iter().map(|d| d.description.as_str()).collect();
    assert_eq!(descriptions, vec!["clear sky", "few clouds"]);
    assert_eq!(days[1].label, "Thursday, May 02");
}

#[tokio::test]
async fn audio_mode_synthesizes_and_plays_once() {
    let voice = FakeVoice::default();
    let synth_calls = voice.calls.clone();
    let orch = orchestrator(FakeWeather::new(CurrentReply::Found, true), false, voice);
    let mut presenter = RecordingPresenter::default();

    orch.run("London", NarrationMode::Audio, &mut presenter)
        .await
        .expect("run succeeds");

    let calls = synth_calls.lock().expect("lock").clone();
    assert_eq!(
        calls,
        vec![("London için yağmur bekleniyor.".to_string(), "tr".to_string())]
    );
    assert_eq!(presenter.count(|s| matches!(s, Shown::Audio(7))), 1);
    // Text is still shown, before the audio.
    let narrative_at = presenter
        .shown
        .iter()
        .position(|s| matches!(s, Shown::Narrative(_)))
        .expect("narrative shown");
    let audio_at = presenter
        .shown
        .iter()
        .position(|s| matches!(s, Shown::Audio(_)))
        .expect("audio played");
    assert!(narrative_at < audio_at);
}

#[tokio::test]
async fn unknown_city_stops_before_metrics() {
    let weather = FakeWeather::new(CurrentReply::NotFound, true);
    let forecast_calls = weather.forecast_calls.clone();
    let orch = orchestrator(weather, false, FakeVoice::default());
    let mut presenter = RecordingPresenter::default();

    let outcome = orch
        .run("Atlantis", NarrationMode::Text, &mut presenter)
        .await
        .expect("not found is not an error");

    assert_eq!(outcome, Outcome::CityNotFound);
    assert_eq!(
        presenter.errors(),
        vec!["City 'Atlantis' not found. Please check the spelling and try again."]
    );
    assert_eq!(presenter.count(|s| matches!(s, Shown::Metrics(_))), 0);
    assert_eq!(presenter.count(|s| matches!(s, Shown::MapPin(_))), 0);
    assert_eq!(forecast_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_forecast_keeps_current_conditions() {
    let orch = orchestrator(
        FakeWeather::new(CurrentReply::Found, false),
        false,
        FakeVoice::default(),
    );
    let mut presenter = RecordingPresenter::default();

    let outcome = orch
        .run("London", NarrationMode::Text, &mut presenter)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, Outcome::ForecastUnavailable);
    assert_eq!(presenter.count(|s| matches!(s, Shown::Metrics(_))), 1);
    assert_eq!(presenter.count(|s| matches!(s, Shown::MapPin(_))), 1);
    assert_eq!(presenter.errors(), vec!["Error fetching weekly forecast data!"]);
    assert_eq!(presenter.count(|s| matches!(s, Shown::Table(_))), 0);
    assert_eq!(presenter.count(|s| matches!(s, Shown::Chart(_))), 0);
}

#[tokio::test]
async fn failed_narrative_is_shown_and_run_continues() {
    let orch = orchestrator(
        FakeWeather::new(CurrentReply::Found, true),
        true,
        FakeVoice::default(),
    );
    let mut presenter = RecordingPresenter::default();

    let outcome = orch
        .run("London", NarrationMode::Text, &mut presenter)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, Outcome::Completed);
    assert!(presenter.shown.contains(&Shown::Narrative(
        "Error generating description: API key not valid".to_string()
    )));
}

#[tokio::test]
async fn transport_failure_propagates() {
    let orch = orchestrator(
        FakeWeather::new(CurrentReply::Fail, true),
        false,
        FakeVoice::default(),
    );
    let mut presenter = RecordingPresenter::default();

    let err = orch
        .run("London", NarrationMode::Text, &mut presenter)
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Weather(WeatherError::Parse(_))));
    assert_eq!(presenter.count(|s| matches!(s, Shown::Metrics(_))), 0);
}

#[tokio::test]
async fn chart_failure_is_reported_inline() {
    let orch = orchestrator(
        FakeWeather::new(CurrentReply::Found, true),
        false,
        FakeVoice::default(),
    );
    let mut presenter = RecordingPresenter {
        fail_chart: true,
        ..Default::default()
    };

    let outcome = orch
        .run("London", NarrationMode::Text, &mut presenter)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(
        presenter.errors(),
        vec!["Error plotting the temperature graph: no writable output"]
    );
    assert_eq!(presenter.count(|s| matches!(s, Shown::Table(_))), 1);
}

#[tokio::test]
async fn spoken_city_runs_in_audio_mode() {
    let voice = FakeVoice::default();
    let synth_calls = voice.calls.clone();
    let orch = orchestrator(FakeWeather::new(CurrentReply::Found, true), false, voice);
    let mut presenter = RecordingPresenter::default();
    let recognizer = FakeRecognizer(SpeechOutcome::Text("London".to_string()));

    let outcome = orch
        .listen_and_run(&recognizer, Duration::from_secs(5), &mut presenter)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, Some(Outcome::Completed));
    assert_eq!(synth_calls.lock().expect("lock").len(), 1);
    assert!(presenter.shown.contains(&Shown::Info("Saptanan metin: London".to_string())));
}

#[tokio::test]
async fn unintelligible_speech_skips_lookup() {
    let weather = FakeWeather::new(CurrentReply::Found, true);
    let forecast_calls = weather.forecast_calls.clone();
    let orch = orchestrator(weather, false, FakeVoice::default());
    let mut presenter = RecordingPresenter::default();

    let outcome = orch
        .listen_and_run(
            &FakeRecognizer(SpeechOutcome::NoSpeech),
            Duration::from_secs(5),
            &mut presenter,
        )
        .await
        .expect("recovered");

    assert_eq!(outcome, None);
    assert_eq!(presenter.errors(), vec!["Ses anlaşılamadı, lütfen tekrar deneyin."]);
    assert_eq!(presenter.count(|s| matches!(s, Shown::Title(_))), 0);
    assert_eq!(forecast_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn speech_service_error_is_reported() {
    let orch = orchestrator(
        FakeWeather::new(CurrentReply::Found, true),
        false,
        FakeVoice::default(),
    );
    let mut presenter = RecordingPresenter::default();

    let outcome = orch
        .listen_and_run(
            &FakeRecognizer(SpeechOutcome::ServiceError("HTTP 403".to_string())),
            Duration::from_secs(5),
            &mut presenter,
        )
        .await
        .expect("recovered");

    assert_eq!(outcome, None);
    assert_eq!(
        presenter.errors(),
        vec!["Ses tanıma servisiyle ilgili bir sorun oluştu: HTTP 403"]
    );
}

#[tokio::test]
async fn concurrent_trigger_is_rejected() {
    let hold = Arc::new(Notify::new());
    let mut weather = FakeWeather::new(CurrentReply::Found, true);
    weather.hold = Some(hold.clone());
    let orch = orchestrator(weather, false, FakeVoice::default());

    let mut first_presenter = RecordingPresenter::default();
    let mut second_presenter = RecordingPresenter::default();

    let first = orch.run("London", NarrationMode::Text, &mut first_presenter);
    let second = async {
        // Let the first run take the gate and park on `hold`.
        tokio::task::yield_now().await;
        let result = orch
            .run("Paris", NarrationMode::Text, &mut second_presenter)
            .await;
        hold.notify_one();
        result
    };

    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.expect("first run completes"), Outcome::Completed);
    assert!(matches!(second, Err(OrchestratorError::Busy)));
    assert!(second_presenter.shown.is_empty());
}
