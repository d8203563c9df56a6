use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};
use meteomind_core::{
    Config, Credentials, NarrationMode, Orchestrator, speech::MicrophoneRecognizer,
};
use tracing::debug;

use crate::terminal::TerminalPresenter;

const DEFAULT_CHART_PATH: &str = "temperature_graph.svg";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteomind", version, about = "Weather updates with AI narration")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// OpenWeather API key; overrides the configured one.
    #[arg(long, global = true, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub openweather_key: Option<String>,

    /// Gemini API key; overrides the configured one.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API keys and the default city.
    Configure,

    /// Show weather for a city.
    Show {
        /// City name; defaults to the configured default city.
        city: Option<String>,

        /// Also read the description aloud.
        #[arg(long)]
        audio: bool,

        /// Where to write the temperature chart (SVG).
        #[arg(long, default_value = DEFAULT_CHART_PATH)]
        chart: PathBuf,
    },

    /// Say a city name into the microphone and hear its weather.
    Listen {
        /// Where to write the temperature chart (SVG).
        #[arg(long, default_value = DEFAULT_CHART_PATH)]
        chart: PathBuf,
    },

    /// Keep asking for cities until you quit.
    Interactive {
        /// Where to write the temperature chart (SVG).
        #[arg(long, default_value = DEFAULT_CHART_PATH)]
        chart: PathBuf,
    },
}

const GET_WEATHER: &str = "Get Weather";
const SPEAK: &str = "Speak a city name";
const QUIT: &str = "Quit";

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        let credentials = Credentials::resolve(self.openweather_key, self.gemini_key, &config);

        match self.command {
            Command::Configure => configure(&mut config),
            Command::Show { city, audio, chart } => {
                let orchestrator = Orchestrator::from_config(&credentials, &config)?;
                let mut presenter =
                    TerminalPresenter::stdout(chart, config.speech.player_command.clone());
                let city = city.unwrap_or_else(|| config.default_city.clone());
                let mode = if audio { NarrationMode::Audio } else { NarrationMode::Text };

                let outcome = orchestrator.run(&city, mode, &mut presenter).await?;
                debug!(?outcome, "Lookup finished");
                Ok(())
            }
            Command::Listen { chart } => {
                let orchestrator = Orchestrator::from_config(&credentials, &config)?;
                let recognizer = MicrophoneRecognizer::from_config(&config.speech);
                let mut presenter =
                    TerminalPresenter::stdout(chart, config.speech.player_command.clone());

                let outcome = orchestrator
                    .listen_and_run(&recognizer, config.speech.listen_timeout(), &mut presenter)
                    .await?;
                debug!(?outcome, "Voice lookup finished");
                Ok(())
            }
            Command::Interactive { chart } => interactive(credentials, &config, chart).await,
        }
    }
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    println!("Leave a key blank to keep the current value.");

    let openweather =
        ask_secret("OpenWeather API key:").context("Failed to read OpenWeather API key")?;
    let gemini = ask_secret("Gemini API key:").context("Failed to read Gemini API key")?;

    let city = Text::new("Default city:")
        .with_default(&config.default_city)
        .prompt()
        .context("Failed to read default city")?;

    config.set_credentials(openweather, gemini);
    if !city.trim().is_empty() {
        config.default_city = city.trim().to_string();
    }
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn ask_secret(message: &str) -> Result<String, InquireError> {
    Password::new(message)
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
}

/// Ask for any key that is still missing; answers live only for this session.
///
/// Lookups cannot run without an OpenWeather key, so a blank answer is asked
/// again. A blank Gemini key is kept as missing and every description then
/// reports the error.
fn complete_credentials(
    mut credentials: Credentials,
    mut ask: impl FnMut(&str) -> Result<String, InquireError>,
) -> Result<Credentials, InquireError> {
    while credentials.openweather_api_key().is_none() {
        let key = ask("Enter OpenWeather Api Key")?;
        if key.trim().is_empty() {
            println!("An OpenWeather API key is required.");
        }
        credentials.openweather_api_key = non_blank(key);
    }
    if credentials.gemini_api_key().is_none() {
        credentials.gemini_api_key = non_blank(ask("Enter Gemini Api Key")?);
    }
    Ok(credentials)
}

fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

async fn interactive(
    credentials: Credentials,
    config: &Config,
    chart: PathBuf,
) -> anyhow::Result<()> {
    let credentials = complete_credentials(credentials, ask_secret)?;
    let orchestrator = Orchestrator::from_config(&credentials, config)?;
    let recognizer = MicrophoneRecognizer::from_config(&config.speech);

    println!("MeteoMind");

    loop {
        let choice = match Select::new("What next?", vec![GET_WEATHER, SPEAK, QUIT]).prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let mut presenter =
            TerminalPresenter::stdout(chart.clone(), config.speech.player_command.clone());

        let result = match choice {
            GET_WEATHER => {
                let city = match Text::new("Enter city name")
                    .with_default(&config.default_city)
                    .prompt()
                {
                    Ok(city) => city,
                    Err(InquireError::OperationCanceled) => continue,
                    Err(InquireError::OperationInterrupted) => break,
                    Err(e) => return Err(e.into()),
                };
                orchestrator
                    .run(&city, NarrationMode::Text, &mut presenter)
                    .await
                    .map(|_| ())
            }
            SPEAK => orchestrator
                .listen_and_run(&recognizer, config.speech.listen_timeout(), &mut presenter)
                .await
                .map(|_| ()),
            _ => break,
        };

        if let Err(e) = result {
            println!("Error found {e}");
        }
    }

    Ok(())
}
