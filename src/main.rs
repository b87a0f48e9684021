use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use round_forecast::config::Config;
use round_forecast::model::read_history;
use round_forecast::{CycleCarryState, Forecaster, LearningState};

#[derive(Parser)]
#[command(name = "round-forecast")]
#[command(about = "Forecast the next BIG/SMALL round from a history snapshot")]
struct Cli {
    /// JSON array of history records, newest first
    #[arg(long)]
    history: PathBuf,

    /// Carry state returned by the previous run
    #[arg(long)]
    carry: Option<PathBuf>,

    /// TOML config (defaults to $ROUND_FORECAST_CONFIG or config/default.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for tie-breaks and forced calls
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(&config.logging.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    init_tracing(&config);

    let history = read_history(&cli.history)
        .with_context(|| format!("failed to read history from {}", cli.history.display()))?;
    let carry: CycleCarryState = match &cli.carry {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse carry state {}", path.display()))?
        }
        None => CycleCarryState::default(),
    };

    tracing::info!(
        records = history.len(),
        carry = cli.carry.is_some(),
        "Starting round-forecast"
    );

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let forecaster = Forecaster::new(config);
    let mut state = LearningState::new();
    let result = forecaster.predict(&history, &carry, &mut state, Utc::now(), &mut rng);

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
