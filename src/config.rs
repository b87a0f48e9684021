use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "ROUND_FORECAST_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub learning: LearningConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Decision thresholds for one prediction cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Confirmed rounds required before any analyzer output is trusted.
    pub min_history: usize,
    pub uncertainty_threshold: f64,
    /// Used instead of `uncertainty_threshold` during drift or reflexive
    /// correction.
    pub defensive_uncertainty_threshold: f64,
    pub min_quality: f64,
    pub high_confidence: f64,
    pub high_quality: f64,
    pub medium_confidence: f64,
    pub medium_quality: f64,
    pub prime_confidence_relief: f64,
    pub prime_quality_relief: f64,
    pub forced_jitter: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_history: 52,
            uncertainty_threshold: 95.0,
            defensive_uncertainty_threshold: 65.0,
            min_quality: 0.20,
            high_confidence: 0.62,
            high_quality: 0.55,
            medium_confidence: 0.55,
            medium_quality: 0.40,
            prime_confidence_relief: 0.03,
            prime_quality_relief: 0.05,
            forced_jitter: 0.008,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub performance_window: usize,
    pub regime_window: usize,
    pub probation_weight_cap: f64,
    pub probation_enter_below: f64,
    pub probation_exit_above: f64,
    pub min_weight: f64,
    pub decay_step: f64,
    pub reflexive_cycles: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            performance_window: 30,
            regime_window: 35,
            probation_weight_cap: 0.10,
            probation_enter_below: 0.40,
            probation_exit_above: 0.55,
            min_weight: 0.02,
            decay_step: 0.02,
            reflexive_cycles: 5,
        }
    }
}

/// "Prime time" is a UTC hour window `[prime_start_hour, prime_end_hour)`.
/// Outside it, confidence is pulled toward 0.5 by `off_prime_multiplier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub prime_start_hour: u32,
    pub prime_end_hour: u32,
    pub off_prime_multiplier: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prime_start_hour: 12,
            prime_end_hour: 22,
            off_prime_multiplier: 0.92,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn invalid(msg: impl Into<String>) -> Result<(), AppError> {
    Err(AppError::Config(msg.into()))
}

impl Config {
    /// Load from `path`, or from `$ROUND_FORECAST_CONFIG`, or from
    /// `config/default.toml`. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let config = match explicit {
            Some(p) => Self::from_file(&p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let e = &self.engine;
        if e.min_history == 0 {
            return invalid("engine.min_history must be >= 1");
        }
        if e.defensive_uncertainty_threshold > e.uncertainty_threshold {
            return invalid(format!(
                "engine.defensive_uncertainty_threshold ({}) must not exceed engine.uncertainty_threshold ({})",
                e.defensive_uncertainty_threshold,
                e.uncertainty_threshold
            ));
        }
        if e.medium_confidence > e.high_confidence || e.medium_quality > e.high_quality {
            return invalid("engine medium thresholds must not exceed high thresholds");
        }
        if !(0.0..=0.5).contains(&e.forced_jitter) {
            return invalid("engine.forced_jitter must be in [0, 0.5]");
        }

        let l = &self.learning;
        if l.performance_window == 0 || l.regime_window == 0 {
            return invalid("learning windows must be > 0");
        }
        if l.probation_enter_below > l.probation_exit_above {
            return invalid(format!(
                "learning.probation_enter_below ({}) must not exceed learning.probation_exit_above ({})",
                l.probation_enter_below,
                l.probation_exit_above
            ));
        }
        if !(0.0..=1.0).contains(&l.probation_weight_cap) {
            return invalid("learning.probation_weight_cap must be in [0, 1]");
        }
        if l.min_weight < 0.0 || l.decay_step <= 0.0 {
            return invalid("learning.min_weight must be >= 0 and learning.decay_step > 0");
        }

        let s = &self.session;
        if s.prime_start_hour > 24 || s.prime_end_hour > 24 {
            return invalid("session hours must be in 0..=24");
        }
        if !(0.0..=1.0).contains(&s.off_prime_multiplier) {
            return invalid("session.off_prime_multiplier must be in [0, 1]");
        }
        Ok(())
    }
}
