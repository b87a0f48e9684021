//! Signal analyzers.
//!
//! Each analyzer reads what it needs from a shared [`CycleContext`] and emits
//! at most one [`SignalVote`]. `None` means "not applicable this cycle" and is
//! never treated as a zero-weight vote.

pub mod entropy;
pub mod meta;
pub mod model;
pub mod momentum;
pub mod pattern;
pub mod reversion;
pub mod structure;
pub mod trend;
pub mod volatility;

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};

use crate::context::{
    analyze_market_entropy_state, analyze_trend_stability, market_regime_context, EntropyState,
    StabilityReport, TrendContext,
};
use crate::indicator::oscillator::macd;
use crate::indicator::stats::{rsi, std_dev};
use crate::model::{AdjustedVote, Class, ConfirmedRound, SignalCategory, SignalVote};

pub use model::{ThresholdScorer, VoteScorer};

/// Analyzers in the meta stage see the adjusted votes of the primary stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Primary,
    Meta,
}

pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> SignalCategory;

    fn stage(&self) -> Stage {
        Stage::Primary
    }

    fn analyze(&self, ctx: &CycleContext<'_>, prior: &[AdjustedVote]) -> Option<SignalVote>;
}

/// Numeric features shared by the model scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSet {
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub short_std: Option<f64>,
    pub long_std: Option<f64>,
    pub hour_sin: f64,
    pub hour_cos: f64,
}

impl FeatureSet {
    pub fn from_values(values: &[f64], now: DateTime<Utc>) -> Self {
        let hour = now.hour() as f64 + now.minute() as f64 / 60.0;
        let angle = hour / 24.0 * std::f64::consts::TAU;
        Self {
            rsi: rsi(values, 14),
            macd_histogram: macd(values, 12, 26, 9).map(|m| m.histogram),
            short_std: std_dev(values, 10),
            long_std: std_dev(values, 30),
            hour_sin: angle.sin(),
            hour_cos: angle.cos(),
        }
    }
}

/// Everything an analyzer may read for one cycle.
#[derive(Debug, Clone)]
pub struct CycleContext<'a> {
    pub rounds: &'a [ConfirmedRound],
    /// Outcome digits, newest first.
    pub values: Vec<f64>,
    /// Outcome classes, newest first.
    pub classes: Vec<Class>,
    pub trend: TrendContext,
    pub stability: StabilityReport,
    pub entropy_state: EntropyState,
    pub features: FeatureSet,
    /// Deterministic seed derived from the snapshot.
    pub seed: u64,
}

impl<'a> CycleContext<'a> {
    pub fn build(rounds: &'a [ConfirmedRound], now: DateTime<Utc>) -> Self {
        let values: Vec<f64> = rounds.iter().map(|r| r.number as f64).collect();
        let classes: Vec<Class> = rounds.iter().map(|r| r.class).collect();
        let trend = market_regime_context(&values);
        let stability = analyze_trend_stability(&classes, &values);
        let entropy_state = analyze_market_entropy_state(&classes, &values, &stability);
        let features = FeatureSet::from_values(&values, now);
        let newest = rounds.first().and_then(|r| r.period_number()).unwrap_or(0);
        let seed = newest ^ (rounds.len() as u64).rotate_left(32);
        Self {
            rounds,
            values,
            classes,
            trend,
            stability,
            entropy_state,
            features,
            seed,
        }
    }

    pub fn last_class(&self) -> Option<Class> {
        self.classes.first().copied()
    }
}

/// Build a vote whose weight is `base` scaled by `strength` clamped to
/// `[lo, hi]`.
pub(crate) fn scaled_vote(
    source: impl Into<String>,
    category: SignalCategory,
    prediction: Class,
    base: f64,
    strength: f64,
    (lo, hi): (f64, f64),
) -> SignalVote {
    let factor = if strength.is_finite() {
        strength.clamp(lo, hi)
    } else {
        lo
    };
    SignalVote::new(source, category, prediction, base * factor)
}

/// The standard analyzer set, primary stage first.
pub fn default_analyzers(scorer: Arc<dyn VoteScorer>) -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(momentum::RsiAnalyzer::default()),
        Box::new(momentum::StochasticAnalyzer::default()),
        Box::new(momentum::MacdAnalyzer::default()),
        Box::new(momentum::VelocityAnalyzer::default()),
        Box::new(reversion::BollingerAnalyzer::default()),
        Box::new(reversion::ZScoreAnalyzer::default()),
        Box::new(reversion::MaDeviationAnalyzer::default()),
        Box::new(reversion::VwapDeviationAnalyzer::default()),
        Box::new(trend::EmaStackAnalyzer::default()),
        Box::new(trend::IchimokuAnalyzer::default()),
        Box::new(pattern::StreakBreakAnalyzer::default()),
        Box::new(pattern::TwoPlusOneAnalyzer::default()),
        Box::new(pattern::DoubleAnalyzer::default()),
        Box::new(pattern::MirrorAnalyzer::default()),
        Box::new(pattern::AlternatingAnalyzer::default()),
        Box::new(pattern::NGramAnalyzer::default()),
        Box::new(pattern::CycleAnalyzer::default()),
        Box::new(volatility::SqueezeAnalyzer::default()),
        Box::new(volatility::VolatilityPersistenceAnalyzer::default()),
        Box::new(volatility::FractalEfficiencyAnalyzer::default()),
        Box::new(entropy::EntropyAnalyzer::default()),
        Box::new(structure::HarmonicAnalyzer::default()),
        Box::new(structure::EntanglementAnalyzer::default()),
        Box::new(meta::MetaSignalAnalyzer::default()),
        Box::new(model::ModelSignalAnalyzer::new(scorer)),
        Box::new(meta::BayesianAnalyzer::default()),
        Box::new(meta::MonteCarloAnalyzer::default()),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn rounds_from_digits(digits: &[u8]) -> Vec<ConfirmedRound> {
        let n = digits.len() as u64;
        digits
            .iter()
            .enumerate()
            .map(|(i, d)| ConfirmedRound {
                period: (1000 + n - i as u64).to_string(),
                number: *d,
                class: Class::from_digit(*d),
            })
            .collect()
    }

    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }
}
