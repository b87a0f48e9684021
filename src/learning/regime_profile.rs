use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LearningConfig;
use crate::context::MacroRegime;
use crate::model::SignalCategory;

pub const MULTIPLIER_RANGE: (f64, f64) = (0.20, 1.9);
pub const AGGRESSION_RANGE: (f64, f64) = (0.30, 1.8);
const BASE_LEARNING_RATE: f64 = 0.05;
const FILL_RATIO: f64 = 0.7;
const GOOD_ACCURACY: f64 = 0.62;
const BAD_ACCURACY: f64 = 0.38;
/// Weight applied to votes from categories a regime does not favour.
pub const INACTIVE_CATEGORY_FACTOR: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeProfile {
    pub base_weight_multiplier: f64,
    pub active_signal_types: BTreeSet<SignalCategory>,
    pub contextual_aggression: f64,
    pub recent_accuracy: VecDeque<u8>,
    pub total_predictions: u32,
    pub correct_predictions: u32,
}

impl RegimeProfile {
    fn new(multiplier: f64, aggression: f64, active: &[SignalCategory]) -> Self {
        Self {
            base_weight_multiplier: multiplier,
            active_signal_types: active.iter().copied().collect(),
            contextual_aggression: aggression,
            recent_accuracy: VecDeque::new(),
            total_predictions: 0,
            correct_predictions: 0,
        }
    }

    pub fn recent_accuracy(&self) -> Option<f64> {
        if self.recent_accuracy.is_empty() {
            return None;
        }
        let hits = self.recent_accuracy.iter().filter(|v| **v == 1).count();
        Some(hits as f64 / self.recent_accuracy.len() as f64)
    }

    /// Multiplier for a vote of `category` in this regime.
    pub fn category_factor(&self, category: SignalCategory) -> f64 {
        if self.active_signal_types.contains(&category) {
            1.0
        } else {
            INACTIVE_CATEGORY_FACTOR
        }
    }
}

fn initial_profile(regime: MacroRegime) -> RegimeProfile {
    use SignalCategory::*;
    const TRENDING: &[SignalCategory] = &[Trend, Momentum, Volatility, Probabilistic, Ml];
    const RANGING: &[SignalCategory] = &[MeanReversion, Pattern, Probabilistic, Ml];
    match regime {
        MacroRegime::StrongTrendVolatile => RegimeProfile::new(0.9, 0.9, TRENDING),
        MacroRegime::StrongTrendSteady => RegimeProfile::new(1.15, 1.1, TRENDING),
        MacroRegime::StrongTrendQuiet => RegimeProfile::new(1.1, 1.0, TRENDING),
        MacroRegime::ModerateTrendVolatile => RegimeProfile::new(0.9, 0.85, TRENDING),
        MacroRegime::ModerateTrendSteady => RegimeProfile::new(1.05, 1.0, TRENDING),
        MacroRegime::ModerateTrendQuiet => RegimeProfile::new(1.0, 1.0, TRENDING),
        MacroRegime::WeakTrendVolatile => {
            RegimeProfile::new(0.85, 0.8, &[Momentum, MeanReversion, Volatility, Probabilistic])
        }
        MacroRegime::WeakTrendQuiet => {
            RegimeProfile::new(0.95, 0.9, &[Trend, MeanReversion, Pattern, Probabilistic, Ml])
        }
        MacroRegime::RangingVolatile => RegimeProfile::new(0.8, 0.7, RANGING),
        MacroRegime::RangingChoppy => RegimeProfile::new(0.85, 0.8, RANGING),
        MacroRegime::RangingQuiet => RegimeProfile::new(1.0, 0.95, RANGING),
        MacroRegime::Default => RegimeProfile::new(1.0, 1.0, &SignalCategory::ALL),
    }
}

/// Learning rate scaled by how far the global accuracy sits from 0.5:
/// faster when the system is losing, slower when it is winning.
pub fn regime_learning_rate(global_accuracy: f64) -> f64 {
    if global_accuracy < 0.5 {
        BASE_LEARNING_RATE * (1.0 + (0.5 - global_accuracy) * 5.0)
    } else {
        BASE_LEARNING_RATE / (1.0 + (global_accuracy - 0.5) * 5.0)
    }
}

/// One profile per macro regime. Lookups of a regime missing from the book
/// fall back to the `Default` profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeBook {
    profiles: BTreeMap<MacroRegime, RegimeProfile>,
}

impl Default for RegimeBook {
    fn default() -> Self {
        Self {
            profiles: MacroRegime::CATALOG
                .iter()
                .map(|r| (*r, initial_profile(*r)))
                .collect(),
        }
    }
}

impl RegimeBook {
    pub fn profile(&self, regime: MacroRegime) -> RegimeProfile {
        self.profiles
            .get(&regime)
            .or_else(|| self.profiles.get(&MacroRegime::Default))
            .cloned()
            .unwrap_or_else(|| initial_profile(MacroRegime::Default))
    }

    /// Push the correctness of a prediction made under `regime` and nudge
    /// its multipliers once the window is sufficiently full.
    pub fn record_outcome(
        &mut self,
        regime: MacroRegime,
        correct: bool,
        global_accuracy: f64,
        cfg: &LearningConfig,
    ) {
        let profile = self
            .profiles
            .entry(regime)
            .or_insert_with(|| initial_profile(regime));
        profile.total_predictions = profile.total_predictions.saturating_add(1);
        if correct {
            profile.correct_predictions = profile.correct_predictions.saturating_add(1);
        }
        profile.recent_accuracy.push_back(correct as u8);
        while profile.recent_accuracy.len() > cfg.regime_window {
            profile.recent_accuracy.pop_front();
        }

        let needed = (cfg.regime_window as f64 * FILL_RATIO).ceil() as usize;
        if profile.recent_accuracy.len() < needed {
            return;
        }
        let Some(acc) = profile.recent_accuracy() else {
            return;
        };
        let rate = regime_learning_rate(global_accuracy);
        let step = if acc > GOOD_ACCURACY {
            rate
        } else if acc < BAD_ACCURACY {
            -rate
        } else {
            return;
        };
        profile.base_weight_multiplier = (profile.base_weight_multiplier + step)
            .clamp(MULTIPLIER_RANGE.0, MULTIPLIER_RANGE.1);
        profile.contextual_aggression = (profile.contextual_aggression + step)
            .clamp(AGGRESSION_RANGE.0, AGGRESSION_RANGE.1);
        debug!(
            regime = ?regime,
            accuracy = acc,
            multiplier = profile.base_weight_multiplier,
            aggression = profile.contextual_aggression,
            "regime profile nudged"
        );
    }
}
