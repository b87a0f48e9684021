use serde::{Deserialize, Serialize};

use crate::indicator::stats::{alternation_rate, entropy, std_dev};
use crate::model::Class;

const STABILITY_WINDOW: usize = 20;
const STABILITY_VOL_WINDOW: usize = 15;
const DOMINANCE_LIMIT: f64 = 0.80;
const ENTROPY_FLOOR: f64 = 0.45;
const VOLATILITY_LIMIT: f64 = 3.3;
const ALTERNATION_LIMIT: f64 = 0.75;

const SHORT_ENTROPY_WINDOW: usize = 10;
const LONG_ENTROPY_WINDOW: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstabilityReason {
    ExtremeDominance,
    LowEntropy,
    ExcessiveVolatility,
    ExcessiveAlternation,
}

impl InstabilityReason {
    /// Contribution to the cycle uncertainty score.
    pub fn uncertainty_penalty(self) -> f64 {
        match self {
            InstabilityReason::ExtremeDominance => 50.0,
            InstabilityReason::LowEntropy => 45.0,
            InstabilityReason::ExcessiveVolatility => 45.0,
            InstabilityReason::ExcessiveAlternation => 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub reason: Option<InstabilityReason>,
    pub dominance: f64,
    pub entropy: f64,
    pub volatility: Option<f64>,
    pub alternation_rate: f64,
}

impl StabilityReport {
    pub fn is_unstable(&self) -> bool {
        self.reason.is_some()
    }
}

/// Flags an unstable tape from class dominance, entropy, numeric volatility
/// and alternation rate over the newest confirmed rounds.
pub fn analyze_trend_stability(classes: &[Class], values: &[f64]) -> StabilityReport {
    let volatility = std_dev(values, STABILITY_VOL_WINDOW);
    if classes.len() < STABILITY_WINDOW {
        return StabilityReport {
            reason: None,
            dominance: 0.5,
            entropy: 1.0,
            volatility,
            alternation_rate: 0.5,
        };
    }

    let window = &classes[..STABILITY_WINDOW];
    let big = window.iter().filter(|c| **c == Class::Big).count() as f64;
    let share = big / STABILITY_WINDOW as f64;
    let dominance = share.max(1.0 - share);
    let ent = entropy(classes, STABILITY_WINDOW);
    let alternation = alternation_rate(classes, STABILITY_WINDOW).unwrap_or(0.5);

    let reason = if dominance >= DOMINANCE_LIMIT {
        Some(InstabilityReason::ExtremeDominance)
    } else if ent < ENTROPY_FLOOR {
        Some(InstabilityReason::LowEntropy)
    } else if volatility.is_some_and(|v| v > VOLATILITY_LIMIT) {
        Some(InstabilityReason::ExcessiveVolatility)
    } else if alternation > ALTERNATION_LIMIT {
        Some(InstabilityReason::ExcessiveAlternation)
    } else {
        None
    };

    StabilityReport {
        reason,
        dominance,
        entropy: ent,
        volatility,
        alternation_rate: alternation,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntropyState {
    Orderly,
    StableChaos,
    RisingChaos,
    SubsidingChaos,
    #[default]
    StableModerate,
    PotentialChaosFromInstability,
}

impl EntropyState {
    pub fn is_chaos(self) -> bool {
        matches!(
            self,
            EntropyState::StableChaos
                | EntropyState::RisingChaos
                | EntropyState::SubsidingChaos
                | EntropyState::PotentialChaosFromInstability
        )
    }

    pub fn uncertainty_penalty(self) -> f64 {
        match self {
            EntropyState::RisingChaos => 45.0,
            EntropyState::PotentialChaosFromInstability => 40.0,
            EntropyState::StableChaos | EntropyState::SubsidingChaos => 35.0,
            EntropyState::Orderly | EntropyState::StableModerate => 0.0,
        }
    }
}

fn volatility_ratio(values: &[f64]) -> f64 {
    let recent = std_dev(values, SHORT_ENTROPY_WINDOW);
    let prior = values
        .get(SHORT_ENTROPY_WINDOW..)
        .and_then(|older| std_dev(older, SHORT_ENTROPY_WINDOW));
    match (recent, prior) {
        (Some(r), Some(p)) if p > f64::EPSILON => r / p,
        (Some(r), Some(_)) if r > f64::EPSILON => 2.0,
        _ => 1.0,
    }
}

/// Classifies the entropy regime from short (10) vs long (25) window entropy
/// and the short-window volatility ratio.
pub fn analyze_market_entropy_state(
    classes: &[Class],
    values: &[f64],
    stability: &StabilityReport,
) -> EntropyState {
    let base = if classes.len() < LONG_ENTROPY_WINDOW {
        EntropyState::StableModerate
    } else {
        let short = entropy(classes, SHORT_ENTROPY_WINDOW);
        let long = entropy(classes, LONG_ENTROPY_WINDOW);
        let vol_ratio = volatility_ratio(values);

        if short >= 0.9 && long >= 0.9 {
            if vol_ratio > 1.3 {
                EntropyState::RisingChaos
            } else {
                EntropyState::StableChaos
            }
        } else if short >= 0.85 && (short > long + 0.1 || vol_ratio > 1.3) {
            EntropyState::RisingChaos
        } else if long >= 0.85 && short < long - 0.15 {
            EntropyState::SubsidingChaos
        } else if short < 0.6 && long < 0.75 {
            EntropyState::Orderly
        } else {
            EntropyState::StableModerate
        }
    };

    match base {
        EntropyState::Orderly | EntropyState::StableModerate if stability.is_unstable() => {
            EntropyState::PotentialChaosFromInstability
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(n: usize) -> (Vec<Class>, Vec<f64>) {
        let classes: Vec<Class> = (0..n)
            .map(|i| if i % 2 == 0 { Class::Big } else { Class::Small })
            .collect();
        let values = classes
            .iter()
            .map(|c| if *c == Class::Big { 7.0 } else { 2.0 })
            .collect();
        (classes, values)
    }

    #[test]
    fn alternation_is_unstable_and_chaotic() {
        let (classes, values) = alternating(40);
        let report = analyze_trend_stability(&classes, &values);
        assert_eq!(report.reason, Some(InstabilityReason::ExcessiveAlternation));
        let state = analyze_market_entropy_state(&classes, &values, &report);
        assert_eq!(state, EntropyState::StableChaos);
    }

    #[test]
    fn one_sided_tape_is_dominated() {
        let classes = vec![Class::Big; 30];
        let values = vec![7.0; 30];
        let report = analyze_trend_stability(&classes, &values);
        assert_eq!(report.reason, Some(InstabilityReason::ExtremeDominance));
        let state = analyze_market_entropy_state(&classes, &values, &report);
        assert_eq!(state, EntropyState::PotentialChaosFromInstability);
    }

    #[test]
    fn short_window_is_stable() {
        let report = analyze_trend_stability(&[Class::Big; 5], &[7.0; 5]);
        assert!(!report.is_unstable());
    }
}
