use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::context::{EntropyState, InstabilityReason, VolatilityLevel};
use crate::learning::DriftState;
use crate::model::{class_weights, AdjustedVote, Class, SignalCategory};

const REFLEXIVE_PENALTY: f64 = 80.0;
const DRIFT_PENALTY: f64 = 70.0;
const WARNING_PENALTY: f64 = 40.0;
const TRANSITION_PENALTY: f64 = 25.0;
const HIGH_VOLATILITY_PENALTY: f64 = 20.0;
const CONSISTENCY_FLOOR: f64 = 0.6;
const CONSISTENCY_SCALE: f64 = 40.0;
const CONFLUENCE_TARGET: usize = 3;
const CONFLUENCE_STEP: f64 = 6.0;
const GLOBAL_ACCURACY_FLOOR: f64 = 0.48;
const GLOBAL_ACCURACY_SCALE: f64 = 150.0;

/// `|big - small| / (big + small)` over adjusted weights; 0 with no votes.
pub fn direction_consistency(votes: &[AdjustedVote]) -> f64 {
    let (big, small) = class_weights(votes);
    let total = big + small;
    if total <= f64::EPSILON {
        0.0
    } else {
        (big - small).abs() / total
    }
}

/// Distinct categories voting for `class`.
pub fn path_confluence(votes: &[AdjustedVote], class: Class) -> usize {
    votes
        .iter()
        .filter(|v| v.prediction == class && v.adjusted_weight > 0.0)
        .map(|v| v.category)
        .collect::<BTreeSet<SignalCategory>>()
        .len()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UncertaintyInputs {
    pub reflexive_active: bool,
    pub drift: DriftState,
    pub instability: Option<InstabilityReason>,
    pub entropy_state: EntropyState,
    pub consistency: f64,
    pub confluence: usize,
    pub transitioning: bool,
    pub volatility: VolatilityLevel,
    pub global_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyComponent {
    pub label: String,
    pub points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyScore {
    pub total: f64,
    pub components: Vec<UncertaintyComponent>,
}

impl UncertaintyScore {
    fn add(&mut self, label: &str, points: f64) {
        if points <= 0.0 {
            return;
        }
        self.total += points;
        self.components.push(UncertaintyComponent {
            label: label.to_string(),
            points,
        });
    }
}

/// Additive uncertainty. Unbounded; only compared against thresholds.
pub fn uncertainty_score(inputs: &UncertaintyInputs) -> UncertaintyScore {
    let mut score = UncertaintyScore::default();
    if inputs.reflexive_active {
        score.add("reflexive_correction", REFLEXIVE_PENALTY);
    }
    match inputs.drift {
        DriftState::Drift => score.add("drift", DRIFT_PENALTY),
        DriftState::Warning => score.add("drift_warning", WARNING_PENALTY),
        DriftState::Stable => {}
    }
    if let Some(reason) = inputs.instability {
        score.add("instability", reason.uncertainty_penalty());
    }
    score.add("entropy_state", inputs.entropy_state.uncertainty_penalty());
    score.add(
        "low_consistency",
        (CONSISTENCY_FLOOR - inputs.consistency).max(0.0) * CONSISTENCY_SCALE,
    );
    score.add(
        "low_confluence",
        CONFLUENCE_TARGET.saturating_sub(inputs.confluence) as f64 * CONFLUENCE_STEP,
    );
    if inputs.transitioning {
        score.add("regime_transition", TRANSITION_PENALTY);
    }
    if inputs.volatility == VolatilityLevel::High {
        score.add("high_volatility", HIGH_VOLATILITY_PENALTY);
    }
    score.add(
        "low_global_accuracy",
        (GLOBAL_ACCURACY_FLOOR - inputs.global_accuracy).max(0.0) * GLOBAL_ACCURACY_SCALE,
    );
    score
}
