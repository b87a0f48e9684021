use serde::{Deserialize, Serialize};

use crate::model::round::Class;

/// Coarse family an analyzer belongs to. Attached at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Trend,
    Momentum,
    MeanReversion,
    Pattern,
    Volatility,
    Probabilistic,
    Ml,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 7] = [
        SignalCategory::Trend,
        SignalCategory::Momentum,
        SignalCategory::MeanReversion,
        SignalCategory::Pattern,
        SignalCategory::Volatility,
        SignalCategory::Probabilistic,
        SignalCategory::Ml,
    ];
}

/// Raw vote emitted by one analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalVote {
    pub source: String,
    pub category: SignalCategory,
    pub prediction: Class,
    pub weight: f64,
}

impl SignalVote {
    pub fn new(
        source: impl Into<String>,
        category: SignalCategory,
        prediction: Class,
        weight: f64,
    ) -> Self {
        Self {
            source: source.into(),
            category,
            prediction,
            weight: weight.max(0.0),
        }
    }
}

/// Vote after performance learning and regime scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedVote {
    pub source: String,
    pub category: SignalCategory,
    pub prediction: Class,
    pub weight: f64,
    pub adjusted_weight: f64,
    #[serde(default)]
    pub is_on_probation: bool,
}

impl AdjustedVote {
    pub fn from_vote(vote: SignalVote, adjusted_weight: f64, is_on_probation: bool) -> Self {
        Self {
            source: vote.source,
            category: vote.category,
            prediction: vote.prediction,
            weight: vote.weight,
            adjusted_weight: adjusted_weight.max(0.0),
            is_on_probation,
        }
    }
}

/// Sum adjusted weights per class as `(big, small)`.
pub fn class_weights(votes: &[AdjustedVote]) -> (f64, f64) {
    votes.iter().fold((0.0, 0.0), |(big, small), v| match v.prediction {
        Class::Big => (big + v.adjusted_weight, small),
        Class::Small => (big, small + v.adjusted_weight),
    })
}
