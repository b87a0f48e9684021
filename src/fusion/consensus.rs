use std::collections::BTreeMap;

use crate::context::TrendStrength;
use crate::model::{class_weights, AdjustedVote, Class, SignalCategory, SignalVote};

pub const FACTOR_RANGE: (f64, f64) = (0.4, 1.6);
const CONFLICT_DISCOUNT: f64 = 0.6;
pub const SUPERPOSITION_SOURCE: &str = "Superposition";

/// Agreement across signal categories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consensus {
    /// `(dominant - other) / categories` in `[0, 1]`.
    pub score: f64,
    /// Multiplier applied to the dominant class.
    pub factor: f64,
    pub dominant: Option<Class>,
    pub categories: usize,
    /// Trend and momentum disagree under a strong trend.
    pub trend_momentum_conflict: bool,
}

impl Default for Consensus {
    fn default() -> Self {
        Self {
            score: 0.0,
            factor: 1.0,
            dominant: None,
            categories: 0,
            trend_momentum_conflict: false,
        }
    }
}

/// Net class of each category that voted, by summed adjusted weight.
/// A category whose votes cancel out maps to `None`.
pub fn category_directions(votes: &[AdjustedVote]) -> BTreeMap<SignalCategory, Option<Class>> {
    let mut nets: BTreeMap<SignalCategory, f64> = BTreeMap::new();
    for v in votes {
        *nets.entry(v.category).or_default() += v.prediction.sign() * v.adjusted_weight;
    }
    nets.into_iter()
        .map(|(cat, net)| {
            let class = if net > 0.0 {
                Some(Class::Big)
            } else if net < 0.0 {
                Some(Class::Small)
            } else {
                None
            };
            (cat, class)
        })
        .collect()
}

/// `categories` counts every category with at least one vote, neutral ones
/// included.
pub fn category_consensus(votes: &[AdjustedVote], strength: TrendStrength) -> Consensus {
    let directions = category_directions(votes);
    let categories = directions.len();
    let big = directions
        .values()
        .filter(|c| **c == Some(Class::Big))
        .count();
    let small = directions
        .values()
        .filter(|c| **c == Some(Class::Small))
        .count();
    if big + small == 0 {
        return Consensus {
            categories,
            ..Consensus::default()
        };
    }
    let dominant = if big > small {
        Class::Big
    } else if small > big {
        Class::Small
    } else {
        let (bw, sw) = class_weights(votes);
        if bw >= sw {
            Class::Big
        } else {
            Class::Small
        }
    };
    let score = big.abs_diff(small) as f64 / categories as f64;
    let mut factor = (FACTOR_RANGE.0 + 1.2 * score).clamp(FACTOR_RANGE.0, FACTOR_RANGE.1);

    let conflict = matches!(
        (
            directions.get(&SignalCategory::Trend),
            directions.get(&SignalCategory::Momentum),
        ),
        (Some(Some(t)), Some(Some(m))) if t != m
    ) && strength == TrendStrength::Strong;
    if conflict {
        factor *= CONFLICT_DISCOUNT;
    }

    Consensus {
        score,
        factor,
        dominant: Some(dominant),
        categories,
        trend_momentum_conflict: conflict,
    }
}

/// Meta-vote for the heavier class, sized by how lopsided the weights are
/// and by the consensus factor.
pub fn superposition_vote(votes: &[AdjustedVote], consensus: &Consensus) -> Option<AdjustedVote> {
    let (big, small) = class_weights(votes);
    let total = big + small;
    if total <= f64::EPSILON || big == small {
        return None;
    }
    let (class, heavier) = if big > small {
        (Class::Big, big)
    } else {
        (Class::Small, small)
    };
    let weight = (heavier / total - 0.5) * 2.0 * consensus.factor;
    if weight <= 0.0 {
        return None;
    }
    let vote = SignalVote::new(
        SUPERPOSITION_SOURCE,
        SignalCategory::Probabilistic,
        class,
        weight,
    );
    Some(AdjustedVote::from_vote(vote, weight, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(cat: SignalCategory, class: Class, w: f64) -> AdjustedVote {
        AdjustedVote::from_vote(SignalVote::new("t", cat, class, w), w, false)
    }

    #[test]
    fn unanimous_categories_reach_the_top_factor() {
        let votes = vec![
            v(SignalCategory::Pattern, Class::Small, 0.8),
            v(SignalCategory::Momentum, Class::Small, 0.7),
            v(SignalCategory::Probabilistic, Class::Small, 0.6),
        ];
        let c = category_consensus(&votes, TrendStrength::Weak);
        assert_eq!(c.dominant, Some(Class::Small));
        assert!((c.score - 1.0).abs() < 1e-12);
        assert!((c.factor - 1.6).abs() < 1e-12);
    }

    #[test]
    fn split_categories_sit_at_the_floor() {
        let votes = vec![
            v(SignalCategory::Pattern, Class::Small, 0.8),
            v(SignalCategory::Trend, Class::Big, 0.7),
        ];
        let c = category_consensus(&votes, TrendStrength::Weak);
        assert!((c.factor - 0.4).abs() < 1e-12);
        assert_eq!(c.dominant, Some(Class::Small));
    }

    #[test]
    fn strong_trend_conflict_is_discounted() {
        let votes = vec![
            v(SignalCategory::Trend, Class::Big, 1.0),
            v(SignalCategory::Momentum, Class::Small, 0.5),
            v(SignalCategory::Pattern, Class::Big, 0.5),
        ];
        let weak = category_consensus(&votes, TrendStrength::Weak);
        let strong = category_consensus(&votes, TrendStrength::Strong);
        assert!(strong.trend_momentum_conflict);
        assert!((strong.factor - weak.factor * 0.6).abs() < 1e-12);
    }

    #[test]
    fn cancelled_category_still_counts() {
        let votes = vec![
            v(SignalCategory::Pattern, Class::Big, 0.5),
            v(SignalCategory::Pattern, Class::Small, 0.5),
            v(SignalCategory::Momentum, Class::Small, 0.7),
        ];
        let directions = category_directions(&votes);
        assert_eq!(directions.get(&SignalCategory::Pattern), Some(&None));
        let c = category_consensus(&votes, TrendStrength::Weak);
        assert_eq!(c.categories, 2);
        assert_eq!(c.dominant, Some(Class::Small));
        assert!((c.score - 0.5).abs() < 1e-12);
        assert!((c.factor - 1.0).abs() < 1e-12);
    }

    #[test]
    fn all_neutral_categories_leave_scores_alone() {
        let votes = vec![
            v(SignalCategory::Trend, Class::Big, 0.4),
            v(SignalCategory::Trend, Class::Small, 0.4),
        ];
        let c = category_consensus(&votes, TrendStrength::Strong);
        assert_eq!(c.categories, 1);
        assert_eq!(c.dominant, None);
        assert_eq!(c.factor, 1.0);
    }

    #[test]
    fn superposition_follows_heavier_class() {
        let votes = vec![
            v(SignalCategory::Pattern, Class::Small, 0.9),
            v(SignalCategory::Trend, Class::Big, 0.3),
        ];
        let c = category_consensus(&votes, TrendStrength::Weak);
        let sp = superposition_vote(&votes, &c).unwrap();
        assert_eq!(sp.prediction, Class::Small);
        assert_eq!(sp.source, SUPERPOSITION_SOURCE);
        assert!(superposition_vote(&[], &c).is_none());
    }
}
