use std::sync::Arc;

use crate::analyzer::{scaled_vote, Analyzer, CycleContext, FeatureSet};
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

/// Maps a feature vector to a class and a conviction in `[0, 1]`.
pub trait VoteScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, features: &FeatureSet) -> Option<(Class, f64)>;
}

/// Feature-threshold rule used until a trained model is plugged in.
/// Conviction is damped toward local midnight through the cyclical hour
/// encoding, by `overnight_damping` at 00:00 and not at all at 12:00.
#[derive(Debug, Clone)]
pub struct ThresholdScorer {
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub overnight_damping: f64,
}

impl Default for ThresholdScorer {
    fn default() -> Self {
        Self {
            rsi_low: 42.0,
            rsi_high: 58.0,
            overnight_damping: 0.15,
        }
    }
}

impl VoteScorer for ThresholdScorer {
    fn name(&self) -> &str {
        "threshold"
    }

    fn score(&self, features: &FeatureSet) -> Option<(Class, f64)> {
        let rsi = features.rsi?;
        let hist = features.macd_histogram?;
        let calm = match (features.short_std, features.long_std) {
            (Some(s), Some(l)) if l > f64::EPSILON => (l / s.max(f64::EPSILON)).min(1.0),
            _ => 0.5,
        };
        // hour_cos is 1 at midnight, -1 at noon
        let daylight = 1.0 - self.overnight_damping * (0.5 + 0.5 * features.hour_cos);
        let conviction = (0.5 + 0.5 * calm) * daylight;
        if rsi < self.rsi_low && hist > 0.0 {
            Some((Class::Big, conviction))
        } else if rsi > self.rsi_high && hist < 0.0 {
            Some((Class::Small, conviction))
        } else {
            None
        }
    }
}

pub struct ModelSignalAnalyzer {
    scorer: Arc<dyn VoteScorer>,
    base_weight: f64,
}

impl ModelSignalAnalyzer {
    pub fn new(scorer: Arc<dyn VoteScorer>) -> Self {
        Self {
            scorer,
            base_weight: 0.7,
        }
    }
}

impl Analyzer for ModelSignalAnalyzer {
    fn name(&self) -> &'static str {
        "model"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Ml
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let (class, conviction) = self.scorer.score(&ctx.features)?;
        Some(scaled_vote(
            "ML-Model",
            self.category(),
            class,
            self.base_weight,
            conviction,
            (0.5, 1.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(rsi: f64, hist: f64) -> FeatureSet {
        FeatureSet {
            rsi: Some(rsi),
            macd_histogram: Some(hist),
            short_std: Some(2.0),
            long_std: Some(2.0),
            hour_sin: 0.0,
            hour_cos: -1.0,
        }
    }

    #[test]
    fn threshold_rule() {
        let s = ThresholdScorer::default();
        assert_eq!(s.score(&features(35.0, 0.4)), Some((Class::Big, 1.0)));
        assert_eq!(s.score(&features(65.0, -0.4)), Some((Class::Small, 1.0)));
        assert_eq!(s.score(&features(65.0, 0.4)), None);
        let mut missing = features(35.0, 0.4);
        missing.rsi = None;
        assert_eq!(s.score(&missing), None);
    }

    #[test]
    fn conviction_is_damped_overnight() {
        let s = ThresholdScorer::default();
        let mut midnight = features(35.0, 0.4);
        midnight.hour_cos = 1.0;
        let (_, night) = s.score(&midnight).unwrap();
        assert!((night - 0.85).abs() < 1e-12);

        let mut evening = features(35.0, 0.4);
        evening.hour_sin = -1.0;
        evening.hour_cos = 0.0;
        let (_, six_pm) = s.score(&evening).unwrap();
        assert!((six_pm - 0.925).abs() < 1e-12);
    }

    #[test]
    fn feature_set_encodes_hour_on_the_circle() {
        use chrono::{TimeZone, Utc};
        let noon = FeatureSet::from_values(&[], Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap());
        assert!((noon.hour_cos + 1.0).abs() < 1e-12);
        assert!(noon.hour_sin.abs() < 1e-12);
        assert_eq!(noon.rsi, None);
    }

    struct AlwaysBig;

    impl VoteScorer for AlwaysBig {
        fn name(&self) -> &str {
            "always_big"
        }

        fn score(&self, _features: &FeatureSet) -> Option<(Class, f64)> {
            Some((Class::Big, 0.8))
        }
    }

    #[test]
    fn custom_scorer_is_pluggable() {
        use crate::analyzer::test_support::{fixed_now, rounds_from_digits};
        let rounds = rounds_from_digits(&[3; 10]);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let analyzer = ModelSignalAnalyzer::new(Arc::new(AlwaysBig));
        let vote = analyzer.analyze(&ctx, &[]).unwrap();
        assert_eq!(vote.source, "ML-Model");
        assert!((vote.weight - 0.56).abs() < 1e-12);
    }
}
