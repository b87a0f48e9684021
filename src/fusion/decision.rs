use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::context::RegimeProbabilities;
use crate::fusion::consensus::Consensus;
use crate::model::{class_weights, AdjustedVote, Class};

pub const DISPLAY_BOUNDS: (f64, f64) = (0.001, 0.999);
const REGIME_TILT: f64 = 0.2;
const UNCERTAINTY_SPAN: f64 = 120.0;

/// Per-class scores after regime tilt and consensus scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub big: f64,
    pub small: f64,
}

impl ClassScores {
    pub fn total(&self) -> f64 {
        self.big + self.small
    }

    /// Heavier class, ties broken by a coin flip.
    pub fn winner<R: Rng + ?Sized>(&self, rng: &mut R) -> Class {
        if self.big > self.small {
            Class::Big
        } else if self.small > self.big {
            Class::Small
        } else if rng.random_bool(0.5) {
            Class::Big
        } else {
            Class::Small
        }
    }

    pub fn share(&self, class: Class) -> f64 {
        let total = self.total();
        if total <= f64::EPSILON {
            return 0.5;
        }
        match class {
            Class::Big => self.big / total,
            Class::Small => self.small / total,
        }
    }
}

pub fn final_scores(
    votes: &[AdjustedVote],
    consensus: &Consensus,
    regime: &RegimeProbabilities,
) -> ClassScores {
    let (big, small) = class_weights(votes);
    let tilt = regime.directional_tilt() * REGIME_TILT;
    let mut scores = ClassScores {
        big: big * (1.0 + tilt),
        small: small * (1.0 - tilt),
    };
    let complement = 2.0 - consensus.factor;
    match consensus.dominant {
        Some(Class::Big) => {
            scores.big *= consensus.factor;
            scores.small *= complement;
        }
        Some(Class::Small) => {
            scores.small *= consensus.factor;
            scores.big *= complement;
        }
        None => {}
    }
    scores
}

/// Pull `confidence` toward 0.5 by each multiplier in turn, then by the
/// uncertainty score.
pub fn compress_confidence(confidence: f64, multipliers: &[f64], uncertainty: f64) -> f64 {
    let mut edge = confidence - 0.5;
    for m in multipliers {
        edge *= m.clamp(0.0, 1.0);
    }
    edge *= 1.0 - (uncertainty / UNCERTAINTY_SPAN).clamp(0.0, 1.0);
    (0.5 + edge).clamp(0.0, 1.0)
}

/// Blend of direction consistency, confluence and headroom under the
/// uncertainty scale, in `[0, 1]`.
pub fn quality_score(consistency: f64, confluence_ratio: f64, uncertainty: f64) -> f64 {
    let headroom = 1.0 - (uncertainty / 100.0).clamp(0.0, 1.0);
    (0.5 * consistency.clamp(0.0, 1.0) + 0.3 * confluence_ratio.clamp(0.0, 1.0) + 0.2 * headroom)
        .clamp(0.0, 1.0)
}

/// 3 = high, 2 = medium, 1 = low. Prime time relaxes both thresholds.
pub fn confidence_level(confidence: f64, quality: f64, prime_time: bool, cfg: &EngineConfig) -> u8 {
    let (conf_relief, quality_relief) = if prime_time {
        (cfg.prime_confidence_relief, cfg.prime_quality_relief)
    } else {
        (0.0, 0.0)
    };
    if confidence >= cfg.high_confidence - conf_relief && quality >= cfg.high_quality - quality_relief
    {
        3
    } else if confidence >= cfg.medium_confidence - conf_relief
        && quality >= cfg.medium_quality - quality_relief
    {
        2
    } else {
        1
    }
}

/// Displayed `(big, small)` confidences for a call of `prediction` at
/// `confidence`. Each is clamped and the pair sums to 1.
pub fn class_confidences(prediction: Class, confidence: f64) -> (f64, f64) {
    let big = match prediction {
        Class::Big => confidence,
        Class::Small => 1.0 - confidence,
    };
    let big = big.clamp(DISPLAY_BOUNDS.0, DISPLAY_BOUNDS.1);
    (big, 1.0 - big)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedCall {
    pub prediction: Class,
    pub confidence: f64,
}

/// Coin-flip call at 0.5 plus symmetric jitter.
pub fn forced_call<R: Rng + ?Sized>(rng: &mut R, jitter: f64) -> ForcedCall {
    let prediction = if rng.random_bool(0.5) {
        Class::Big
    } else {
        Class::Small
    };
    let offset = if jitter > 0.0 {
        rng.random_range(-jitter..=jitter)
    } else {
        0.0
    };
    ForcedCall {
        prediction,
        confidence: 0.5 + offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn display_confidences_sum_to_one() {
        for (class, conf) in [(Class::Big, 0.73), (Class::Small, 0.9995), (Class::Big, 0.0)] {
            let (b, s) = class_confidences(class, conf);
            assert!((b + s - 1.0).abs() < 1e-12);
            assert!((DISPLAY_BOUNDS.0..=DISPLAY_BOUNDS.1).contains(&b));
            assert!((DISPLAY_BOUNDS.0 - 1e-12..=DISPLAY_BOUNDS.1 + 1e-12).contains(&s));
        }
    }

    #[test]
    fn compression_moves_toward_half() {
        let c = compress_confidence(0.8, &[0.92, 1.0], 60.0);
        assert!((c - (0.5 + 0.3 * 0.92 * 0.5)).abs() < 1e-12);
        assert_eq!(compress_confidence(0.8, &[], 200.0), 0.5);
    }

    #[test]
    fn levels_follow_thresholds() {
        let cfg = EngineConfig::default();
        assert_eq!(confidence_level(0.63, 0.6, false, &cfg), 3);
        assert_eq!(confidence_level(0.60, 0.6, false, &cfg), 2);
        assert_eq!(confidence_level(0.60, 0.6, true, &cfg), 3);
        assert_eq!(confidence_level(0.52, 0.9, false, &cfg), 1);
    }

    #[test]
    fn forced_call_stays_near_half() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let call = forced_call(&mut rng, 0.008);
            assert!((0.492..=0.508).contains(&call.confidence));
        }
    }

    #[test]
    fn consensus_scales_dominant_class() {
        use crate::model::{SignalCategory, SignalVote};
        let v = |class| {
            AdjustedVote::from_vote(SignalVote::new("x", SignalCategory::Pattern, class, 1.0), 1.0, false)
        };
        let votes = vec![v(Class::Big), v(Class::Small)];
        let consensus = Consensus {
            factor: 1.5,
            dominant: Some(Class::Small),
            ..Consensus::default()
        };
        let scores = final_scores(&votes, &consensus, &RegimeProbabilities::default());
        assert!((scores.small - 1.5).abs() < 1e-12);
        assert!((scores.big - 0.5).abs() < 1e-12);
        assert!((scores.share(Class::Small) - 0.75).abs() < 1e-12);
    }
}
