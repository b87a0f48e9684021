use serde::{Deserialize, Serialize};

use crate::context::stability::EntropyState;
use crate::context::trend::{TrendContext, TrendDirection, TrendStrength, VolatilityLevel};

/// Heuristic regime probabilities; the four fields sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeProbabilities {
    pub bull: f64,
    pub bear: f64,
    pub volatile_range: f64,
    pub quiet_range: f64,
}

impl RegimeProbabilities {
    /// Bull minus bear probability, in [-1, 1].
    pub fn directional_tilt(&self) -> f64 {
        self.bull - self.bear
    }
}

impl Default for RegimeProbabilities {
    fn default() -> Self {
        Self {
            bull: 0.25,
            bear: 0.25,
            volatile_range: 0.25,
            quiet_range: 0.25,
        }
    }
}

pub fn analyze_advanced_market_regime(
    trend: &TrendContext,
    entropy_state: EntropyState,
) -> RegimeProbabilities {
    let mut bull = 1.0;
    let mut bear = 1.0;
    let mut volatile_range = 1.0;
    let mut quiet_range = 1.0;

    let strength = match trend.strength {
        TrendStrength::Strong => 2.0,
        TrendStrength::Moderate => 1.2,
        TrendStrength::Weak => 0.5,
        TrendStrength::Ranging => 0.0,
    };
    match trend.direction {
        TrendDirection::Big => bull += strength,
        TrendDirection::Small => bear += strength,
        TrendDirection::RangingBigBias => bull += 0.3,
        TrendDirection::RangingSmallBias => bear += 0.3,
        TrendDirection::Neutral => {}
    }

    match trend.volatility {
        VolatilityLevel::High => volatile_range += 1.5,
        VolatilityLevel::Medium => volatile_range += 0.6,
        VolatilityLevel::Low => quiet_range += 1.0,
        VolatilityLevel::VeryLow => quiet_range += 1.5,
    }

    if entropy_state.is_chaos() {
        volatile_range += 0.8;
    } else if entropy_state == EntropyState::Orderly {
        quiet_range += 0.4;
    }

    let total = bull + bear + volatile_range + quiet_range;
    RegimeProbabilities {
        bull: bull / total,
        bear: bear / total,
        volatile_range: volatile_range / total,
        quiet_range: quiet_range / total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_big_trend_tilts_bull() {
        let ctx = TrendContext {
            direction: TrendDirection::Big,
            strength: TrendStrength::Strong,
            ..TrendContext::default()
        };
        let p = analyze_advanced_market_regime(&ctx, EntropyState::StableModerate);
        assert!(p.directional_tilt() > 0.2);
        let sum = p.bull + p.bear + p.volatile_range + p.quiet_range;
        assert!((sum - 1.0).abs() < 1e-12);
    }
}
