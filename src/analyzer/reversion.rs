use crate::analyzer::{scaled_vote, Analyzer, CycleContext};
use crate::indicator::oscillator::bollinger;
use crate::indicator::stats::{sma, std_dev, weighted_average};
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

fn revert_from(deviation: f64) -> Class {
    if deviation > 0.0 {
        Class::Small
    } else {
        Class::Big
    }
}

#[derive(Debug, Clone)]
pub struct BollingerAnalyzer {
    period: usize,
    k: f64,
    base_weight: f64,
}

impl Default for BollingerAnalyzer {
    fn default() -> Self {
        Self {
            period: 20,
            k: 2.0,
            base_weight: 0.8,
        }
    }
}

impl Analyzer for BollingerAnalyzer {
    fn name(&self) -> &'static str {
        "bollinger"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::MeanReversion
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let bands = bollinger(&ctx.values, self.period, self.k)?;
        if bands.std_dev <= f64::EPSILON {
            return None;
        }
        let last = *ctx.values.first()?;
        let (source, excess) = if last > bands.upper {
            ("Bollinger-Upper", last - bands.upper)
        } else if last < bands.lower {
            ("Bollinger-Lower", last - bands.lower)
        } else {
            return None;
        };
        Some(scaled_vote(
            source,
            self.category(),
            revert_from(excess),
            self.base_weight,
            0.7 + excess.abs() / bands.std_dev,
            (0.7, 1.2),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct ZScoreAnalyzer {
    period: usize,
    threshold: f64,
    base_weight: f64,
}

impl Default for ZScoreAnalyzer {
    fn default() -> Self {
        Self {
            period: 30,
            threshold: 1.8,
            base_weight: 0.7,
        }
    }
}

impl Analyzer for ZScoreAnalyzer {
    fn name(&self) -> &'static str {
        "zscore"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::MeanReversion
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let sd = std_dev(&ctx.values, self.period)?;
        if sd <= f64::EPSILON {
            return None;
        }
        let m = sma(&ctx.values, self.period)?;
        let z = (ctx.values[0] - m) / sd;
        if z.abs() < self.threshold {
            return None;
        }
        Some(scaled_vote(
            "ZScore-Anomaly",
            self.category(),
            revert_from(z),
            self.base_weight,
            z.abs() / 3.0,
            (0.6, 1.1),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct MaDeviationAnalyzer {
    period: usize,
    threshold: f64,
    base_weight: f64,
}

impl Default for MaDeviationAnalyzer {
    fn default() -> Self {
        Self {
            period: 20,
            threshold: 1.5,
            base_weight: 0.6,
        }
    }
}

impl Analyzer for MaDeviationAnalyzer {
    fn name(&self) -> &'static str {
        "ma_deviation"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::MeanReversion
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let sd = std_dev(&ctx.values, self.period)?;
        if sd <= f64::EPSILON {
            return None;
        }
        let dev = (ctx.values[0] - sma(&ctx.values, self.period)?) / sd;
        if dev.abs() < self.threshold {
            return None;
        }
        Some(scaled_vote(
            "MA-Deviation",
            self.category(),
            revert_from(dev),
            self.base_weight,
            dev.abs() / 2.0,
            (0.6, 1.0),
        ))
    }
}

/// Deviation from an activity-weighted average, where a round's weight is
/// one plus the size of the move that produced it.
#[derive(Debug, Clone)]
pub struct VwapDeviationAnalyzer {
    period: usize,
    threshold: f64,
    base_weight: f64,
}

impl Default for VwapDeviationAnalyzer {
    fn default() -> Self {
        Self {
            period: 20,
            threshold: 1.4,
            base_weight: 0.6,
        }
    }
}

impl Analyzer for VwapDeviationAnalyzer {
    fn name(&self) -> &'static str {
        "vwap_deviation"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::MeanReversion
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        if ctx.values.len() < self.period + 1 {
            return None;
        }
        let activity: Vec<f64> = ctx
            .values
            .windows(2)
            .map(|w| 1.0 + (w[0] - w[1]).abs())
            .collect();
        let vwap = weighted_average(&ctx.values, &activity, self.period)?;
        let sd = std_dev(&ctx.values, self.period)?;
        if sd <= f64::EPSILON {
            return None;
        }
        let dev = (ctx.values[0] - vwap) / sd;
        if dev.abs() < self.threshold {
            return None;
        }
        Some(scaled_vote(
            "VWAP-Deviation",
            self.category(),
            revert_from(dev),
            self.base_weight,
            dev.abs() / 2.0,
            (0.6, 1.0),
        ))
    }
}
