use crate::analyzer::{scaled_vote, Analyzer, CycleContext};
use crate::indicator::oscillator::ichimoku;
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

/// Votes the direction of an ordered EMA stack once its spread, measured in
/// long-window standard deviations, is wide enough.
#[derive(Debug, Clone)]
pub struct EmaStackAnalyzer {
    min_spread: f64,
    base_weight: f64,
}

impl Default for EmaStackAnalyzer {
    fn default() -> Self {
        Self {
            min_spread: 0.3,
            base_weight: 1.0,
        }
    }
}

impl Analyzer for EmaStackAnalyzer {
    fn name(&self) -> &'static str {
        "ema_stack"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let class = ctx.trend.direction.class()?;
        let spread = ctx.trend.normalized_spread;
        if spread < self.min_spread {
            return None;
        }
        Some(scaled_vote(
            "EMA-Stack",
            self.category(),
            class,
            self.base_weight,
            0.5 + spread * 0.5,
            (0.6, 1.3),
        ))
    }
}

/// Tenkan/kijun, price vs cloud, chikou vs lagged price and tenkan vs cloud.
/// At least two of the four must agree, and conviction grows with agreement.
#[derive(Debug, Clone)]
pub struct IchimokuAnalyzer {
    tenkan: usize,
    kijun: usize,
    senkou_b: usize,
    base_weight: f64,
}

impl Default for IchimokuAnalyzer {
    fn default() -> Self {
        Self {
            tenkan: 9,
            kijun: 26,
            senkou_b: 52,
            base_weight: 1.1,
        }
    }
}

fn side(a: f64, b: f64) -> Option<Class> {
    if a > b {
        Some(Class::Big)
    } else if a < b {
        Some(Class::Small)
    } else {
        None
    }
}

impl Analyzer for IchimokuAnalyzer {
    fn name(&self) -> &'static str {
        "ichimoku"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let ich = ichimoku(&ctx.values, self.tenkan, self.kijun, self.senkou_b)?;

        let cloud_side = |v: f64| {
            if v > ich.cloud_top() {
                Some(Class::Big)
            } else if v < ich.cloud_bottom() {
                Some(Class::Small)
            } else {
                None
            }
        };
        let subs = [
            side(ich.tenkan, ich.kijun),
            cloud_side(ich.close),
            side(ich.close, ich.lagged_close),
            cloud_side(ich.tenkan),
        ];
        let big = subs.iter().filter(|s| **s == Some(Class::Big)).count();
        let small = subs.iter().filter(|s| **s == Some(Class::Small)).count();
        let (class, agree, against) = if big >= small {
            (Class::Big, big, small)
        } else {
            (Class::Small, small, big)
        };
        if agree < 2 || agree <= against {
            return None;
        }
        let strength = match agree {
            2 => 0.6,
            3 => 0.85,
            _ => 1.1,
        };
        Some(scaled_vote(
            "Ichimoku",
            self.category(),
            class,
            self.base_weight,
            strength,
            (0.6, 1.1),
        ))
    }
}
