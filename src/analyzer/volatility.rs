use crate::analyzer::{scaled_vote, Analyzer, CycleContext};
use crate::indicator::oscillator::bollinger;
use crate::indicator::stats::std_dev;
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

fn move_direction(newer: f64, older: f64) -> Option<Class> {
    if newer > older {
        Some(Class::Big)
    } else if newer < older {
        Some(Class::Small)
    } else {
        None
    }
}

/// Band squeeze followed by expansion. Votes continuation on the side of the
/// middle band the newest round broke toward.
#[derive(Debug, Clone)]
pub struct SqueezeAnalyzer {
    period: usize,
    lookback: usize,
    expansion: f64,
    base_weight: f64,
}

impl Default for SqueezeAnalyzer {
    fn default() -> Self {
        Self {
            period: 20,
            lookback: 10,
            expansion: 1.3,
            base_weight: 0.7,
        }
    }
}

impl Analyzer for SqueezeAnalyzer {
    fn name(&self) -> &'static str {
        "squeeze"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Volatility
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        if ctx.values.len() < self.period + self.lookback {
            return None;
        }
        let current = bollinger(&ctx.values, self.period, 2.0)?;
        let widths: Vec<f64> = (1..=self.lookback)
            .filter_map(|offset| bollinger(&ctx.values[offset..], self.period, 2.0))
            .map(|b| b.width())
            .collect();
        let squeezed = *widths.first()?;
        let narrowest = widths.iter().copied().fold(f64::INFINITY, f64::min);
        if squeezed <= f64::EPSILON || squeezed > narrowest * 1.05 {
            return None;
        }
        let ratio = current.width() / squeezed;
        if ratio < self.expansion {
            return None;
        }
        let class = move_direction(ctx.values[0], current.middle)?;
        Some(scaled_vote(
            "Squeeze-Breakout",
            self.category(),
            class,
            self.base_weight,
            ratio - 1.0,
            (0.6, 1.1),
        ))
    }
}

/// Compares dispersion in the newest window against the window before it.
/// Expanding volatility tends to carry the last move on; contracting
/// volatility tends to fade it.
#[derive(Debug, Clone)]
pub struct VolatilityPersistenceAnalyzer {
    window: usize,
    expanding: f64,
    contracting: f64,
    base_weight: f64,
}

impl Default for VolatilityPersistenceAnalyzer {
    fn default() -> Self {
        Self {
            window: 10,
            expanding: 1.35,
            contracting: 0.7,
            base_weight: 0.6,
        }
    }
}

impl Analyzer for VolatilityPersistenceAnalyzer {
    fn name(&self) -> &'static str {
        "volatility_persistence"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Volatility
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let values = &ctx.values;
        if values.len() < 2 * self.window {
            return None;
        }
        let recent = std_dev(values, self.window)?;
        let prior = std_dev(&values[self.window..], self.window)?;
        if prior <= f64::EPSILON {
            return None;
        }
        let ratio = recent / prior;
        let last_move = move_direction(values[0], values[1])?;
        let (source, class, strength) = if ratio > self.expanding {
            ("Vol-Persistence-Expanding", last_move, ratio - 0.5)
        } else if ratio < self.contracting {
            (
                "Vol-Persistence-Contracting",
                last_move.opposite(),
                1.0 - ratio,
            )
        } else {
            return None;
        };
        Some(scaled_vote(
            source,
            self.category(),
            class,
            self.base_weight,
            strength,
            (0.5, 1.0),
        ))
    }
}

/// Kaufman efficiency ratio as a fractal-dimension proxy. A choppy tape
/// votes against the newest class, a clean one votes with the net move.
#[derive(Debug, Clone)]
pub struct FractalEfficiencyAnalyzer {
    window: usize,
    choppy_below: f64,
    trending_above: f64,
    base_weight: f64,
}

impl Default for FractalEfficiencyAnalyzer {
    fn default() -> Self {
        Self {
            window: 10,
            choppy_below: 0.2,
            trending_above: 0.6,
            base_weight: 0.6,
        }
    }
}

impl Analyzer for FractalEfficiencyAnalyzer {
    fn name(&self) -> &'static str {
        "fractal_efficiency"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Volatility
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let values = &ctx.values;
        if values.len() < self.window + 1 {
            return None;
        }
        let path: f64 = values[..=self.window]
            .windows(2)
            .map(|w| (w[0] - w[1]).abs())
            .sum();
        if path <= f64::EPSILON {
            return None;
        }
        let net = values[0] - values[self.window];
        let efficiency = net.abs() / path;
        if efficiency < self.choppy_below {
            let last = ctx.last_class()?;
            Some(scaled_vote(
                "Fractal-Choppy",
                self.category(),
                last.opposite(),
                self.base_weight,
                1.0 - efficiency,
                (0.6, 1.0),
            ))
        } else if efficiency > self.trending_above {
            let class = move_direction(values[0], values[self.window])?;
            Some(scaled_vote(
                "Fractal-Trending",
                self.category(),
                class,
                self.base_weight,
                efficiency,
                (0.6, 1.0),
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::test_support::{fixed_now, rounds_from_digits};

    #[test]
    fn alternating_tape_is_choppy() {
        let digits: Vec<u8> = (0..40).map(|i| if i % 2 == 0 { 7 } else { 2 }).collect();
        let rounds = rounds_from_digits(&digits);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let vote = FractalEfficiencyAnalyzer::default()
            .analyze(&ctx, &[])
            .unwrap();
        assert_eq!(vote.source, "Fractal-Choppy");
        assert_eq!(vote.prediction, Class::Small);
        assert!(VolatilityPersistenceAnalyzer::default()
            .analyze(&ctx, &[])
            .is_none());
        assert!(SqueezeAnalyzer::default().analyze(&ctx, &[]).is_none());
    }

    #[test]
    fn expanding_volatility_follows_last_move() {
        let mut digits = vec![9, 0, 9, 1, 8, 0, 9, 1, 9, 0];
        digits.extend([4, 5, 4, 5, 4, 5, 4, 5, 4, 5]);
        let rounds = rounds_from_digits(&digits);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let vote = VolatilityPersistenceAnalyzer::default()
            .analyze(&ctx, &[])
            .unwrap();
        assert_eq!(vote.source, "Vol-Persistence-Expanding");
        assert_eq!(vote.prediction, Class::Big);
    }

    #[test]
    fn steady_climb_is_trending() {
        let digits: Vec<u8> = (0..11).map(|i| 9 - (i * 9 / 10) as u8).collect();
        let rounds = rounds_from_digits(&digits);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let vote = FractalEfficiencyAnalyzer::default()
            .analyze(&ctx, &[])
            .unwrap();
        assert_eq!(vote.source, "Fractal-Trending");
        assert_eq!(vote.prediction, Class::Big);
    }
}
