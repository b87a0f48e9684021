use crate::analyzer::{scaled_vote, Analyzer, CycleContext};
use crate::indicator::oscillator::{macd, stochastic_k};
use crate::indicator::stats::{chronological, rsi, std_dev};
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

#[derive(Debug, Clone)]
pub struct RsiAnalyzer {
    period: usize,
    oversold: f64,
    overbought: f64,
    base_weight: f64,
}

impl Default for RsiAnalyzer {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            base_weight: 0.8,
        }
    }
}

impl Analyzer for RsiAnalyzer {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Momentum
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let value = rsi(&ctx.values, self.period)?;
        let (class, excess) = if value <= self.oversold {
            (Class::Big, self.oversold - value)
        } else if value >= self.overbought {
            (Class::Small, value - self.overbought)
        } else {
            return None;
        };
        Some(scaled_vote(
            "RSI",
            self.category(),
            class,
            self.base_weight,
            0.6 + excess / 30.0,
            (0.6, 1.2),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct StochasticAnalyzer {
    period: usize,
    lower: f64,
    upper: f64,
    base_weight: f64,
}

impl Default for StochasticAnalyzer {
    fn default() -> Self {
        Self {
            period: 14,
            lower: 20.0,
            upper: 80.0,
            base_weight: 0.7,
        }
    }
}

impl Analyzer for StochasticAnalyzer {
    fn name(&self) -> &'static str {
        "stochastic"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Momentum
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let k = stochastic_k(&ctx.values, self.period)?;
        let (class, excess) = if k >= self.upper {
            (Class::Small, k - self.upper)
        } else if k <= self.lower {
            (Class::Big, self.lower - k)
        } else {
            return None;
        };
        Some(scaled_vote(
            "Stochastic",
            self.category(),
            class,
            self.base_weight,
            0.7 + excess / 20.0 * 0.3,
            (0.7, 1.0),
        ))
    }
}

/// MACD line vs signal line. A fresh cross votes when the histogram clears a
/// small band; otherwise a large histogram alone votes its sign.
#[derive(Debug, Clone)]
pub struct MacdAnalyzer {
    fast: usize,
    slow: usize,
    signal: usize,
    cross_band: f64,
    magnitude_band: f64,
    base_weight: f64,
}

impl Default for MacdAnalyzer {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            cross_band: 0.08,
            magnitude_band: 0.2,
            base_weight: 0.9,
        }
    }
}

impl Analyzer for MacdAnalyzer {
    fn name(&self) -> &'static str {
        "macd"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Momentum
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let m = macd(&ctx.values, self.fast, self.slow, self.signal)?;
        let sd = std_dev(&ctx.values, self.slow)?;
        if sd <= f64::EPSILON {
            return None;
        }
        let norm = m.histogram.abs() / sd;
        let (source, class) = if m.crossed_up() && norm >= self.cross_band {
            ("MACD-Cross", Class::Big)
        } else if m.crossed_down() && norm >= self.cross_band {
            ("MACD-Cross", Class::Small)
        } else if norm >= self.magnitude_band {
            let class = if m.histogram > 0.0 {
                Class::Big
            } else {
                Class::Small
            };
            ("MACD-Momentum", class)
        } else {
            return None;
        };
        Some(scaled_vote(
            source,
            self.category(),
            class,
            self.base_weight,
            0.6 + norm,
            (0.6, 1.2),
        ))
    }
}

/// Alpha-beta level/velocity filter. Votes continuation when the filtered
/// velocity is fast, accelerating, and ahead of the window's average drift.
#[derive(Debug, Clone)]
pub struct VelocityAnalyzer {
    window: usize,
    alpha: f64,
    beta: f64,
    min_velocity: f64,
    base_weight: f64,
}

impl Default for VelocityAnalyzer {
    fn default() -> Self {
        Self {
            window: 12,
            alpha: 0.5,
            beta: 0.2,
            min_velocity: 0.8,
            base_weight: 0.6,
        }
    }
}

impl Analyzer for VelocityAnalyzer {
    fn name(&self) -> &'static str {
        "velocity"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Momentum
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        if ctx.values.len() < self.window + 1 {
            return None;
        }
        let chrono = chronological(&ctx.values, self.window + 1);
        let mut level = chrono[0];
        let mut velocity = 0.0;
        let mut prev_velocity = 0.0;
        for z in &chrono[1..] {
            let predicted = level + velocity;
            let residual = z - predicted;
            prev_velocity = velocity;
            level = predicted + self.alpha * residual;
            velocity += self.beta * residual;
        }
        let accel = velocity - prev_velocity;
        let avg_velocity = (chrono[self.window] - chrono[0]) / self.window as f64;

        if velocity.abs() < self.min_velocity
            || velocity.signum() != accel.signum()
            || velocity.abs() <= avg_velocity.abs() + 0.5
        {
            return None;
        }
        let class = if velocity > 0.0 { Class::Big } else { Class::Small };
        Some(scaled_vote(
            "Kalman-Velocity",
            self.category(),
            class,
            self.base_weight,
            velocity.abs() / 2.0,
            (0.5, 1.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::test_support::{fixed_now, rounds_from_digits};

    #[test]
    fn stochastic_at_range_top_votes_small() {
        let digits: Vec<u8> = (0..30).map(|i| if i % 2 == 0 { 7 } else { 2 }).collect();
        let rounds = rounds_from_digits(&digits);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let vote = StochasticAnalyzer::default().analyze(&ctx, &[]).unwrap();
        assert_eq!(vote.prediction, Class::Small);
        assert!(vote.weight <= 0.7 * 1.0 + 1e-12);
    }

    #[test]
    fn rsi_oversold_after_steady_decline() {
        // newest first: digits fall toward the present
        let digits: Vec<u8> = (0..30).map(|i| (i / 3).min(9) as u8).collect();
        let rounds = rounds_from_digits(&digits);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let vote = RsiAnalyzer::default().analyze(&ctx, &[]).unwrap();
        assert_eq!(vote.prediction, Class::Big);
    }

    #[test]
    fn flat_series_produces_no_macd_vote() {
        let rounds = rounds_from_digits(&[4; 60]);
        let ctx = CycleContext::build(&rounds, fixed_now());
        assert!(MacdAnalyzer::default().analyze(&ctx, &[]).is_none());
    }
}
