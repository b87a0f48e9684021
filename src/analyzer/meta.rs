//! Analyzers that reason over other signals or over the fused context.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analyzer::{scaled_vote, Analyzer, CycleContext, Stage};
use crate::context::{EntropyState, TrendStrength, VolatilityLevel};
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

/// Trend strength x volatility x entropy state folded into one vote along
/// the trend bias.
#[derive(Debug, Clone)]
pub struct MetaSignalAnalyzer {
    min_score: f64,
    base_weight: f64,
}

impl Default for MetaSignalAnalyzer {
    fn default() -> Self {
        Self {
            min_score: 0.35,
            base_weight: 0.8,
        }
    }
}

impl Analyzer for MetaSignalAnalyzer {
    fn name(&self) -> &'static str {
        "meta_signal"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let class = ctx.trend.direction.bias()?;
        let strength = match ctx.trend.strength {
            TrendStrength::Strong => 1.0,
            TrendStrength::Moderate => 0.7,
            TrendStrength::Weak => 0.4,
            TrendStrength::Ranging => 0.0,
        };
        let volatility = match ctx.trend.volatility {
            VolatilityLevel::VeryLow => 1.1,
            VolatilityLevel::Low => 1.0,
            VolatilityLevel::Medium => 0.85,
            VolatilityLevel::High => 0.6,
        };
        let entropy = match ctx.entropy_state {
            EntropyState::Orderly => 1.2,
            EntropyState::StableModerate => 1.0,
            EntropyState::SubsidingChaos => 0.8,
            EntropyState::StableChaos => 0.5,
            EntropyState::PotentialChaosFromInstability => 0.4,
            EntropyState::RisingChaos => 0.3,
        };
        let score = strength * volatility * entropy;
        if score < self.min_score {
            return None;
        }
        Some(scaled_vote(
            "Meta-Fusion",
            self.category(),
            class,
            self.base_weight,
            score,
            (0.5, 1.2),
        ))
    }
}

/// Sequential Bayesian update over the trend, momentum and mean-reversion
/// families of the primary votes.
#[derive(Debug, Clone)]
pub struct BayesianAnalyzer {
    likelihood_span: f64,
    min_edge: f64,
    base_weight: f64,
}

impl Default for BayesianAnalyzer {
    fn default() -> Self {
        Self {
            likelihood_span: 0.2,
            min_edge: 0.08,
            base_weight: 0.8,
        }
    }
}

impl BayesianAnalyzer {
    /// Posterior probability of BIG, or `None` when no family voted.
    pub fn posterior(&self, prior: &[AdjustedVote]) -> Option<f64> {
        let families = [
            SignalCategory::Trend,
            SignalCategory::Momentum,
            SignalCategory::MeanReversion,
        ];
        let mut p = 0.5;
        let mut updated = false;
        for family in families {
            let (big, small) = prior
                .iter()
                .filter(|v| v.category == family)
                .fold((0.0, 0.0), |(b, s), v| match v.prediction {
                    Class::Big => (b + v.adjusted_weight, s),
                    Class::Small => (b, s + v.adjusted_weight),
                });
            let total = big + small;
            if total <= f64::EPSILON {
                continue;
            }
            let net = (big - small) / total;
            let likelihood = 0.5 + self.likelihood_span * net;
            p = p * likelihood / (p * likelihood + (1.0 - p) * (1.0 - likelihood));
            updated = true;
        }
        updated.then_some(p)
    }
}

impl Analyzer for BayesianAnalyzer {
    fn name(&self) -> &'static str {
        "bayesian"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Probabilistic
    }

    fn stage(&self) -> Stage {
        Stage::Meta
    }

    fn analyze(&self, _ctx: &CycleContext<'_>, prior: &[AdjustedVote]) -> Option<SignalVote> {
        let p = self.posterior(prior)?;
        let edge = (p - 0.5).abs();
        if edge < self.min_edge {
            return None;
        }
        let class = if p > 0.5 { Class::Big } else { Class::Small };
        Some(scaled_vote(
            "Bayesian-Update",
            self.category(),
            class,
            self.base_weight,
            0.5 + edge * 2.0,
            (0.5, 1.0),
        ))
    }
}

/// Bootstrap resampling of the primary votes. Only a lopsided share of
/// resampled ensembles produces a vote.
#[derive(Debug, Clone)]
pub struct MonteCarloAnalyzer {
    draws: usize,
    min_votes: usize,
    band: f64,
    base_weight: f64,
}

impl Default for MonteCarloAnalyzer {
    fn default() -> Self {
        Self {
            draws: 256,
            min_votes: 3,
            band: 0.7,
            base_weight: 0.7,
        }
    }
}

impl MonteCarloAnalyzer {
    /// Share of resampled ensembles in which BIG outweighs SMALL.
    pub fn big_share(&self, prior: &[AdjustedVote], seed: u64) -> Option<f64> {
        if prior.len() < self.min_votes || self.draws == 0 {
            return None;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut big_wins = 0.0;
        for _ in 0..self.draws {
            let mut net = 0.0;
            for _ in 0..prior.len() {
                let vote = &prior[rng.random_range(0..prior.len())];
                net += vote.prediction.sign() * vote.adjusted_weight;
            }
            if net > 0.0 {
                big_wins += 1.0;
            } else if net == 0.0 {
                big_wins += 0.5;
            }
        }
        Some(big_wins / self.draws as f64)
    }
}

impl Analyzer for MonteCarloAnalyzer {
    fn name(&self) -> &'static str {
        "monte_carlo"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Probabilistic
    }

    fn stage(&self) -> Stage {
        Stage::Meta
    }

    fn analyze(&self, ctx: &CycleContext<'_>, prior: &[AdjustedVote]) -> Option<SignalVote> {
        let p = self.big_share(prior, ctx.seed)?;
        let class = if p >= self.band {
            Class::Big
        } else if p <= 1.0 - self.band {
            Class::Small
        } else {
            return None;
        };
        Some(scaled_vote(
            "MonteCarlo",
            self.category(),
            class,
            self.base_weight,
            (p - 0.5).abs() * 2.0,
            (0.5, 1.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::test_support::{fixed_now, rounds_from_digits};

    fn adjusted(source: &str, category: SignalCategory, class: Class, w: f64) -> AdjustedVote {
        AdjustedVote::from_vote(SignalVote::new(source, category, class, w), w, false)
    }

    #[test]
    fn bayesian_moves_toward_agreeing_families() {
        let prior = vec![
            adjusted("RSI", SignalCategory::Momentum, Class::Small, 0.8),
            adjusted("Bollinger-Upper", SignalCategory::MeanReversion, Class::Small, 0.8),
        ];
        let analyzer = BayesianAnalyzer::default();
        let p = analyzer.posterior(&prior).unwrap();
        assert!(p < 0.2);
        let rounds = rounds_from_digits(&[5; 10]);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let vote = analyzer.analyze(&ctx, &prior).unwrap();
        assert_eq!(vote.prediction, Class::Small);
    }

    #[test]
    fn bayesian_ignores_other_families() {
        let prior = vec![adjusted("NGram-3", SignalCategory::Pattern, Class::Big, 1.0)];
        assert!(BayesianAnalyzer::default().posterior(&prior).is_none());
    }

    #[test]
    fn monte_carlo_is_deterministic_per_seed() {
        let prior = vec![
            adjusted("a", SignalCategory::Pattern, Class::Big, 1.0),
            adjusted("b", SignalCategory::Trend, Class::Big, 0.6),
            adjusted("c", SignalCategory::Momentum, Class::Small, 0.5),
        ];
        let mc = MonteCarloAnalyzer::default();
        let first = mc.big_share(&prior, 42).unwrap();
        assert_eq!(first, mc.big_share(&prior, 42).unwrap());
        assert!(first > 0.5);
    }

    #[test]
    fn monte_carlo_unanimous_small() {
        let prior: Vec<AdjustedVote> = (0..4)
            .map(|i| adjusted(&format!("s{i}"), SignalCategory::Pattern, Class::Small, 0.7))
            .collect();
        let rounds = rounds_from_digits(&[5; 10]);
        let ctx = CycleContext::build(&rounds, fixed_now());
        let vote = MonteCarloAnalyzer::default().analyze(&ctx, &prior).unwrap();
        assert_eq!(vote.prediction, Class::Small);
        assert!((vote.weight - 0.7).abs() < 1e-12);
    }
}
