use crate::analyzer::{scaled_vote, Analyzer, CycleContext};
use crate::indicator::stats::entropy;
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

/// Low entropy rides the majority class; near-maximal entropy fades the
/// newest round.
#[derive(Debug, Clone)]
pub struct EntropyAnalyzer {
    window: usize,
    orderly_below: f64,
    chaotic_from: f64,
    base_weight: f64,
}

impl Default for EntropyAnalyzer {
    fn default() -> Self {
        Self {
            window: 12,
            orderly_below: 0.5,
            chaotic_from: 0.97,
            base_weight: 0.6,
        }
    }
}

impl Analyzer for EntropyAnalyzer {
    fn name(&self) -> &'static str {
        "entropy"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Probabilistic
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        if ctx.classes.len() < self.window {
            return None;
        }
        let h = entropy(&ctx.classes, self.window);
        if h < self.orderly_below {
            let big = ctx.classes[..self.window]
                .iter()
                .filter(|c| **c == Class::Big)
                .count();
            let majority = if big * 2 >= self.window {
                Class::Big
            } else {
                Class::Small
            };
            Some(scaled_vote(
                "Entropy-Continuation",
                self.category(),
                majority,
                self.base_weight,
                1.0 - h,
                (0.6, 1.0),
            ))
        } else if h >= self.chaotic_from {
            Some(scaled_vote(
                "Entropy-Contrarian",
                self.category(),
                ctx.last_class()?.opposite(),
                self.base_weight,
                h,
                (0.6, 1.0),
            ))
        } else {
            None
        }
    }
}
