//! Short-sequence pattern detectors over the class stream.
//!
//! Classes are newest first throughout: `c[0]` is the latest confirmed round.

use std::collections::HashMap;

use crate::analyzer::{scaled_vote, Analyzer, CycleContext};
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

/// Length of the run of identical classes ending at the newest round.
fn run_length(classes: &[Class]) -> usize {
    match classes.first() {
        Some(first) => classes.iter().take_while(|c| *c == first).count(),
        None => 0,
    }
}

/// Length of the strictly alternating run ending at the newest round.
fn alternating_length(classes: &[Class]) -> usize {
    if classes.is_empty() {
        return 0;
    }
    1 + classes.windows(2).take_while(|w| w[0] != w[1]).count()
}

/// Bets on a long streak breaking. Weight grows with the streak length.
#[derive(Debug, Clone)]
pub struct StreakBreakAnalyzer {
    min_streak: usize,
    max_factor: f64,
    base_weight: f64,
}

impl Default for StreakBreakAnalyzer {
    fn default() -> Self {
        Self {
            min_streak: 3,
            max_factor: 0.95,
            base_weight: 0.9,
        }
    }
}

impl Analyzer for StreakBreakAnalyzer {
    fn name(&self) -> &'static str {
        "streak_break"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let last = ctx.last_class()?;
        let streak = run_length(&ctx.classes);
        if streak < self.min_streak {
            return None;
        }
        Some(scaled_vote(
            "Streak-Break",
            self.category(),
            last.opposite(),
            self.base_weight,
            0.35 + 0.1 * streak as f64,
            (0.0, self.max_factor),
        ))
    }
}

/// `A A B` (chronological) continues with `B`.
#[derive(Debug, Clone)]
pub struct TwoPlusOneAnalyzer {
    base_weight: f64,
}

impl Default for TwoPlusOneAnalyzer {
    fn default() -> Self {
        Self { base_weight: 0.5 }
    }
}

impl Analyzer for TwoPlusOneAnalyzer {
    fn name(&self) -> &'static str {
        "two_plus_one"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let c = ctx.classes.get(..3)?;
        if c[2] == c[1] && c[1] != c[0] {
            return Some(SignalVote::new(
                "Pattern-2+1",
                self.category(),
                c[0],
                self.base_weight,
            ));
        }
        None
    }
}

/// `A A B B` (chronological) flips back to `A`.
#[derive(Debug, Clone)]
pub struct DoubleAnalyzer {
    base_weight: f64,
}

impl Default for DoubleAnalyzer {
    fn default() -> Self {
        Self { base_weight: 0.5 }
    }
}

impl Analyzer for DoubleAnalyzer {
    fn name(&self) -> &'static str {
        "double"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let c = ctx.classes.get(..4)?;
        if c[3] == c[2] && c[2] != c[1] && c[1] == c[0] {
            return Some(SignalVote::new(
                "Pattern-Double",
                self.category(),
                c[2],
                self.base_weight,
            ));
        }
        None
    }
}

/// `A B B` (chronological) mirrors into `A`, completing `ABBA`.
#[derive(Debug, Clone)]
pub struct MirrorAnalyzer {
    base_weight: f64,
}

impl Default for MirrorAnalyzer {
    fn default() -> Self {
        Self { base_weight: 0.5 }
    }
}

impl Analyzer for MirrorAnalyzer {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let c = ctx.classes.get(..3)?;
        if c[2] != c[1] && c[1] == c[0] {
            return Some(SignalVote::new(
                "Pattern-Mirror",
                self.category(),
                c[2],
                self.base_weight,
            ));
        }
        None
    }
}

/// `BSBS` / `SBSB` keeps alternating. Longer runs raise the weight.
#[derive(Debug, Clone)]
pub struct AlternatingAnalyzer {
    min_length: usize,
    base_weight: f64,
}

impl Default for AlternatingAnalyzer {
    fn default() -> Self {
        Self {
            min_length: 4,
            base_weight: 0.8,
        }
    }
}

impl Analyzer for AlternatingAnalyzer {
    fn name(&self) -> &'static str {
        "alternating"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let last = ctx.last_class()?;
        let length = alternating_length(&ctx.classes);
        if length < self.min_length {
            return None;
        }
        let tag: String = ctx.classes[..self.min_length]
            .iter()
            .rev()
            .map(|c| c.letter())
            .collect();
        Some(scaled_vote(
            format!("Alt-{}", tag),
            self.category(),
            last.opposite(),
            self.base_weight,
            0.6 + 0.05 * (length - self.min_length) as f64,
            (0.6, 1.0),
        ))
    }
}

/// Looks up what followed earlier occurrences of the newest `n` classes.
#[derive(Debug, Clone)]
pub struct NGramAnalyzer {
    n: usize,
    min_observations: usize,
    margin: f64,
    base_weight: f64,
}

impl Default for NGramAnalyzer {
    fn default() -> Self {
        Self {
            n: 3,
            min_observations: 4,
            margin: 0.65,
            base_weight: 0.8,
        }
    }
}

impl Analyzer for NGramAnalyzer {
    fn name(&self) -> &'static str {
        "ngram"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let classes = &ctx.classes;
        let key = classes.get(..self.n)?;
        let mut followers: HashMap<Class, usize> = HashMap::new();
        for start in 1..classes.len().saturating_sub(self.n - 1) {
            if &classes[start..start + self.n] == key {
                *followers.entry(classes[start - 1]).or_default() += 1;
            }
        }
        let big = followers.get(&Class::Big).copied().unwrap_or(0);
        let small = followers.get(&Class::Small).copied().unwrap_or(0);
        let total = big + small;
        if total < self.min_observations {
            return None;
        }
        let (class, hits) = if big >= small {
            (Class::Big, big)
        } else {
            (Class::Small, small)
        };
        let share = hits as f64 / total as f64;
        if share < self.margin {
            return None;
        }
        Some(scaled_vote(
            format!("NGram-{}", self.n),
            self.category(),
            class,
            self.base_weight,
            share,
            (0.65, 1.0),
        ))
    }
}

/// Finds the shortest cycle length whose last two repetitions match.
#[derive(Debug, Clone)]
pub struct CycleAnalyzer {
    min_len: usize,
    max_len: usize,
    min_match: f64,
    base_weight: f64,
}

impl Default for CycleAnalyzer {
    fn default() -> Self {
        Self {
            min_len: 3,
            max_len: 6,
            min_match: 0.85,
            base_weight: 0.7,
        }
    }
}

impl Analyzer for CycleAnalyzer {
    fn name(&self) -> &'static str {
        "cycle"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let classes = &ctx.classes;
        let mut best: Option<(usize, f64)> = None;
        for len in self.min_len..=self.max_len {
            let span = 2 * len;
            if classes.len() < span + len {
                continue;
            }
            let matches = (0..span).filter(|&i| classes[i] == classes[i + len]).count();
            let ratio = matches as f64 / span as f64;
            if ratio >= self.min_match && best.map_or(true, |(_, r)| ratio > r) {
                best = Some((len, ratio));
            }
        }
        let (len, ratio) = best?;
        Some(scaled_vote(
            format!("Cycle-{}", len),
            self.category(),
            classes[len - 1],
            self.base_weight,
            ratio,
            (0.85, 1.0),
        ))
    }
}
