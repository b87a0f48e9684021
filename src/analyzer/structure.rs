use crate::analyzer::{scaled_vote, Analyzer, CycleContext};
use crate::indicator::stats::mean;
use crate::model::{AdjustedVote, Class, SignalCategory, SignalVote};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pivot {
    value: f64,
    is_peak: bool,
}

/// Strict local extrema, newest first.
fn pivots(values: &[f64], window: usize) -> Vec<Pivot> {
    let end = values.len().min(window);
    if end < 3 {
        return Vec::new();
    }
    let mut out: Vec<Pivot> = Vec::new();
    for i in 1..end - 1 {
        let (newer, v, older) = (values[i - 1], values[i], values[i + 1]);
        let pivot = if v > newer && v > older {
            Pivot { value: v, is_peak: true }
        } else if v < newer && v < older {
            Pivot { value: v, is_peak: false }
        } else {
            continue;
        };
        if out.last().map_or(true, |p| p.is_peak != pivot.is_peak) {
            out.push(pivot);
        }
    }
    out
}

/// X-A-B swing: once the A-B leg retraces a harmonic fraction of X-A, the
/// next leg is expected to resume the X-A direction.
#[derive(Debug, Clone)]
pub struct HarmonicAnalyzer {
    window: usize,
    min_ratio: f64,
    max_ratio: f64,
    base_weight: f64,
}

impl Default for HarmonicAnalyzer {
    fn default() -> Self {
        Self {
            window: 30,
            min_ratio: 0.5,
            max_ratio: 0.886,
            base_weight: 0.7,
        }
    }
}

impl Analyzer for HarmonicAnalyzer {
    fn name(&self) -> &'static str {
        "harmonic"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Pattern
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let pivots = pivots(&ctx.values, self.window);
        let [b, a, x] = pivots.get(..3)? else {
            return None;
        };
        let xa = (a.value - x.value).abs();
        if xa <= f64::EPSILON {
            return None;
        }
        let ratio = (a.value - b.value).abs() / xa;
        if ratio < self.min_ratio || ratio > self.max_ratio {
            return None;
        }
        let class = if a.value > x.value {
            Class::Big
        } else {
            Class::Small
        };
        Some(scaled_vote(
            "Harmonic-Swing",
            self.category(),
            class,
            self.base_weight,
            1.0 - (ratio - 0.618).abs(),
            (0.6, 1.0),
        ))
    }
}

fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    let denom = (vx * vy).sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(cov / denom)
}

/// Lagged self-correlation. The strongest lag projects the next deviation
/// from the round that will sit that lag behind it.
#[derive(Debug, Clone)]
pub struct EntanglementAnalyzer {
    max_lag: usize,
    window: usize,
    threshold: f64,
    base_weight: f64,
}

impl Default for EntanglementAnalyzer {
    fn default() -> Self {
        Self {
            max_lag: 5,
            window: 24,
            threshold: 0.35,
            base_weight: 0.6,
        }
    }
}

impl Analyzer for EntanglementAnalyzer {
    fn name(&self) -> &'static str {
        "entanglement"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Probabilistic
    }

    fn analyze(&self, ctx: &CycleContext<'_>, _prior: &[AdjustedVote]) -> Option<SignalVote> {
        let values = &ctx.values;
        if values.len() < self.window + self.max_lag {
            return None;
        }
        let mut best: Option<(usize, f64)> = None;
        for lag in 1..=self.max_lag {
            let Some(corr) = correlation(&values[..self.window], &values[lag..lag + self.window])
            else {
                continue;
            };
            if best.map_or(true, |(_, c)| corr.abs() > c.abs()) {
                best = Some((lag, corr));
            }
        }
        let (lag, corr) = best?;
        if corr.abs() < self.threshold {
            return None;
        }
        let centre = mean(&values[..self.window])?;
        let projected = corr * (values[lag - 1] - centre);
        let class = if projected > 0.0 {
            Class::Big
        } else if projected < 0.0 {
            Class::Small
        } else {
            return None;
        };
        Some(scaled_vote(
            format!("Entanglement-L{}", lag),
            self.category(),
            class,
            self.base_weight,
            corr.abs(),
            (0.5, 1.0),
        ))
    }
}
