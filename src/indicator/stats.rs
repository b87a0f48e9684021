//! Window statistics over newest-first series.
//!
//! Every function returns `None` when the series is shorter than the
//! requested lookback. Callers skip the dependent signal in that case.

use crate::indicator::ema::Ema;
use crate::model::Class;

/// Oldest-to-newest copy of the newest `n` values.
pub fn chronological(values: &[f64], n: usize) -> Vec<f64> {
    values.iter().take(n).rev().copied().collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    mean(&values[..period])
}

/// EMA seeded by the SMA of the oldest available window and rolled forward
/// through every newer value.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let chrono = chronological(values, values.len());
    Ema::series(&chrono, period).last().copied()
}

/// Population standard deviation of the newest `period` values.
pub fn std_dev(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[..period];
    let m = mean(window)?;
    let var = window.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / period as f64;
    Some(var.sqrt())
}

/// Weighted average of the newest `period` values. `None` if the weights
/// sum to zero.
pub fn weighted_average(values: &[f64], weights: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period || weights.len() < period {
        return None;
    }
    let total: f64 = weights[..period].iter().sum();
    if total <= f64::EPSILON {
        return None;
    }
    let acc: f64 = values[..period]
        .iter()
        .zip(&weights[..period])
        .map(|(v, w)| v * w)
        .sum();
    Some(acc / total)
}

/// Wilder RSI over the whole available series.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let chrono = chronological(values, values.len());
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for (i, pair) in chrono.windows(2).enumerate() {
        let delta = pair[1] - pair[0];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        if i < period {
            avg_gain += gain / period as f64;
            avg_loss += loss / period as f64;
        } else {
            let p = period as f64;
            avg_gain = (avg_gain * (p - 1.0) + gain) / p;
            avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        }
    }
    if avg_loss <= f64::EPSILON {
        return Some(if avg_gain <= f64::EPSILON { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Binary Shannon entropy of the newest `window` classes, in bits.
/// Returns 1.0 (maximally uncertain) when the window cannot be evaluated.
pub fn entropy(classes: &[Class], window: usize) -> f64 {
    if window < 2 || classes.len() < window {
        return 1.0;
    }
    let big = classes[..window].iter().filter(|c| **c == Class::Big).count() as f64;
    let p = big / window as f64;
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
}

/// Share of adjacent pairs in the newest `window` classes that switch class.
pub fn alternation_rate(classes: &[Class], window: usize) -> Option<f64> {
    if window < 2 || classes.len() < window {
        return None;
    }
    let switches = classes[..window]
        .windows(2)
        .filter(|w| w[0] != w[1])
        .count();
    Some(switches as f64 / (window - 1) as f64)
}
