use crate::indicator::ema::Ema;
use crate::indicator::stats::{chronological, sma, std_dev};

/// Stochastic %K of the newest value against the newest `period` window.
pub fn stochastic_k(values: &[f64], period: usize) -> Option<f64> {
    if period < 2 || values.len() < period {
        return None;
    }
    let window = &values[..period];
    let low = window.iter().fold(f64::MAX, |acc, v| acc.min(*v));
    let high = window.iter().fold(f64::MIN, |acc, v| acc.max(*v));
    let range = high - low;
    if range <= f64::EPSILON {
        return None;
    }
    Some((values[0] - low) / range * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub prev_line: f64,
    pub prev_signal: f64,
}

impl Macd {
    pub fn crossed_up(&self) -> bool {
        self.prev_line <= self.prev_signal && self.line > self.signal
    }

    pub fn crossed_down(&self) -> bool {
        self.prev_line >= self.prev_signal && self.line < self.signal
    }
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || slow <= fast || signal == 0 || values.len() < slow + signal {
        return None;
    }
    let chrono = chronological(values, values.len());
    let fast_series = Ema::series(&chrono, fast);
    let slow_series = Ema::series(&chrono, slow);
    // fast_series starts at index fast-1, slow_series at slow-1
    let offset = slow - fast;
    let lines: Vec<f64> = slow_series
        .iter()
        .enumerate()
        .map(|(i, s)| fast_series[i + offset] - s)
        .collect();
    let signals = Ema::series(&lines, signal);
    if signals.len() < 2 {
        return None;
    }
    let n = lines.len();
    let m = signals.len();
    Some(Macd {
        line: lines[n - 1],
        signal: signals[m - 1],
        histogram: lines[n - 1] - signals[m - 1],
        prev_line: lines[n - 2],
        prev_signal: signals[m - 2],
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub std_dev: f64,
}

impl Bands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

pub fn bollinger(values: &[f64], period: usize, k: f64) -> Option<Bands> {
    let middle = sma(values, period)?;
    let sd = std_dev(values, period)?;
    Some(Bands {
        upper: middle + k * sd,
        middle,
        lower: middle - k * sd,
        std_dev: sd,
    })
}

/// Ichimoku lines computed on the close series. The cloud is taken at the
/// current bar without forward displacement; chikou compares the newest
/// value with the value `kijun` bars back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ichimoku {
    pub tenkan: f64,
    pub kijun: f64,
    pub span_a: f64,
    pub span_b: f64,
    pub close: f64,
    pub lagged_close: f64,
}

impl Ichimoku {
    pub fn cloud_top(&self) -> f64 {
        self.span_a.max(self.span_b)
    }

    pub fn cloud_bottom(&self) -> f64 {
        self.span_a.min(self.span_b)
    }
}

fn midpoint(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[..period];
    let low = window.iter().fold(f64::MAX, |acc, v| acc.min(*v));
    let high = window.iter().fold(f64::MIN, |acc, v| acc.max(*v));
    Some((high + low) / 2.0)
}

pub fn ichimoku(values: &[f64], tenkan: usize, kijun: usize, senkou_b: usize) -> Option<Ichimoku> {
    if values.len() < senkou_b.max(kijun + 1) {
        return None;
    }
    let t = midpoint(values, tenkan)?;
    let k = midpoint(values, kijun)?;
    Some(Ichimoku {
        tenkan: t,
        kijun: k,
        span_a: (t + k) / 2.0,
        span_b: midpoint(values, senkou_b)?,
        close: values[0],
        lagged_close: values[kijun],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stochastic_at_top_of_range() {
        let v = [9.0, 1.0, 5.0, 3.0];
        assert_eq!(stochastic_k(&v, 4), Some(100.0));
        assert_eq!(stochastic_k(&[4.0; 5], 5), None);
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let v: Vec<f64> = (0..60).rev().map(|i| i as f64 * 0.1).collect();
        let m = macd(&v, 12, 26, 9).unwrap();
        assert!(m.line > 0.0);
    }

    #[test]
    fn bollinger_brackets_mean() {
        let v = [1.0, 9.0, 1.0, 9.0];
        let b = bollinger(&v, 4, 2.0).unwrap();
        assert!((b.middle - 5.0).abs() < 1e-12);
        assert!((b.upper - 13.0).abs() < 1e-12);
        assert!((b.width() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn ichimoku_needs_long_window() {
        let v = [5.0; 40];
        assert!(ichimoku(&v, 9, 26, 52).is_none());
        let v = [5.0; 52];
        let ich = ichimoku(&v, 9, 26, 52).unwrap();
        assert_eq!(ich.cloud_top(), 5.0);
    }
}
