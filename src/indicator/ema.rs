use super::sma::Sma;

/// Exponential moving average. The first value is the SMA of the first
/// `period` inputs; later inputs roll it forward.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    ema: Option<f64>,
    seed: Sma,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            ema: None,
            seed: Sma::new(period),
        }
    }

    /// Push the next chronological value, returning the EMA once seeded.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.ema = match self.ema {
            Some(prev) => Some((value - prev) * self.multiplier + prev),
            None => self.seed.push(value),
        };
        self.ema
    }

    pub fn value(&self) -> Option<f64> {
        self.ema
    }

    pub fn is_ready(&self) -> bool {
        self.ema.is_some()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Full EMA series of a chronological input, one value per input from
    /// the seeding point on.
    pub fn series(chronological: &[f64], period: usize) -> Vec<f64> {
        let mut ema = Ema::new(period);
        chronological.iter().filter_map(|v| ema.push(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_from_sma_then_rolls() {
        let mut ema = Ema::new(3);
        assert_eq!(ema.push(2.0), None);
        assert_eq!(ema.push(5.0), None);
        assert!(!ema.is_ready());
        assert!((ema.push(8.0).unwrap() - 5.0).abs() < f64::EPSILON);
        assert!((ema.push(11.0).unwrap() - 8.0).abs() < f64::EPSILON);
        assert_eq!(ema.period(), 3);
    }

    #[test]
    fn series_starts_at_seed() {
        let out = Ema::series(&[1.0, 3.0, 5.0, 7.0], 2);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 2.0).abs() < f64::EPSILON);
    }
}
