//! Drift Detection Method (DDM) over the binary error stream.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftState {
    #[default]
    Stable,
    Warning,
    Drift,
}

impl DriftState {
    pub fn is_alarm(self) -> bool {
        !matches!(self, DriftState::Stable)
    }
}

/// Running error rate `p_i`, its standard error `s_i`, and the minimum of
/// `p_i + s_i` seen so far. `min` is `None` until the first reading after
/// warm-up, which stands for `(p_min, s_min) = (inf, inf)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftDetector {
    pub n: u64,
    pub p_i: f64,
    pub s_i: f64,
    pub min: Option<(f64, f64)>,
    pub warning_level: f64,
    pub drift_level: f64,
    pub warm_up: u64,
    pub state: DriftState,
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self {
            n: 0,
            p_i: 0.0,
            s_i: 0.0,
            min: None,
            warning_level: 2.0,
            drift_level: 3.0,
            warm_up: 30,
            state: DriftState::Stable,
        }
    }
}

impl DriftDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one prediction outcome. `error` is true when the prediction
    /// missed.
    pub fn update(&mut self, error: bool) -> DriftState {
        let x = if error { 1.0 } else { 0.0 };
        self.n += 1;
        let n = self.n as f64;
        self.p_i += (x - self.p_i) / n;
        self.s_i = (self.p_i * (1.0 - self.p_i) / n).sqrt();

        if self.n < self.warm_up {
            self.state = DriftState::Stable;
            return self.state;
        }

        let level = self.p_i + self.s_i;
        let state = match self.min {
            Some((p_min, s_min)) if level > p_min + self.drift_level * s_min => {
                warn!(n = self.n, p = self.p_i, p_min, s_min, "concept drift detected");
                self.min = None;
                self.n = 1;
                self.p_i = x;
                self.s_i = 0.0;
                DriftState::Drift
            }
            Some((p_min, s_min)) if level > p_min + self.warning_level * s_min => {
                DriftState::Warning
            }
            Some((p_min, s_min)) => {
                if level < p_min + s_min {
                    self.min = Some((self.p_i, self.s_i));
                }
                DriftState::Stable
            }
            None => {
                self.min = Some((self.p_i, self.s_i));
                DriftState::Stable
            }
        };
        self.state = state;
        state
    }
}
