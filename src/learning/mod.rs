//! Online learning state carried across cycles.
//!
//! The caller owns one [`LearningState`] and hands it to every cycle by
//! mutable reference. Concurrent callers must serialise access to it.

pub mod drift;
pub mod reflexive;
pub mod regime_profile;
pub mod signal_stats;

use serde::{Deserialize, Serialize};

pub use drift::{DriftDetector, DriftState};
pub use reflexive::ReflexiveCorrection;
pub use regime_profile::{regime_learning_rate, RegimeBook, RegimeProfile};
pub use signal_stats::{ScoredCycle, SignalPerformanceRecord, SignalPerformanceTable};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    pub signals: SignalPerformanceTable,
    pub regimes: RegimeBook,
    pub drift: DriftDetector,
    pub reflexive: ReflexiveCorrection,
    /// Newest period whose outcome has already been learned from.
    pub last_scored_period: Option<u64>,
}

impl LearningState {
    pub fn new() -> Self {
        Self::default()
    }
}
