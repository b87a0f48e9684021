//! Market context classification for one cycle.
//!
//! Everything here is recomputed from the history snapshot on each call and
//! never stored between cycles.

pub mod advanced;
pub mod stability;
pub mod trend;

pub use advanced::{analyze_advanced_market_regime, RegimeProbabilities};
pub use stability::{
    analyze_market_entropy_state, analyze_trend_stability, EntropyState, InstabilityReason,
    StabilityReport,
};
pub use trend::{
    market_regime_context, trend_context, MacroRegime, TrendContext, TrendDirection,
    TrendStrength, VolatilityLevel,
};
