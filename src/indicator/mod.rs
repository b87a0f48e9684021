pub mod ema;
pub mod oscillator;
pub mod sma;
pub mod stats;
