//! Adaptive ensemble forecaster for BIG/SMALL round outcomes.
//!
//! A cycle takes the newest-first round history, the carry state returned by
//! the previous cycle and the caller-owned [`learning::LearningState`], and
//! returns an [`engine::PredictionResult`].

pub mod analyzer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod external;
pub mod fusion;
pub mod indicator;
pub mod learning;
pub mod model;

pub use engine::{CycleCarryState, Forecaster, PredictionResult};
pub use learning::LearningState;
