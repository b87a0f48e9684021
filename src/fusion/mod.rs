//! Fusion of adjusted votes into a single call.

pub mod consensus;
pub mod decision;
pub mod uncertainty;

pub use consensus::{category_consensus, superposition_vote, Consensus};
pub use decision::{
    class_confidences, compress_confidence, confidence_level, final_scores, forced_call,
    quality_score, ClassScores,
};
pub use uncertainty::{
    direction_consistency, path_confluence, uncertainty_score, UncertaintyInputs,
    UncertaintyScore,
};
