pub mod round;
pub mod signal;

pub use round::{
    confirmed_rounds, parse_history, read_history, Class, ConfirmedRound, HistoryRecord,
    RoundStatus,
};
pub use signal::{class_weights, AdjustedVote, SignalCategory, SignalVote};
