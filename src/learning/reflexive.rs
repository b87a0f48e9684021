use serde::{Deserialize, Serialize};
use tracing::warn;

/// Aggression multiplier while a correction window is running.
pub const REFLEXIVE_AGGRESSION: f64 = 0.25;
pub const HIGH_CONFIDENCE_LEVEL: u8 = 3;
const TRIGGER_MISSES: u32 = 2;

/// Counts consecutive high-confidence misses and runs a fixed-length
/// suppression window after the second one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflexiveCorrection {
    pub consecutive_high_misses: u32,
    pub remaining_cycles: u32,
}

impl ReflexiveCorrection {
    pub fn is_active(&self) -> bool {
        self.remaining_cycles > 0
    }

    /// Advance one cycle with the scored outcome of the previous prediction.
    /// Returns true when this call starts a new correction window.
    pub fn observe(&mut self, confidence_level: u8, correct: bool, window: u32) -> bool {
        if self.is_active() {
            self.remaining_cycles -= 1;
            self.consecutive_high_misses = 0;
            return false;
        }
        if confidence_level < HIGH_CONFIDENCE_LEVEL {
            return false;
        }
        if correct {
            self.consecutive_high_misses = 0;
            return false;
        }
        self.consecutive_high_misses += 1;
        if self.consecutive_high_misses < TRIGGER_MISSES || window == 0 {
            return false;
        }
        self.consecutive_high_misses = 0;
        self.remaining_cycles = window;
        warn!(cycles = window, "reflexive correction activated");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_high_misses_open_a_window() {
        let mut r = ReflexiveCorrection::default();
        assert!(!r.observe(3, false, 5));
        assert!(r.observe(3, false, 5));
        assert!(r.is_active());
        assert_eq!(r.remaining_cycles, 5);
        for left in (0..5).rev() {
            assert!(!r.observe(3, false, 5));
            assert_eq!(r.remaining_cycles, left);
        }
        assert!(!r.is_active());
    }

    #[test]
    fn correct_high_call_resets_the_streak() {
        let mut r = ReflexiveCorrection::default();
        r.observe(3, false, 5);
        r.observe(3, true, 5);
        assert_eq!(r.consecutive_high_misses, 0);
        assert!(!r.observe(3, false, 5));
        assert!(!r.is_active());
    }

    #[test]
    fn lower_levels_do_not_count() {
        let mut r = ReflexiveCorrection::default();
        r.observe(3, false, 5);
        r.observe(2, false, 5);
        assert_eq!(r.consecutive_high_misses, 1);
        assert!(r.observe(3, false, 5));
    }
}
