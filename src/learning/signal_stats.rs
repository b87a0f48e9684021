use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LearningConfig;
use crate::context::VolatilityLevel;
use crate::model::{AdjustedVote, Class};

pub const ADJUSTMENT_RANGE: (f64, f64) = (0.05, 1.95);
pub const ALPHA_RANGE: (f64, f64) = (0.4, 1.6);
const MIN_TOTAL_FOR_ADJUSTMENT: u32 = 10;
const MIN_RECENT_SAMPLES: usize = 15;
const SESSION_WINDOW: usize = 15;
const MIN_BUCKET_OBSERVATIONS: u32 = 5;
const INACTIVE_WINDOWS: u64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: u32,
    pub total: u32,
}

impl Tally {
    pub fn record(&mut self, correct: bool) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64)
        }
    }
}

/// Learned state for one signal source. Created on first observation and
/// never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPerformanceRecord {
    pub correct: u32,
    pub total: u32,
    pub recent_accuracy: VecDeque<u8>,
    pub session_results: VecDeque<u8>,
    pub last_update_period: Option<u64>,
    pub last_active_period: Option<u64>,
    pub current_adjustment_factor: f64,
    pub alpha_factor: f64,
    pub long_term_importance: f64,
    pub performance_by_volatility: BTreeMap<VolatilityLevel, Tally>,
    pub is_on_probation: bool,
}

impl Default for SignalPerformanceRecord {
    fn default() -> Self {
        Self {
            correct: 0,
            total: 0,
            recent_accuracy: VecDeque::new(),
            session_results: VecDeque::new(),
            last_update_period: None,
            last_active_period: None,
            current_adjustment_factor: 1.0,
            alpha_factor: 1.0,
            long_term_importance: 0.5,
            performance_by_volatility: BTreeMap::new(),
            is_on_probation: false,
        }
    }
}

fn window_mean(window: &VecDeque<u8>) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    Some(window.iter().map(|v| *v as f64).sum::<f64>() / window.len() as f64)
}

fn push_bounded(window: &mut VecDeque<u8>, value: u8, cap: usize) {
    window.push_back(value);
    while window.len() > cap {
        window.pop_front();
    }
}

impl SignalPerformanceRecord {
    pub fn recent_accuracy(&self) -> Option<f64> {
        window_mean(&self.recent_accuracy)
    }

    pub fn session_total(&self) -> usize {
        self.session_results.len()
    }

    pub fn session_correct(&self) -> usize {
        self.session_results.iter().filter(|v| **v == 1).count()
    }

    /// Push one observation and recompute the adjustment, alpha and
    /// probation state from the recent window.
    pub fn observe(&mut self, correct: bool, volatility: VolatilityLevel, cfg: &LearningConfig) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
        self.performance_by_volatility
            .entry(volatility)
            .or_default()
            .record(correct);
        push_bounded(&mut self.recent_accuracy, correct as u8, cfg.performance_window);
        push_bounded(&mut self.session_results, correct as u8, SESSION_WINDOW);

        if self.recent_accuracy.len() < MIN_RECENT_SAMPLES {
            return;
        }
        let Some(acc) = self.recent_accuracy() else {
            return;
        };

        if self.total >= MIN_TOTAL_FOR_ADJUSTMENT {
            let target = (1.0 + (acc - 0.5) * 3.5).clamp(ADJUSTMENT_RANGE.0, ADJUSTMENT_RANGE.1);
            self.current_adjustment_factor = target;
            let rate = if acc < 0.5 { 0.3 } else { 0.15 };
            self.alpha_factor = (self.alpha_factor + rate * (target - self.alpha_factor))
                .clamp(ALPHA_RANGE.0, ALPHA_RANGE.1);
        }

        if acc < cfg.probation_enter_below {
            self.is_on_probation = true;
        } else if acc > cfg.probation_exit_above {
            self.is_on_probation = false;
        }
    }

    fn volatility_correction(&self, volatility: VolatilityLevel) -> f64 {
        match self.performance_by_volatility.get(&volatility) {
            Some(t) if t.total >= MIN_BUCKET_OBSERVATIONS => t
                .accuracy()
                .map_or(1.0, |acc| (1.0 + (acc - 0.5)).clamp(0.6, 1.4)),
            _ => 1.0,
        }
    }

    fn session_correction(&self) -> f64 {
        if self.session_total() < MIN_BUCKET_OBSERVATIONS as usize {
            return 1.0;
        }
        window_mean(&self.session_results)
            .map_or(1.0, |acc| (1.0 + (acc - 0.5) * 0.8).clamp(0.7, 1.3))
    }
}

/// How the cycle that produced the scored votes went as a whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCycle {
    pub actual: Class,
    pub period: u64,
    pub overall_correct: bool,
    pub high_confidence: bool,
    /// Concentration mode or a chaos entropy state was active at vote time.
    pub amplify_penalty: bool,
    pub volatility: VolatilityLevel,
}

/// Per-source performance learner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalPerformanceTable {
    records: BTreeMap<String, SignalPerformanceRecord>,
}

impl SignalPerformanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<&SignalPerformanceRecord> {
        self.records.get(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Score the votes of the previous cycle against its realized class.
    /// Each source is counted at most once per period.
    pub fn update(&mut self, votes: &[AdjustedVote], cycle: &ScoredCycle, cfg: &LearningConfig) {
        let mut seen: HashSet<&str> = HashSet::new();
        for vote in votes {
            if !seen.insert(vote.source.as_str()) {
                continue;
            }
            let record = self.records.entry(vote.source.clone()).or_default();
            if record.last_update_period == Some(cycle.period) {
                continue;
            }
            let correct = vote.prediction == cycle.actual;
            record.observe(correct, cycle.volatility, cfg);

            let delta = if correct {
                if cycle.high_confidence {
                    0.02
                } else {
                    0.01
                }
            } else if cycle.high_confidence && !cycle.overall_correct {
                if cycle.amplify_penalty {
                    -0.04 * 1.5
                } else {
                    -0.04
                }
            } else {
                -0.005
            };
            record.long_term_importance = (record.long_term_importance + delta).clamp(0.0, 1.0);
            record.last_update_period = Some(cycle.period);
            record.last_active_period = Some(cycle.period);

            debug!(
                source = %vote.source,
                correct,
                total = record.total,
                adjustment = record.current_adjustment_factor,
                alpha = record.alpha_factor,
                importance = record.long_term_importance,
                probation = record.is_on_probation,
                "signal performance updated"
            );
        }
    }

    /// Pull idle sources back toward neutral and release them from probation.
    pub fn decay_inactive(&mut self, period: u64, cfg: &LearningConfig) {
        let idle_after = INACTIVE_WINDOWS * cfg.performance_window as u64;
        for (source, record) in self.records.iter_mut() {
            let Some(last) = record.last_active_period else {
                continue;
            };
            if period.saturating_sub(last) < idle_after {
                continue;
            }
            let f = record.current_adjustment_factor;
            record.current_adjustment_factor = if f > 1.0 {
                (f - cfg.decay_step).max(1.0)
            } else {
                (f + cfg.decay_step).min(1.0)
            };
            if record.is_on_probation {
                debug!(source = %source, "probation lifted after inactivity");
            }
            record.is_on_probation = false;
        }
    }

    pub fn reset_session(&mut self) {
        for record in self.records.values_mut() {
            record.session_results.clear();
        }
    }

    /// Effective weight multiplier for `source` and whether it is on
    /// probation. Unknown sources get a neutral multiplier.
    pub fn dynamic_weight_adjustment(
        &self,
        source: &str,
        volatility: VolatilityLevel,
        cfg: &LearningConfig,
    ) -> (f64, bool) {
        let Some(record) = self.records.get(source) else {
            return (1.0, false);
        };
        let mut multiplier = record.current_adjustment_factor
            * record.alpha_factor
            * record.volatility_correction(volatility)
            * record.session_correction()
            * (0.70 + record.long_term_importance * 0.6);
        if record.is_on_probation {
            multiplier = multiplier.min(cfg.probation_weight_cap);
        }
        (multiplier.max(cfg.min_weight), record.is_on_probation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SignalCategory, SignalVote};

    fn vote(source: &str, class: Class) -> AdjustedVote {
        AdjustedVote::from_vote(
            SignalVote::new(source, SignalCategory::Pattern, class, 1.0),
            1.0,
            false,
        )
    }

    fn cycle(period: u64, actual: Class) -> ScoredCycle {
        ScoredCycle {
            actual,
            period,
            overall_correct: true,
            high_confidence: false,
            amplify_penalty: false,
            volatility: VolatilityLevel::Medium,
        }
    }

    fn feed(table: &mut SignalPerformanceTable, pattern: &[bool], start: u64) {
        let cfg = LearningConfig::default();
        for (i, ok) in pattern.iter().enumerate() {
            let actual = if *ok { Class::Big } else { Class::Small };
            table.update(&[vote("X", Class::Big)], &cycle(start + i as u64, actual), &cfg);
        }
    }

    #[test]
    fn same_period_is_counted_once() {
        let cfg = LearningConfig::default();
        let mut table = SignalPerformanceTable::new();
        let votes = [vote("X", Class::Big), vote("X", Class::Big)];
        table.update(&votes, &cycle(7, Class::Big), &cfg);
        table.update(&votes, &cycle(7, Class::Big), &cfg);
        let r = table.get("X").unwrap();
        assert_eq!(r.total, 1);
        assert_eq!(r.correct, 1);
    }

    #[test]
    fn recent_window_is_bounded() {
        let mut table = SignalPerformanceTable::new();
        feed(&mut table, &[true; 50], 0);
        let r = table.get("X").unwrap();
        assert_eq!(r.recent_accuracy.len(), 30);
        assert_eq!(r.session_total(), 15);
        assert!(r.correct <= r.total);
        assert!((r.current_adjustment_factor - 1.95).abs() < 1e-12);
        assert!(r.alpha_factor <= ALPHA_RANGE.1);
    }

    #[test]
    fn adjustment_factor_is_monotone_in_accuracy() {
        let mut low = SignalPerformanceTable::new();
        let pattern_low: Vec<bool> = (0..20).map(|i| i % 5 == 0).collect();
        feed(&mut low, &pattern_low, 0);
        let mut high = SignalPerformanceTable::new();
        let pattern_high: Vec<bool> = (0..20).map(|i| i % 5 != 0).collect();
        feed(&mut high, &pattern_high, 0);
        let lo = low.get("X").unwrap().current_adjustment_factor;
        let hi = high.get("X").unwrap().current_adjustment_factor;
        assert!(lo < 1.0 && hi > 1.0);
    }

    #[test]
    fn probation_caps_effective_weight() {
        let cfg = LearningConfig::default();
        let mut table = SignalPerformanceTable::new();
        let pattern: Vec<bool> = (0..20).map(|i| i % 4 == 0).collect();
        feed(&mut table, &pattern, 0);
        let (mult, probation) =
            table.dynamic_weight_adjustment("X", VolatilityLevel::Medium, &cfg);
        assert!(probation);
        assert!(mult <= cfg.probation_weight_cap + 1e-12);
        assert!(mult >= cfg.min_weight);
    }

    #[test]
    fn probation_exits_after_recovery() {
        let mut table = SignalPerformanceTable::new();
        let pattern: Vec<bool> = (0..20).map(|i| i % 4 == 0).collect();
        feed(&mut table, &pattern, 0);
        assert!(table.get("X").unwrap().is_on_probation);
        feed(&mut table, &[true; 30], 100);
        assert!(!table.get("X").unwrap().is_on_probation);
    }

    #[test]
    fn idle_source_decays_toward_neutral() {
        let cfg = LearningConfig::default();
        let mut table = SignalPerformanceTable::new();
        feed(&mut table, &[true; 20], 0);
        let before = table.get("X").unwrap().current_adjustment_factor;
        table.decay_inactive(19 + 89, &cfg);
        assert_eq!(table.get("X").unwrap().current_adjustment_factor, before);
        table.decay_inactive(19 + 90, &cfg);
        let after = table.get("X").unwrap().current_adjustment_factor;
        assert!((before - after - cfg.decay_step).abs() < 1e-12);
    }

    #[test]
    fn high_confidence_miss_hurts_more_under_concentration() {
        let cfg = LearningConfig::default();
        let mut plain = SignalPerformanceTable::new();
        let mut amplified = SignalPerformanceTable::new();
        let mut c = cycle(1, Class::Small);
        c.high_confidence = true;
        c.overall_correct = false;
        plain.update(&[vote("X", Class::Big)], &c, &cfg);
        c.amplify_penalty = true;
        amplified.update(&[vote("X", Class::Big)], &c, &cfg);
        let p = plain.get("X").unwrap().long_term_importance;
        let a = amplified.get("X").unwrap().long_term_importance;
        assert!((0.5 - p - 0.04).abs() < 1e-12);
        assert!((0.5 - a - 0.06).abs() < 1e-12);
    }

    #[test]
    fn unknown_source_is_neutral() {
        let cfg = LearningConfig::default();
        let table = SignalPerformanceTable::new();
        assert_eq!(
            table.dynamic_weight_adjustment("nobody", VolatilityLevel::High, &cfg),
            (1.0, false)
        );
    }
}
