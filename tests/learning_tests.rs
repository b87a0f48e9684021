use round_forecast::config::LearningConfig;
use round_forecast::context::{MacroRegime, VolatilityLevel};
use round_forecast::learning::regime_profile::{AGGRESSION_RANGE, MULTIPLIER_RANGE};
use round_forecast::learning::{
    DriftDetector, DriftState, ReflexiveCorrection, RegimeBook, ScoredCycle,
    SignalPerformanceTable,
};
use round_forecast::model::{AdjustedVote, Class, SignalCategory, SignalVote};

fn vote(source: &str, class: Class) -> AdjustedVote {
    AdjustedVote::from_vote(
        SignalVote::new(source, SignalCategory::Momentum, class, 1.0),
        1.0,
        false,
    )
}

fn scored(period: u64, actual: Class) -> ScoredCycle {
    ScoredCycle {
        actual,
        period,
        overall_correct: true,
        high_confidence: false,
        amplify_penalty: false,
        volatility: VolatilityLevel::Medium,
    }
}

#[test]
fn multipliers_order_by_track_record() {
    let cfg = LearningConfig::default();
    let mut table = SignalPerformanceTable::new();
    for period in 0..40u64 {
        let votes = [vote("Always-Right", Class::Big), vote("Always-Wrong", Class::Small)];
        table.update(&votes, &scored(period, Class::Big), &cfg);
    }
    let (good, good_probation) =
        table.dynamic_weight_adjustment("Always-Right", VolatilityLevel::Medium, &cfg);
    let (neutral, _) = table.dynamic_weight_adjustment("Never-Seen", VolatilityLevel::Medium, &cfg);
    let (bad, bad_probation) =
        table.dynamic_weight_adjustment("Always-Wrong", VolatilityLevel::Medium, &cfg);

    assert!(good > neutral);
    assert!(neutral > bad);
    assert!((neutral - 1.0).abs() < f64::EPSILON);
    assert!(!good_probation);
    assert!(bad_probation);
    assert!(bad <= cfg.probation_weight_cap + 1e-12);
    assert!(bad >= cfg.min_weight);
}

#[test]
fn duplicate_period_is_ignored() {
    let cfg = LearningConfig::default();
    let mut table = SignalPerformanceTable::new();
    let votes = [vote("RSI", Class::Big), vote("RSI", Class::Big)];
    table.update(&votes, &scored(10, Class::Big), &cfg);
    table.update(&votes, &scored(10, Class::Small), &cfg);
    let record = table.get("RSI").unwrap();
    assert_eq!(record.total, 1);
    assert_eq!(record.correct, 1);
}

#[test]
fn probation_lifts_after_recovery() {
    let cfg = LearningConfig::default();
    let mut table = SignalPerformanceTable::new();
    let mut period = 0u64;
    for _ in 0..20 {
        table.update(&[vote("Z", Class::Big)], &scored(period, Class::Small), &cfg);
        period += 1;
    }
    assert!(table.get("Z").unwrap().is_on_probation);
    for _ in 0..40 {
        table.update(&[vote("Z", Class::Big)], &scored(period, Class::Big), &cfg);
        period += 1;
    }
    assert!(!table.get("Z").unwrap().is_on_probation);
}

#[test]
fn idle_sources_decay_toward_neutral() {
    let cfg = LearningConfig::default();
    let mut table = SignalPerformanceTable::new();
    for period in 0..20u64 {
        table.update(&[vote("Q", Class::Big)], &scored(period, Class::Small), &cfg);
    }
    let before = table.get("Q").unwrap().current_adjustment_factor;
    assert!(before < 1.0);
    table.decay_inactive(19 + 3 * cfg.performance_window as u64, &cfg);
    let record = table.get("Q").unwrap();
    assert!((record.current_adjustment_factor - (before + cfg.decay_step)).abs() < 1e-12);
    assert!(!record.is_on_probation);
}

#[test]
fn regime_multipliers_stay_in_range() {
    let cfg = LearningConfig::default();
    let mut book = RegimeBook::default();
    for _ in 0..500 {
        book.record_outcome(MacroRegime::StrongTrendSteady, true, 0.3, &cfg);
        book.record_outcome(MacroRegime::RangingVolatile, false, 0.3, &cfg);
    }
    let up = book.profile(MacroRegime::StrongTrendSteady);
    let down = book.profile(MacroRegime::RangingVolatile);
    assert_eq!(up.base_weight_multiplier, MULTIPLIER_RANGE.1);
    assert_eq!(up.contextual_aggression, AGGRESSION_RANGE.1);
    assert_eq!(down.base_weight_multiplier, MULTIPLIER_RANGE.0);
    assert_eq!(down.contextual_aggression, AGGRESSION_RANGE.0);
    assert_eq!(up.recent_accuracy.len(), cfg.regime_window);
}

#[test]
fn drift_fires_on_an_error_burst_after_a_good_run() {
    let mut ddm = DriftDetector::new();
    for i in 0..100 {
        // one miss in four
        ddm.update(i % 4 == 0);
    }
    assert_eq!(ddm.state, DriftState::Stable);
    let fired = (0..100).any(|_| ddm.update(true) == DriftState::Drift);
    assert!(fired);
    assert!(ddm.min.is_none());
}

#[test]
fn reflexive_window_runs_then_clears() {
    let mut r = ReflexiveCorrection::default();
    assert!(!r.observe(3, false, 3));
    assert!(!r.observe(2, false, 3));
    assert!(r.observe(3, false, 3));
    assert_eq!(r.remaining_cycles, 3);
    for _ in 0..3 {
        assert!(r.is_active());
        r.observe(3, false, 3);
    }
    assert!(!r.is_active());
    assert_eq!(r.consecutive_high_misses, 0);
}
