//! One prediction cycle, end to end.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analyzer::{default_analyzers, Analyzer, CycleContext, Stage, ThresholdScorer, VoteScorer};
use crate::config::Config;
use crate::context::{
    analyze_advanced_market_regime, EntropyState, MacroRegime, RegimeProbabilities, TrendContext,
    VolatilityLevel,
};
use crate::external::{is_prime_time, session_multiplier, ExternalFeatureProvider, NeutralFeed};
use crate::fusion::{
    category_consensus, class_confidences, compress_confidence, confidence_level,
    direction_consistency, final_scores, forced_call, path_confluence, quality_score,
    superposition_vote, uncertainty_score, UncertaintyInputs, UncertaintyScore,
};
use crate::learning::regime_profile::RegimeProfile;
use crate::learning::reflexive::REFLEXIVE_AGGRESSION;
use crate::learning::{DriftState, LearningState, ScoredCycle};
use crate::model::{confirmed_rounds, AdjustedVote, Class, HistoryRecord, SignalVote};

pub const GLOBAL_ACCURACY_ALPHA: f64 = 0.02;
pub const CONCENTRATION_FACTOR: f64 = 0.75;

/// What the caller feeds back from the previous cycle's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleCarryState {
    pub last_prediction: Option<Class>,
    /// Newest confirmed period the carried prediction was made from.
    pub based_on_period: Option<String>,
    pub last_confidence: f64,
    pub last_confidence_level: u8,
    pub last_macro_regime: MacroRegime,
    pub last_votes: Vec<AdjustedVote>,
    pub last_concentration_mode: bool,
    pub last_entropy_state: EntropyState,
    pub last_volatility: VolatilityLevel,
    /// Long-term EWMA of the system's own accuracy.
    pub global_accuracy: f64,
}

impl Default for CycleCarryState {
    fn default() -> Self {
        Self {
            last_prediction: None,
            based_on_period: None,
            last_confidence: 0.5,
            last_confidence_level: 1,
            last_macro_regime: MacroRegime::Default,
            last_votes: Vec::new(),
            last_concentration_mode: false,
            last_entropy_state: EntropyState::StableModerate,
            last_volatility: VolatilityLevel::Medium,
            global_accuracy: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub cycle_id: Uuid,
    pub computed_at: DateTime<Utc>,
    /// Newest confirmed period the call was made from.
    pub based_on_period: Option<String>,
    pub prediction: Class,
    pub confidence: f64,
    pub big_confidence: f64,
    pub small_confidence: f64,
    pub confidence_level: u8,
    pub is_forced_prediction: bool,
    pub forced_reason: Option<String>,
    pub uncertainty: UncertaintyScore,
    pub quality_score: f64,
    pub macro_regime: MacroRegime,
    pub regime_label: String,
    pub trend: TrendContext,
    pub entropy_state: EntropyState,
    pub volatility: VolatilityLevel,
    pub drift_state: DriftState,
    pub concentration_mode: bool,
    pub reflexive_active: bool,
    pub prime_time: bool,
    pub regime_probabilities: RegimeProbabilities,
    pub votes: Vec<AdjustedVote>,
    pub global_accuracy: f64,
    pub diagnostics: Vec<String>,
}

impl PredictionResult {
    /// State to hand back on the next call.
    pub fn carry(&self) -> CycleCarryState {
        CycleCarryState {
            last_prediction: Some(self.prediction),
            based_on_period: self.based_on_period.clone(),
            last_confidence: self.confidence,
            last_confidence_level: self.confidence_level,
            last_macro_regime: self.macro_regime,
            last_votes: self.votes.clone(),
            last_concentration_mode: self.concentration_mode,
            last_entropy_state: self.entropy_state,
            last_volatility: self.volatility,
            global_accuracy: self.global_accuracy,
        }
    }
}

/// Outcome of scoring the previous cycle against the newest round.
struct Learned {
    global_accuracy: f64,
    diagnostics: Vec<String>,
}

pub struct Forecaster {
    config: Config,
    analyzers: Vec<Box<dyn Analyzer>>,
    external: Box<dyn ExternalFeatureProvider>,
}

impl Forecaster {
    pub fn new(config: Config) -> Self {
        Self::with_scorer(config, Arc::new(ThresholdScorer::default()))
    }

    pub fn with_scorer(config: Config, scorer: Arc<dyn VoteScorer>) -> Self {
        Self {
            config,
            analyzers: default_analyzers(scorer),
            external: Box::new(NeutralFeed),
        }
    }

    pub fn with_external_provider(mut self, provider: Box<dyn ExternalFeatureProvider>) -> Self {
        self.external = provider;
        self
    }

    pub fn with_analyzers(mut self, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        self.analyzers = analyzers;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one cycle. Never fails: missing or insufficient input degrades to
    /// a forced near-even call.
    pub fn predict<R: Rng + ?Sized>(
        &self,
        history: &[HistoryRecord],
        carry: &CycleCarryState,
        state: &mut LearningState,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> PredictionResult {
        let cfg = &self.config;
        let rounds = confirmed_rounds(history);
        let ctx = CycleContext::build(&rounds, now);

        if history.len() <= 1 {
            state.signals.reset_session();
        }
        let learned = self.learn_from_previous(&ctx, carry, state);
        let mut diagnostics = learned.diagnostics;

        let drift_state = state.drift.state;
        let reflexive_active = state.reflexive.is_active();
        let concentration_mode = drift_state.is_alarm()
            || ctx.stability.is_unstable()
            || ctx.entropy_state.is_chaos()
            || reflexive_active;
        let prime_time = is_prime_time(now, &cfg.session);
        let regime_probabilities = analyze_advanced_market_regime(&ctx.trend, ctx.entropy_state);

        let mut result = PredictionResult {
            cycle_id: Uuid::new_v4(),
            computed_at: now,
            based_on_period: rounds.first().map(|r| r.period.clone()),
            prediction: Class::Big,
            confidence: 0.5,
            big_confidence: 0.5,
            small_confidence: 0.5,
            confidence_level: 1,
            is_forced_prediction: false,
            forced_reason: None,
            uncertainty: UncertaintyScore::default(),
            quality_score: 0.0,
            macro_regime: ctx.trend.macro_regime,
            regime_label: ctx.trend.macro_regime.label(ctx.trend.is_transitioning),
            trend: ctx.trend,
            entropy_state: ctx.entropy_state,
            volatility: ctx.trend.volatility,
            drift_state,
            concentration_mode,
            reflexive_active,
            prime_time,
            regime_probabilities,
            votes: Vec::new(),
            global_accuracy: learned.global_accuracy,
            diagnostics: Vec::new(),
        };

        if rounds.len() < cfg.engine.min_history {
            let reason = format!(
                "insufficient confirmed history: {} < {}",
                rounds.len(),
                cfg.engine.min_history
            );
            diagnostics.push(reason.clone());
            result.diagnostics = diagnostics;
            return self.force(result, reason, rng);
        }

        let profile = state.regimes.profile(ctx.trend.macro_regime);
        let mut aggression = profile.contextual_aggression;
        if concentration_mode {
            aggression *= CONCENTRATION_FACTOR;
            diagnostics.push("concentration mode".to_string());
        }
        if reflexive_active {
            aggression *= REFLEXIVE_AGGRESSION;
            diagnostics.push(format!(
                "reflexive correction: {} cycles left",
                state.reflexive.remaining_cycles
            ));
        }

        let mut votes: Vec<AdjustedVote> = Vec::new();
        for stage in [Stage::Primary, Stage::Meta] {
            let prior = votes.clone();
            for analyzer in self.analyzers.iter().filter(|a| a.stage() == stage) {
                let Some(vote) = analyzer.analyze(&ctx, &prior) else {
                    continue;
                };
                votes.push(self.adjust(vote, &ctx, state, &profile, aggression));
            }
        }

        if votes.is_empty() {
            let reason = "no analyzer produced a usable vote".to_string();
            diagnostics.push(reason.clone());
            result.diagnostics = diagnostics;
            return self.force(result, reason, rng);
        }

        let consensus = category_consensus(&votes, ctx.trend.strength);
        let consistency = direction_consistency(&votes);
        let leading = consensus.dominant.unwrap_or(Class::Big);
        let confluence = path_confluence(&votes, leading);
        let confluence_ratio = if consensus.categories == 0 {
            0.0
        } else {
            confluence as f64 / consensus.categories as f64
        };
        if consensus.trend_momentum_conflict {
            diagnostics.push("trend and momentum disagree under a strong trend".to_string());
        }
        if let Some(sp) = superposition_vote(&votes, &consensus) {
            votes.push(sp);
        }

        let scores = final_scores(&votes, &consensus, &regime_probabilities);
        let prediction = scores.winner(rng);

        let uncertainty = uncertainty_score(&UncertaintyInputs {
            reflexive_active,
            drift: drift_state,
            instability: ctx.stability.reason,
            entropy_state: ctx.entropy_state,
            consistency,
            confluence,
            transitioning: ctx.trend.is_transitioning,
            volatility: ctx.trend.volatility,
            global_accuracy: learned.global_accuracy,
        });
        let confidence = compress_confidence(
            scores.share(prediction),
            &[
                session_multiplier(now, &cfg.session),
                self.external.sentiment_multiplier(now),
            ],
            uncertainty.total,
        );
        let quality = quality_score(consistency, confluence_ratio, uncertainty.total);

        result.votes = votes;
        result.quality_score = quality;
        result.uncertainty = uncertainty;

        let defensive = drift_state.is_alarm() || reflexive_active;
        let threshold = if defensive {
            cfg.engine.defensive_uncertainty_threshold
        } else {
            cfg.engine.uncertainty_threshold
        };
        if result.uncertainty.total > threshold {
            let reason = format!(
                "uncertainty {:.1} above threshold {:.1}",
                result.uncertainty.total, threshold
            );
            diagnostics.push(reason.clone());
            result.diagnostics = diagnostics;
            return self.force(result, reason, rng);
        }
        if quality < cfg.engine.min_quality {
            let reason = format!(
                "prediction quality {:.3} below floor {:.3}",
                quality, cfg.engine.min_quality
            );
            diagnostics.push(reason.clone());
            result.diagnostics = diagnostics;
            return self.force(result, reason, rng);
        }

        let (big, small) = class_confidences(prediction, confidence);
        result.prediction = prediction;
        result.confidence = confidence;
        result.big_confidence = big;
        result.small_confidence = small;
        result.confidence_level = confidence_level(confidence, quality, prime_time, &cfg.engine);
        result.diagnostics = diagnostics;

        info!(
            prediction = prediction.as_str(),
            confidence = result.confidence,
            level = result.confidence_level,
            uncertainty = result.uncertainty.total,
            quality = result.quality_score,
            regime = %result.regime_label,
            votes = result.votes.len(),
            "prediction cycle complete"
        );
        result
    }

    fn adjust(
        &self,
        vote: SignalVote,
        ctx: &CycleContext<'_>,
        state: &LearningState,
        profile: &RegimeProfile,
        aggression: f64,
    ) -> AdjustedVote {
        let learning = &self.config.learning;
        let (multiplier, on_probation) =
            state
                .signals
                .dynamic_weight_adjustment(&vote.source, ctx.trend.volatility, learning);
        let mut adjusted = vote.weight
            * multiplier
            * profile.base_weight_multiplier
            * profile.category_factor(vote.category)
            * aggression;
        if on_probation {
            adjusted = adjusted.min(vote.weight * learning.probation_weight_cap);
        }
        debug!(
            source = %vote.source,
            prediction = vote.prediction.as_str(),
            raw = vote.weight,
            adjusted,
            probation = on_probation,
            "vote"
        );
        AdjustedVote::from_vote(vote, adjusted, on_probation)
    }

    /// Score the carried prediction against the newest confirmed round, once
    /// per newest period.
    fn learn_from_previous(
        &self,
        ctx: &CycleContext<'_>,
        carry: &CycleCarryState,
        state: &mut LearningState,
    ) -> Learned {
        let learning = &self.config.learning;
        let mut learned = Learned {
            global_accuracy: carry.global_accuracy,
            diagnostics: Vec::new(),
        };
        let Some(newest) = ctx.rounds.first() else {
            return learned;
        };
        let Some(period) = newest.period_number() else {
            return learned;
        };
        if matches!(state.last_scored_period, Some(p) if p >= period) {
            learned
                .diagnostics
                .push(format!("period {} already scored", period));
            return learned;
        }
        let Some(previous) = carry.last_prediction else {
            state.last_scored_period = Some(period);
            return learned;
        };
        let made_from = carry
            .based_on_period
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok());
        match made_from {
            Some(from) if from < period => {}
            _ => {
                learned.diagnostics.push(format!(
                    "carried prediction was made from {:?}; period {} not yet its outcome",
                    carry.based_on_period, period
                ));
                state.last_scored_period = Some(period);
                return learned;
            }
        }

        let actual = newest.class;
        let correct = previous == actual;
        let hit = if correct { 1.0 } else { 0.0 };
        learned.global_accuracy = (carry.global_accuracy
            + GLOBAL_ACCURACY_ALPHA * (hit - carry.global_accuracy))
            .clamp(0.0, 1.0);

        state.signals.update(
            &carry.last_votes,
            &ScoredCycle {
                actual,
                period,
                overall_correct: correct,
                high_confidence: carry.last_confidence_level >= 3,
                amplify_penalty: carry.last_concentration_mode
                    || carry.last_entropy_state.is_chaos(),
                volatility: carry.last_volatility,
            },
            learning,
        );
        state.signals.decay_inactive(period, learning);
        state.regimes.record_outcome(
            carry.last_macro_regime,
            correct,
            learned.global_accuracy,
            learning,
        );
        let drift = state.drift.update(!correct);
        if drift == DriftState::Drift {
            learned.diagnostics.push("drift detected".to_string());
        }
        if state.reflexive.observe(
            carry.last_confidence_level,
            correct,
            learning.reflexive_cycles,
        ) {
            learned
                .diagnostics
                .push("reflexive correction activated".to_string());
        }
        state.last_scored_period = Some(period);

        debug!(
            period,
            correct,
            global_accuracy = learned.global_accuracy,
            drift = ?drift,
            "previous cycle scored"
        );
        learned
    }

    fn force<R: Rng + ?Sized>(
        &self,
        mut result: PredictionResult,
        reason: String,
        rng: &mut R,
    ) -> PredictionResult {
        let call = forced_call(rng, self.config.engine.forced_jitter);
        let (big, small) = class_confidences(call.prediction, call.confidence);
        result.prediction = call.prediction;
        result.confidence = call.confidence;
        result.big_confidence = big;
        result.small_confidence = small;
        result.confidence_level = 1;
        result.is_forced_prediction = true;
        info!(
            prediction = call.prediction.as_str(),
            confidence = call.confidence,
            reason = %reason,
            "forced prediction"
        );
        result.forced_reason = Some(reason);
        result
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::analyzer::test_support::fixed_now;

    fn history(digits: &[u8], newest_period: u64) -> Vec<HistoryRecord> {
        digits
            .iter()
            .enumerate()
            .map(|(i, d)| HistoryRecord::new((newest_period - i as u64).to_string(), d.to_string()))
            .collect()
    }

    #[test]
    fn short_history_is_forced() {
        let forecaster = Forecaster::default();
        let mut state = LearningState::new();
        let mut rng = StdRng::seed_from_u64(1);
        let r = forecaster.predict(
            &history(&[3; 20], 500),
            &CycleCarryState::default(),
            &mut state,
            fixed_now(),
            &mut rng,
        );
        assert!(r.is_forced_prediction);
        assert_eq!(r.confidence_level, 1);
        assert!(r.forced_reason.unwrap().contains("insufficient"));
    }

    #[test]
    fn same_period_is_learned_once() {
        let forecaster = Forecaster::default();
        let mut state = LearningState::new();
        let mut rng = StdRng::seed_from_u64(2);
        let digits: Vec<u8> = (0..60).map(|i| if i % 2 == 0 { 7 } else { 2 }).collect();
        let h = history(&digits, 900);
        let first = forecaster.predict(&h, &CycleCarryState::default(), &mut state, fixed_now(), &mut rng);

        let next = history(&[&[2u8][..], &digits[..59]].concat(), 901);
        let carry = first.carry();
        forecaster.predict(&next, &carry, &mut state, fixed_now(), &mut rng);
        let snapshot = state.clone();
        forecaster.predict(&next, &carry, &mut state, fixed_now(), &mut rng);
        assert_eq!(state, snapshot);
        assert_eq!(state.last_scored_period, Some(901));
    }

    #[test]
    fn empty_analyzer_set_is_forced() {
        let forecaster = Forecaster::default().with_analyzers(Vec::new());
        let mut state = LearningState::new();
        let mut rng = StdRng::seed_from_u64(3);
        let digits: Vec<u8> = (0..60).map(|i| (i % 10) as u8).collect();
        let r = forecaster.predict(
            &history(&digits, 700),
            &CycleCarryState::default(),
            &mut state,
            fixed_now(),
            &mut rng,
        );
        assert!(r.is_forced_prediction);
        assert!(r.votes.is_empty());
    }
}
