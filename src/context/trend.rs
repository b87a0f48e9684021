use serde::{Deserialize, Serialize};

use crate::indicator::stats::{ema, std_dev};
use crate::model::Class;

pub const SHORT_EMA: usize = 5;
pub const MEDIUM_EMA: usize = 13;
pub const LONG_EMA: usize = 21;
pub const VOLATILITY_WINDOW: usize = 30;

const STRONG_SPREAD: f64 = 0.80;
const MODERATE_SPREAD: f64 = 0.45;
const TRANSITION_BAND: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Big,
    Small,
    RangingBigBias,
    RangingSmallBias,
    Neutral,
}

impl TrendDirection {
    /// Class of a genuine EMA stack ordering.
    pub fn class(self) -> Option<Class> {
        match self {
            TrendDirection::Big => Some(Class::Big),
            TrendDirection::Small => Some(Class::Small),
            _ => None,
        }
    }

    /// Class the series leans toward, including ranging bias.
    pub fn bias(self) -> Option<Class> {
        match self {
            TrendDirection::Big | TrendDirection::RangingBigBias => Some(Class::Big),
            TrendDirection::Small | TrendDirection::RangingSmallBias => Some(Class::Small),
            TrendDirection::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
    Ranging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl VolatilityLevel {
    pub fn from_std_dev(sd: f64) -> Self {
        if sd > 3.3 {
            VolatilityLevel::High
        } else if sd > 2.0 {
            VolatilityLevel::Medium
        } else if sd > 0.9 {
            VolatilityLevel::Low
        } else {
            VolatilityLevel::VeryLow
        }
    }
}

/// Named strength x volatility bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacroRegime {
    StrongTrendVolatile,
    StrongTrendSteady,
    StrongTrendQuiet,
    ModerateTrendVolatile,
    ModerateTrendSteady,
    ModerateTrendQuiet,
    WeakTrendVolatile,
    WeakTrendQuiet,
    RangingVolatile,
    RangingChoppy,
    RangingQuiet,
    Default,
}

impl MacroRegime {
    pub const CATALOG: [MacroRegime; 12] = [
        MacroRegime::StrongTrendVolatile,
        MacroRegime::StrongTrendSteady,
        MacroRegime::StrongTrendQuiet,
        MacroRegime::ModerateTrendVolatile,
        MacroRegime::ModerateTrendSteady,
        MacroRegime::ModerateTrendQuiet,
        MacroRegime::WeakTrendVolatile,
        MacroRegime::WeakTrendQuiet,
        MacroRegime::RangingVolatile,
        MacroRegime::RangingChoppy,
        MacroRegime::RangingQuiet,
        MacroRegime::Default,
    ];

    pub fn classify(strength: TrendStrength, volatility: VolatilityLevel) -> Self {
        use TrendStrength as S;
        use VolatilityLevel as V;
        match (strength, volatility) {
            (S::Strong, V::High) => MacroRegime::StrongTrendVolatile,
            (S::Strong, V::Medium) => MacroRegime::StrongTrendSteady,
            (S::Strong, V::Low | V::VeryLow) => MacroRegime::StrongTrendQuiet,
            (S::Moderate, V::High) => MacroRegime::ModerateTrendVolatile,
            (S::Moderate, V::Medium) => MacroRegime::ModerateTrendSteady,
            (S::Moderate, V::Low | V::VeryLow) => MacroRegime::ModerateTrendQuiet,
            (S::Weak, V::High | V::Medium) => MacroRegime::WeakTrendVolatile,
            (S::Weak, V::Low | V::VeryLow) => MacroRegime::WeakTrendQuiet,
            (S::Ranging, V::High) => MacroRegime::RangingVolatile,
            (S::Ranging, V::Medium) => MacroRegime::RangingChoppy,
            (S::Ranging, V::Low | V::VeryLow) => MacroRegime::RangingQuiet,
        }
    }

    pub fn label(self, transitioning: bool) -> String {
        let base = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "DEFAULT".to_string());
        if transitioning {
            format!("{}_TRANSITION", base)
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendContext {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    pub volatility: VolatilityLevel,
    pub macro_regime: MacroRegime,
    pub is_transitioning: bool,
    /// |short - long| EMA spread in units of long-window std-dev.
    pub normalized_spread: f64,
}

impl Default for TrendContext {
    fn default() -> Self {
        Self {
            direction: TrendDirection::Neutral,
            strength: TrendStrength::Ranging,
            volatility: VolatilityLevel::Medium,
            macro_regime: MacroRegime::Default,
            is_transitioning: false,
            normalized_spread: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EmaStack {
    short: f64,
    medium: f64,
    long: f64,
    long_sd: f64,
}

fn ema_stack(values: &[f64]) -> Option<EmaStack> {
    Some(EmaStack {
        short: ema(values, SHORT_EMA)?,
        medium: ema(values, MEDIUM_EMA)?,
        long: ema(values, LONG_EMA)?,
        long_sd: std_dev(values, LONG_EMA)?,
    })
}

/// Direction, strength and volatility from the short/medium/long EMA stack.
pub fn trend_context(values: &[f64]) -> TrendContext {
    let Some(stack) = ema_stack(values) else {
        return TrendContext::default();
    };

    let direction = if stack.short > stack.medium && stack.medium > stack.long {
        TrendDirection::Big
    } else if stack.short < stack.medium && stack.medium < stack.long {
        TrendDirection::Small
    } else if stack.short > stack.long {
        TrendDirection::RangingBigBias
    } else if stack.short < stack.long {
        TrendDirection::RangingSmallBias
    } else {
        TrendDirection::Neutral
    };

    let normalized_spread = if stack.long_sd > f64::EPSILON {
        (stack.short - stack.long).abs() / stack.long_sd
    } else {
        0.0
    };

    let strength = if direction.class().is_none() {
        TrendStrength::Ranging
    } else if normalized_spread > STRONG_SPREAD {
        TrendStrength::Strong
    } else if normalized_spread > MODERATE_SPREAD {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    };

    let volatility = std_dev(values, VOLATILITY_WINDOW)
        .map(VolatilityLevel::from_std_dev)
        .unwrap_or(VolatilityLevel::Medium);

    TrendContext {
        direction,
        strength,
        volatility,
        macro_regime: MacroRegime::Default,
        is_transitioning: false,
        normalized_spread,
    }
}

/// Base trend context plus the macro-regime bucket and transition flag.
pub fn market_regime_context(values: &[f64]) -> TrendContext {
    let mut ctx = trend_context(values);
    let Some(stack) = ema_stack(values) else {
        return ctx;
    };
    ctx.macro_regime = MacroRegime::classify(ctx.strength, ctx.volatility);

    let cur = stack.short - stack.medium;
    let prev = values
        .get(1..)
        .and_then(|older| Some(ema(older, SHORT_EMA)? - ema(older, MEDIUM_EMA)?));
    if let Some(prev) = prev {
        let flipped = cur != 0.0 && prev != 0.0 && (cur > 0.0) != (prev > 0.0);
        ctx.is_transitioning = flipped && cur.abs() >= TRANSITION_BAND * stack.long_sd;
    }
    ctx
}
