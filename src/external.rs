//! Outside-world inputs: sentiment feeds and the prime-time session.

use chrono::{DateTime, Timelike, Utc};

use crate::config::SessionConfig;

/// Supplies a confidence multiplier in `[0, 1]` from data outside the round
/// history. 1.0 leaves confidence untouched.
pub trait ExternalFeatureProvider: Send + Sync {
    fn name(&self) -> &str;

    fn sentiment_multiplier(&self, now: DateTime<Utc>) -> f64;
}

/// No external data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralFeed;

impl ExternalFeatureProvider for NeutralFeed {
    fn name(&self) -> &str {
        "neutral"
    }

    fn sentiment_multiplier(&self, _now: DateTime<Utc>) -> f64 {
        1.0
    }
}

/// Constant multiplier, for replays and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedFeed(pub f64);

impl ExternalFeatureProvider for FixedFeed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn sentiment_multiplier(&self, _now: DateTime<Utc>) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

/// Whether `now` falls in the configured UTC hour window. A window whose
/// start is after its end wraps past midnight.
pub fn is_prime_time(now: DateTime<Utc>, session: &SessionConfig) -> bool {
    let hour = now.hour();
    let (start, end) = (session.prime_start_hour, session.prime_end_hour);
    if start == end {
        false
    } else if start < end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Confidence multiplier for the session at `now`.
pub fn session_multiplier(now: DateTime<Utc>, session: &SessionConfig) -> f64 {
    if is_prime_time(now, session) {
        1.0
    } else {
        session.off_prime_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, hour, 15, 0).unwrap()
    }

    #[test]
    fn prime_window() {
        let s = SessionConfig::default();
        assert!(is_prime_time(at(12), &s));
        assert!(is_prime_time(at(21), &s));
        assert!(!is_prime_time(at(22), &s));
        assert!(!is_prime_time(at(3), &s));
        assert!((session_multiplier(at(3), &s) - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn wrapping_window() {
        let s = SessionConfig {
            prime_start_hour: 22,
            prime_end_hour: 2,
            ..SessionConfig::default()
        };
        assert!(is_prime_time(at(23), &s));
        assert!(is_prime_time(at(1), &s));
        assert!(!is_prime_time(at(12), &s));
    }

    #[test]
    fn feeds() {
        assert_eq!(NeutralFeed.sentiment_multiplier(at(0)), 1.0);
        assert_eq!(FixedFeed(1.7).sentiment_multiplier(at(0)), 1.0);
        assert_eq!(FixedFeed(0.8).sentiment_multiplier(at(0)), 0.8);
    }
}
