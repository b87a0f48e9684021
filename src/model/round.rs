use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Outcome class of a round. Digits 5-9 are BIG, 0-4 are SMALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Class {
    Big,
    Small,
}

impl Class {
    pub fn from_digit(digit: u8) -> Self {
        if digit >= 5 {
            Class::Big
        } else {
            Class::Small
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Class::Big => Class::Small,
            Class::Small => Class::Big,
        }
    }

    /// +1.0 for BIG, -1.0 for SMALL.
    pub fn sign(self) -> f64 {
        match self {
            Class::Big => 1.0,
            Class::Small => -1.0,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Class::Big => 'B',
            Class::Small => 'S',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Class::Big => "BIG",
            Class::Small => "SMALL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoundStatus {
    Win,
    Loss,
}

/// One round as delivered by the upstream feed, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub period: String,
    #[serde(deserialize_with = "string_or_number")]
    pub actual: String,
    #[serde(default)]
    pub status: Option<RoundStatus>,
}

/// Feeds send ids and outcomes either quoted or bare.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

impl HistoryRecord {
    pub fn new(period: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            actual: actual.into(),
            status: None,
        }
    }
}

/// A history record whose outcome parsed to a digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedRound {
    pub period: String,
    pub number: u8,
    pub class: Class,
}

impl ConfirmedRound {
    pub fn period_number(&self) -> Option<u64> {
        self.period.trim().parse().ok()
    }
}

impl TryFrom<&HistoryRecord> for ConfirmedRound {
    type Error = AppError;

    fn try_from(record: &HistoryRecord) -> Result<Self, Self::Error> {
        let number: u8 = record.actual.trim().parse().map_err(|_| AppError::MalformedRecord {
            period: record.period.clone(),
            reason: format!("actual '{}' is not a digit", record.actual),
        })?;
        if number > 9 {
            return Err(AppError::MalformedRecord {
                period: record.period.clone(),
                reason: format!("actual {} is outside 0-9", number),
            });
        }
        Ok(Self {
            period: record.period.clone(),
            number,
            class: Class::from_digit(number),
        })
    }
}

/// Keep only records with a parseable outcome, preserving newest-first order.
pub fn confirmed_rounds(history: &[HistoryRecord]) -> Vec<ConfirmedRound> {
    history
        .iter()
        .filter_map(|record| match ConfirmedRound::try_from(record) {
            Ok(round) => Some(round),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed history record");
                None
            }
        })
        .collect()
}

/// Parse a JSON array of history records, newest first.
pub fn parse_history(json: &str) -> Result<Vec<HistoryRecord>, AppError> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_history(path: &Path) -> Result<Vec<HistoryRecord>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    parse_history(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_maps_to_class() {
        assert_eq!(Class::from_digit(0), Class::Small);
        assert_eq!(Class::from_digit(4), Class::Small);
        assert_eq!(Class::from_digit(5), Class::Big);
        assert_eq!(Class::from_digit(9), Class::Big);
    }

    #[test]
    fn malformed_records_are_filtered() {
        let history = vec![
            HistoryRecord::new("103", "7"),
            HistoryRecord::new("102", "x"),
            HistoryRecord::new("101", "12"),
            HistoryRecord::new("100", " 3 "),
        ];
        let rounds = confirmed_rounds(&history);
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].class, Class::Big);
        assert_eq!(rounds[1].number, 3);
        assert_eq!(rounds[1].period_number(), Some(100));
    }

    #[test]
    fn class_serializes_uppercase() {
        let s = serde_json::to_string(&Class::Big).unwrap();
        assert_eq!(s, "\"BIG\"");
        let c: Class = serde_json::from_str("\"SMALL\"").unwrap();
        assert_eq!(c, Class::Small);
    }

    #[test]
    fn history_accepts_quoted_and_bare_values() {
        let json = r#"[
            {"period": "20260314001", "actual": "7", "status": "WIN"},
            {"period": 20260314000, "actual": 2}
        ]"#;
        let history = parse_history(json).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, Some(RoundStatus::Win));
        assert_eq!(history[1].period, "20260314000");
        assert_eq!(history[1].actual, "2");
        assert!(matches!(parse_history("{"), Err(AppError::Json(_))));
    }
}
