//! Compatibility results
//!
//! Results are immutable snapshots: built once by the scoring engine or
//! reconstructed from the cache, never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{CompatibilityFactor, PersonalityTrait};

/// Kind of entity being scored against the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    User,
    Tribe,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::User => "user",
            TargetType::Tribe => "tribe",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-factor explanation of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityDetail {
    pub factor: CompatibilityFactor,
    /// Effective weight after normalisation and redistribution
    pub weight: f64,
    /// Factor score, 0 - 100
    pub score: f64,
    pub description: String,
}

/// How a candidate would shift a tribe's trait distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceProjection {
    /// Group balance factor score, 0.0 - 1.0
    pub score: f64,
    pub improves_balance: bool,
    pub current_distribution: BTreeMap<PersonalityTrait, f64>,
    pub projected_distribution: BTreeMap<PersonalityTrait, f64>,
}

/// Overall compatibility of a subject with one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub subject_id: String,
    pub target_id: String,
    pub target_type: TargetType,
    /// Weighted overall score, 0 - 100, two decimals
    pub overall_score: f64,
    /// Empty unless details were requested
    #[serde(default)]
    pub details: Vec<CompatibilityDetail>,
    /// Present for tribe targets when details were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<BalanceProjection>,
    pub calculated_at: DateTime<Utc>,
}

impl CompatibilityResult {
    /// Placeholder for a target that could not be resolved
    pub fn unscored(subject_id: &str, target_id: &str, target_type: TargetType) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            target_id: target_id.to_string(),
            target_type,
            overall_score: 0.0,
            details: Vec::new(),
            balance: None,
            calculated_at: Utc::now(),
        }
    }

    pub fn detail(&self, factor: CompatibilityFactor) -> Option<&CompatibilityDetail> {
        self.details.iter().find(|d| d.factor == factor)
    }
}

/// A candidate that could not be scored, recorded instead of failing the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub target_id: String,
    pub reason: String,
}

/// One entry of a ranked top-N list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub target_id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<CompatibilityDetail>>,
}

/// Outcome of a batch scoring request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<CompatibilityResult>,
    #[serde(default)]
    pub failures: Vec<CandidateFailure>,
}

/// Outcome of a top-N search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopMatches {
    /// Sorted by descending score, ties by ascending target id
    pub matches: Vec<RankedMatch>,
    #[serde(default)]
    pub failures: Vec<CandidateFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscored_placeholder() {
        let result = CompatibilityResult::unscored("u1", "missing", TargetType::Tribe);
        assert_eq!(result.overall_score, 0.0);
        assert!(result.details.is_empty());
        assert!(result.balance.is_none());
    }

    #[test]
    fn test_result_survives_json() {
        let result = CompatibilityResult {
            subject_id: "u1".to_string(),
            target_id: "t1".to_string(),
            target_type: TargetType::Tribe,
            overall_score: 81.37,
            details: vec![CompatibilityDetail {
                factor: CompatibilityFactor::Location,
                weight: 0.1 / 0.9,
                score: 42.5,
                description: "3.2 miles apart".to_string(),
            }],
            balance: None,
            calculated_at: Utc::now(),
        };

        let json = serde_json::to_string(&result).unwrap();
        let back: CompatibilityResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
