//! Compatibility factors and their weights
//!
//! `FactorWeights` is always normalised: every constructor that accepts
//! caller input validates it and rescales so the five weights sum to 1.0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One independent dimension of the overall compatibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityFactor {
    Personality,
    Interests,
    CommunicationStyle,
    Location,
    GroupBalance,
}

impl CompatibilityFactor {
    pub const ALL: [CompatibilityFactor; 5] = [
        CompatibilityFactor::Personality,
        CompatibilityFactor::Interests,
        CompatibilityFactor::CommunicationStyle,
        CompatibilityFactor::Location,
        CompatibilityFactor::GroupBalance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityFactor::Personality => "personality",
            CompatibilityFactor::Interests => "interests",
            CompatibilityFactor::CommunicationStyle => "communication_style",
            CompatibilityFactor::Location => "location",
            CompatibilityFactor::GroupBalance => "group_balance",
        }
    }
}

impl fmt::Display for CompatibilityFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompatibilityFactor {
    type Err = WeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        CompatibilityFactor::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| WeightError::UnknownFactor(s.to_string()))
    }
}

/// Errors from weight validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("Weight for {factor} must be a finite non-negative number, got {value}")]
    Invalid { factor: String, value: f64 },

    #[error("Weights sum to zero")]
    AllZero,

    #[error("Unknown compatibility factor: {0}")]
    UnknownFactor(String),
}

/// Caller-supplied partial weight overrides
pub type WeightOverrides = BTreeMap<CompatibilityFactor, f64>;

/// Normalised per-factor weights (sum == 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub personality: f64,
    pub interests: f64,
    pub communication_style: f64,
    pub location: f64,
    pub group_balance: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            personality: 0.3,
            interests: 0.3,
            communication_style: 0.2,
            location: 0.1,
            group_balance: 0.1,
        }
    }
}

impl FactorWeights {
    pub fn get(&self, factor: CompatibilityFactor) -> f64 {
        match factor {
            CompatibilityFactor::Personality => self.personality,
            CompatibilityFactor::Interests => self.interests,
            CompatibilityFactor::CommunicationStyle => self.communication_style,
            CompatibilityFactor::Location => self.location,
            CompatibilityFactor::GroupBalance => self.group_balance,
        }
    }

    fn slot(&mut self, factor: CompatibilityFactor) -> &mut f64 {
        match factor {
            CompatibilityFactor::Personality => &mut self.personality,
            CompatibilityFactor::Interests => &mut self.interests,
            CompatibilityFactor::CommunicationStyle => &mut self.communication_style,
            CompatibilityFactor::Location => &mut self.location,
            CompatibilityFactor::GroupBalance => &mut self.group_balance,
        }
    }

    pub fn sum(&self) -> f64 {
        CompatibilityFactor::ALL.iter().map(|f| self.get(*f)).sum()
    }

    /// Merge overrides over `defaults` and normalise the result
    pub fn merge(defaults: &FactorWeights, overrides: &WeightOverrides) -> Result<Self, WeightError> {
        let mut merged = *defaults;
        for (factor, value) in overrides {
            check_weight(*factor, *value)?;
            *merged.slot(*factor) = *value;
        }
        merged.normalized()
    }

    /// Rescale so the weights sum to 1.0
    pub fn normalized(self) -> Result<Self, WeightError> {
        for factor in CompatibilityFactor::ALL {
            check_weight(factor, self.get(factor))?;
        }

        let total = self.sum();
        if total <= f64::EPSILON {
            return Err(WeightError::AllZero);
        }

        let mut normalized = self;
        for factor in CompatibilityFactor::ALL {
            *normalized.slot(factor) = self.get(factor) / total;
        }
        Ok(normalized)
    }

    /// Zero out `factor` and hand its weight to the remaining factors in
    /// proportion to their current weights. If the remaining factors carry
    /// no weight at all they share it equally.
    pub fn redistribute(self, factor: CompatibilityFactor) -> Self {
        let removed = self.get(factor);
        let remaining = self.sum() - removed;
        let others: Vec<CompatibilityFactor> = CompatibilityFactor::ALL
            .into_iter()
            .filter(|f| *f != factor)
            .collect();

        let mut result = self;
        *result.slot(factor) = 0.0;

        if remaining <= f64::EPSILON {
            let share = 1.0 / others.len() as f64;
            for other in others {
                *result.slot(other) = share;
            }
        } else {
            for other in others {
                *result.slot(other) = self.get(other) / remaining;
            }
        }
        result
    }

    /// Adjust a single weight, leaving the result un-normalised
    pub fn with(mut self, factor: CompatibilityFactor, value: f64) -> Self {
        *self.slot(factor) = value;
        self
    }

    /// Iterate factors in declaration order with their weight
    pub fn iter(&self) -> impl Iterator<Item = (CompatibilityFactor, f64)> + '_ {
        CompatibilityFactor::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

fn check_weight(factor: CompatibilityFactor, value: f64) -> Result<(), WeightError> {
    if !value.is_finite() || value < 0.0 {
        return Err(WeightError::Invalid {
            factor: factor.to_string(),
            value,
        });
    }
    Ok(())
}

/// Parse `factor=value` pairs (comma separated) into overrides
pub fn parse_overrides(input: &str) -> Result<WeightOverrides, WeightError> {
    let mut overrides = WeightOverrides::new();
    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| WeightError::UnknownFactor(pair.to_string()))?;
        let factor: CompatibilityFactor = name.parse()?;
        let value: f64 = value.trim().parse().map_err(|_| WeightError::Invalid {
            factor: factor.to_string(),
            value: f64::NAN,
        })?;
        overrides.insert(factor, value);
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((FactorWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_override_is_renormalized() {
        let mut overrides = WeightOverrides::new();
        overrides.insert(CompatibilityFactor::Personality, 0.6);

        let weights = FactorWeights::merge(&FactorWeights::default(), &overrides).unwrap();

        // 0.6 + 0.3 + 0.2 + 0.1 + 0.1 = 1.3
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!((weights.personality - 0.6 / 1.3).abs() < 1e-9);
        assert!((weights.interests - 0.3 / 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_negative_override_rejected() {
        let mut overrides = WeightOverrides::new();
        overrides.insert(CompatibilityFactor::Location, -0.1);

        let err = FactorWeights::merge(&FactorWeights::default(), &overrides).unwrap_err();
        assert!(matches!(err, WeightError::Invalid { .. }));
    }

    #[test]
    fn test_all_zero_rejected() {
        let mut overrides = WeightOverrides::new();
        for factor in CompatibilityFactor::ALL {
            overrides.insert(factor, 0.0);
        }

        let err = FactorWeights::merge(&FactorWeights::default(), &overrides).unwrap_err();
        assert_eq!(err, WeightError::AllZero);
    }

    #[test]
    fn test_redistribute_group_balance() {
        let weights = FactorWeights::default().redistribute(CompatibilityFactor::GroupBalance);

        assert_eq!(weights.group_balance, 0.0);
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        // 0.3 / 0.9
        assert!((weights.personality - 1.0 / 3.0).abs() < 1e-9);
        assert!((weights.location - 0.1 / 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_redistribute_when_only_factor_has_weight() {
        let weights = FactorWeights {
            personality: 0.0,
            interests: 0.0,
            communication_style: 0.0,
            location: 0.0,
            group_balance: 1.0,
        }
        .redistribute(CompatibilityFactor::GroupBalance);

        assert_eq!(weights.personality, 0.25);
        assert!((weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_overrides() {
        let overrides = parse_overrides("personality=0.5, communication-style=0.25").unwrap();
        assert_eq!(overrides.get(&CompatibilityFactor::Personality), Some(&0.5));
        assert_eq!(overrides.get(&CompatibilityFactor::CommunicationStyle), Some(&0.25));

        assert!(matches!(
            parse_overrides("charisma=1.0"),
            Err(WeightError::UnknownFactor(_))
        ));
    }

    #[test]
    fn test_overrides_deserialize_from_snake_case_keys() {
        let overrides: WeightOverrides =
            serde_json::from_str(r#"{"group_balance": 0.4, "location": 0.0}"#).unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[&CompatibilityFactor::GroupBalance], 0.4);
    }
}
