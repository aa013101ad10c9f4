//! Weighted aggregation of factor scores

use tribe_core::{CompatibilityFactor, FactorWeights};

/// Raw factor scores on the 0.0 - 1.0 scale.
///
/// `group_balance` is `None` when the target is not a tribe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScores {
    pub personality: f64,
    pub interests: f64,
    pub communication_style: f64,
    pub location: f64,
    pub group_balance: Option<f64>,
}

impl FactorScores {
    pub fn get(&self, factor: CompatibilityFactor) -> Option<f64> {
        match factor {
            CompatibilityFactor::Personality => Some(self.personality),
            CompatibilityFactor::Interests => Some(self.interests),
            CompatibilityFactor::CommunicationStyle => Some(self.communication_style),
            CompatibilityFactor::Location => Some(self.location),
            CompatibilityFactor::GroupBalance => self.group_balance,
        }
    }
}

/// Overall score with the weights that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    /// 0 - 100, two decimals
    pub overall_score: f64,
    /// Effective weights after redistribution of inapplicable factors
    pub weights: FactorWeights,
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a 0.0 - 1.0 factor score to the caller-facing 0 - 100 scale
pub fn to_percent(score: f64) -> f64 {
    round2(score.clamp(0.0, 1.0) * 100.0)
}

/// Combine factor scores with normalised `weights`
pub fn aggregate(scores: &FactorScores, weights: &FactorWeights) -> Aggregate {
    let mut effective = *weights;
    for factor in CompatibilityFactor::ALL {
        if scores.get(factor).is_none() {
            effective = effective.redistribute(factor);
        }
    }

    let total: f64 = effective
        .iter()
        .filter_map(|(factor, weight)| scores.get(factor).map(|s| s.clamp(0.0, 1.0) * weight))
        .sum();

    Aggregate {
        overall_score: round2(total * 100.0).clamp(0.0, 100.0),
        weights: effective,
    }
}
