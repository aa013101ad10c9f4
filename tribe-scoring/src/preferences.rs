//! Weight strategies
//!
//! A strategy may bias the factor weights for a subject before aggregation.
//! [`NoAdjustment`] is the default. [`ActivityBias`] nudges weights from a
//! user's activity history; its thresholds are configuration and carry no
//! product validation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tribe_core::{CompatibilityFactor, FactorWeights, Profile};

use crate::WeightStrategy;

/// Leaves weights untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdjustment;

impl WeightStrategy for NoAdjustment {
    fn name(&self) -> &str {
        "none"
    }

    fn adjust(&self, _subject: &Profile, weights: FactorWeights) -> FactorWeights {
        weights
    }
}

/// Thresholds and increments for [`ActivityBias`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityBiasConfig {
    /// Activities needed before the interests weight is boosted
    pub min_activities: u32,
    /// Added to the interests weight for active users
    pub interests_boost: f64,
    /// Share of activities in one category needed before the focus boost applies
    pub min_focus_share: f64,
    /// Added to the interests weight for users focused on one category
    pub focus_boost: f64,
    /// Share of group events needed before the group balance weight is boosted
    pub min_group_event_ratio: f64,
    /// Added to the group balance weight for group-oriented users
    pub group_balance_boost: f64,
}

impl Default for ActivityBiasConfig {
    fn default() -> Self {
        Self {
            min_activities: 20,
            interests_boost: 0.05,
            min_focus_share: 0.6,
            focus_boost: 0.05,
            min_group_event_ratio: 0.5,
            group_balance_boost: 0.05,
        }
    }
}

/// Biases weights from the subject's activity history
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityBias {
    config: ActivityBiasConfig,
}

impl ActivityBias {
    pub fn new(config: ActivityBiasConfig) -> Self {
        Self { config }
    }
}

impl WeightStrategy for ActivityBias {
    fn name(&self) -> &str {
        "activity_bias"
    }

    fn adjust(&self, subject: &Profile, weights: FactorWeights) -> FactorWeights {
        let Some(activity) = &subject.activity else {
            return weights;
        };

        let mut adjusted = weights;
        if activity.total_activities >= self.config.min_activities {
            adjusted = adjusted.with(
                CompatibilityFactor::Interests,
                adjusted.interests + self.config.interests_boost.max(0.0),
            );
        }
        if activity
            .top_category_share()
            .is_some_and(|share| share >= self.config.min_focus_share)
        {
            adjusted = adjusted.with(
                CompatibilityFactor::Interests,
                adjusted.interests + self.config.focus_boost.max(0.0),
            );
        }
        if activity.group_event_ratio >= self.config.min_group_event_ratio {
            adjusted = adjusted.with(
                CompatibilityFactor::GroupBalance,
                adjusted.group_balance + self.config.group_balance_boost.max(0.0),
            );
        }

        match adjusted.normalized() {
            Ok(normalized) => {
                if normalized != weights {
                    debug!("Activity bias adjusted weights for {}", subject.id);
                }
                normalized
            }
            Err(_) => weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_core::{ActivitySummary, Coordinates};

    fn active_profile(total: u32, group_ratio: f64) -> Profile {
        Profile::new("u1", Coordinates::default()).with_activity(ActivitySummary {
            total_activities: total,
            by_category: Default::default(),
            group_event_ratio: group_ratio,
        })
    }

    #[test]
    fn test_no_adjustment() {
        let weights = FactorWeights::default();
        assert_eq!(NoAdjustment.adjust(&active_profile(100, 1.0), weights), weights);
    }

    #[test]
    fn test_missing_history_leaves_weights() {
        let weights = FactorWeights::default();
        let profile = Profile::new("u1", Coordinates::default());
        assert_eq!(ActivityBias::default().adjust(&profile, weights), weights);
    }

    #[test]
    fn test_active_user_gets_interest_boost() {
        let weights = FactorWeights::default();
        let adjusted = ActivityBias::default().adjust(&active_profile(25, 0.1), weights);

        assert!(adjusted.interests > weights.interests);
        assert!(adjusted.group_balance < weights.group_balance);
        assert!((adjusted.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_focused_user_gets_interest_boost() {
        let weights = FactorWeights::default();
        let mut profile = active_profile(3, 0.1);
        let spread = ActivityBias::default().adjust(&profile, weights);

        if let Some(activity) = profile.activity.as_mut() {
            activity.by_category.insert("outdoor".to_string(), 8);
            activity.by_category.insert("arts".to_string(), 2);
        }
        let focused = ActivityBias::default().adjust(&profile, weights);

        assert_eq!(spread, weights);
        assert!(focused.interests > weights.interests);
        assert!((focused.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_oriented_user_gets_balance_boost() {
        let weights = FactorWeights::default();
        let adjusted = ActivityBias::default().adjust(&active_profile(3, 0.8), weights);

        assert!(adjusted.group_balance > weights.group_balance);
        assert!((adjusted.sum() - 1.0).abs() < 1e-9);
    }
}
