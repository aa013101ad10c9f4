//! Scoring engine
//!
//! Runs every factor scorer for one subject/target pair and aggregates
//! the result. Scorer failures never abort an evaluation: the failing
//! factor scores 0 and the error is reported next to the result so the
//! caller can decide whether to keep or drop the candidate.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tribe_core::{
    BalanceProjection, CompatibilityDetail, CompatibilityFactor, CompatibilityResult,
    FactorWeights, Profile, TargetType, Tribe, DEFAULT_MAX_DISTANCE_MILES,
};

use crate::{
    aggregate, communication_score, describe_projection, interest_match, location_match,
    personality_match, project_balance, to_percent, tribe_interest_match, FactorScores,
    ScoreError, TraitWeights,
};

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Radius beyond which the location factor scores 0
    pub max_distance_miles: f64,
    /// Default factor weights, normalised on validation
    pub weights: FactorWeights,
    /// Relative trait weights inside the personality factor
    pub trait_weights: TraitWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_distance_miles: DEFAULT_MAX_DISTANCE_MILES,
            weights: FactorWeights::default(),
            trait_weights: TraitWeights::default(),
        }
    }
}

impl ScoringConfig {
    /// Validate and normalise the default weights in place
    pub fn validate(&mut self) -> Result<(), ScoreError> {
        self.weights = self.weights.normalized()?;
        self.trait_weights.validate()?;
        if !self.max_distance_miles.is_finite() || self.max_distance_miles <= 0.0 {
            return Err(ScoreError::InvalidMaxDistance(self.max_distance_miles));
        }
        Ok(())
    }
}

/// What the subject is being scored against
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    User(&'a Profile),
    /// A tribe with whichever member profiles could be resolved
    Tribe {
        tribe: &'a Tribe,
        members: &'a [Profile],
    },
}

impl Target<'_> {
    pub fn id(&self) -> &str {
        match self {
            Target::User(profile) => &profile.id,
            Target::Tribe { tribe, .. } => &tribe.id,
        }
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            Target::User(_) => TargetType::User,
            Target::Tribe { .. } => TargetType::Tribe,
        }
    }
}

/// A scored pair plus any factor that failed along the way
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: CompatibilityResult,
    pub errors: Vec<(CompatibilityFactor, ScoreError)>,
}

impl Evaluation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// One-line summary of the failed factors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|(factor, e)| format!("{}: {}", factor, e))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

struct FactorOutcome {
    score: f64,
    description: String,
}

/// Pure compatibility scorer
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score `subject` against `target` using normalised `weights`
    pub fn evaluate(
        &self,
        subject: &Profile,
        target: Target<'_>,
        weights: &FactorWeights,
        include_details: bool,
    ) -> Evaluation {
        let mut errors = Vec::new();

        let personality = self.personality(subject, target);
        let interests = self.interests(subject, target);
        let communication = self.communication(subject, target);
        let location = match self.location(subject, target) {
            Ok(outcome) => outcome,
            Err(e) => {
                let outcome = FactorOutcome {
                    score: 0.0,
                    description: format!("Location unavailable: {}", e),
                };
                errors.push((CompatibilityFactor::Location, e));
                outcome
            }
        };
        let projection = match target {
            Target::Tribe { members, .. } => Some((project_balance(members, subject), members.len())),
            Target::User(_) => None,
        };

        let scores = FactorScores {
            personality: personality.score,
            interests: interests.score,
            communication_style: communication.score,
            location: location.score,
            group_balance: projection.as_ref().map(|(p, _)| p.score),
        };
        let aggregate = aggregate(&scores, weights);

        debug!(
            "Scored {} against {} {}: {:.2}",
            subject.id,
            target.target_type(),
            target.id(),
            aggregate.overall_score
        );

        let (details, balance) = if include_details {
            let balance_description = match &projection {
                Some((p, member_count)) => describe_projection(p, *member_count),
                None => "Not applicable to user targets".to_string(),
            };
            let details = CompatibilityFactor::ALL
                .into_iter()
                .map(|factor| {
                    let (score, description) = match factor {
                        CompatibilityFactor::Personality => {
                            (personality.score, personality.description.clone())
                        }
                        CompatibilityFactor::Interests => {
                            (interests.score, interests.description.clone())
                        }
                        CompatibilityFactor::CommunicationStyle => {
                            (communication.score, communication.description.clone())
                        }
                        CompatibilityFactor::Location => {
                            (location.score, location.description.clone())
                        }
                        CompatibilityFactor::GroupBalance => (
                            scores.group_balance.unwrap_or(0.0),
                            balance_description.clone(),
                        ),
                    };
                    CompatibilityDetail {
                        factor,
                        weight: aggregate.weights.get(factor),
                        score: to_percent(score),
                        description,
                    }
                })
                .collect();
            let balance: Option<BalanceProjection> = projection.map(|(p, _)| p);
            (details, balance)
        } else {
            (Vec::new(), None)
        };

        Evaluation {
            result: CompatibilityResult {
                subject_id: subject.id.clone(),
                target_id: target.id().to_string(),
                target_type: target.target_type(),
                overall_score: aggregate.overall_score,
                details,
                balance,
                calculated_at: Utc::now(),
            },
            errors,
        }
    }

    fn personality(&self, subject: &Profile, target: Target<'_>) -> FactorOutcome {
        let weights = &self.config.trait_weights;
        match target {
            Target::User(other) => {
                let m = personality_match(subject, other, weights);
                let breakdown = m
                    .per_trait
                    .iter()
                    .map(|(t, s)| format!("{} {:.0}%", t, s * 100.0))
                    .collect::<Vec<_>>()
                    .join(", ");
                FactorOutcome {
                    score: m.score,
                    description: format!("Personality fit {:.0}% ({})", m.score * 100.0, breakdown),
                }
            }
            Target::Tribe { members, .. } => {
                if members.is_empty() {
                    return FactorOutcome {
                        score: 0.0,
                        description: "No member profiles to compare".to_string(),
                    };
                }
                let score = members
                    .iter()
                    .map(|m| personality_match(subject, m, weights).score)
                    .sum::<f64>()
                    / members.len() as f64;
                FactorOutcome {
                    score,
                    description: format!(
                        "Average personality fit {:.0}% across {} members",
                        score * 100.0,
                        members.len()
                    ),
                }
            }
        }
    }

    fn interests(&self, subject: &Profile, target: Target<'_>) -> FactorOutcome {
        let m = match target {
            Target::User(other) => interest_match(subject, other),
            Target::Tribe { tribe, .. } => tribe_interest_match(subject, tribe),
        };
        FactorOutcome {
            score: m.score,
            description: m.describe(),
        }
    }

    fn communication(&self, subject: &Profile, target: Target<'_>) -> FactorOutcome {
        let Some(style) = subject.communication_style else {
            return FactorOutcome {
                score: 0.0,
                description: "Communication style unknown".to_string(),
            };
        };

        match target {
            Target::User(other) => {
                let score = communication_score(Some(style), other.communication_style);
                let description = match other.communication_style {
                    Some(other_style) => {
                        format!("{} and {} communication styles", style, other_style)
                    }
                    None => format!("{} style; other style unknown", style),
                };
                FactorOutcome { score, description }
            }
            Target::Tribe { members, .. } => {
                if members.is_empty() {
                    return FactorOutcome {
                        score: 0.0,
                        description: "No member profiles to compare".to_string(),
                    };
                }
                let score = members
                    .iter()
                    .map(|m| communication_score(Some(style), m.communication_style))
                    .sum::<f64>()
                    / members.len() as f64;
                FactorOutcome {
                    score,
                    description: format!(
                        "Average {} style fit {:.0}% across {} members",
                        style,
                        score * 100.0,
                        members.len()
                    ),
                }
            }
        }
    }

    fn location(&self, subject: &Profile, target: Target<'_>) -> Result<FactorOutcome, ScoreError> {
        let other = match target {
            Target::User(profile) => &profile.coordinates,
            Target::Tribe { tribe, .. } => &tribe.coordinates,
        };
        let m = location_match(&subject.coordinates, other, self.config.max_distance_miles)?;
        Ok(FactorOutcome {
            score: m.score,
            description: m.describe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_core::{CommunicationStyle, Coordinates};

    fn subject() -> Profile {
        Profile::new("alice", Coordinates::new(47.6062, -122.3321))
            .with_traits([80.0, 70.0, 50.0, 60.0, 30.0])
            .with_interest("outdoor", "hiking", 3)
            .with_interest("food", "ramen", 1)
            .with_style(CommunicationStyle::Direct)
    }

    #[test]
    fn test_user_target_details() {
        let engine = ScoringEngine::default();
        let bob = Profile::new("bob", Coordinates::new(47.6062, -122.3321))
            .with_traits([80.0, 70.0, 50.0, 60.0, 30.0])
            .with_interest("outdoor", "climbing", 2)
            .with_style(CommunicationStyle::Analytical);

        let eval = engine.evaluate(&subject(), Target::User(&bob), &FactorWeights::default(), true);
        assert!(eval.is_clean());

        let result = eval.result;
        assert_eq!(result.target_type, TargetType::User);
        assert_eq!(result.details.len(), 5);
        assert_eq!(result.detail(CompatibilityFactor::Personality).unwrap().score, 74.0);
        assert_eq!(result.detail(CompatibilityFactor::CommunicationStyle).unwrap().score, 80.0);
        assert_eq!(result.detail(CompatibilityFactor::Location).unwrap().score, 100.0);
        assert_eq!(result.detail(CompatibilityFactor::Interests).unwrap().score, 50.0);

        let balance = result.detail(CompatibilityFactor::GroupBalance).unwrap();
        assert_eq!(balance.weight, 0.0);
        let weight_sum: f64 = result.details.iter().map(|d| d.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
        assert!(result.balance.is_none());

        // (0.74*0.3 + 0.5*0.3 + 0.8*0.2 + 1.0*0.1) / 0.9
        assert_eq!(result.overall_score, 70.22);
    }

    #[test]
    fn test_empty_tribe_balance_is_maximum() {
        let engine = ScoringEngine::default();
        let tribe = Tribe::new("hikers", Coordinates::new(47.6062, -122.3321), 8)
            .with_interest("outdoor", "hiking", true);

        let eval = engine.evaluate(
            &subject(),
            Target::Tribe { tribe: &tribe, members: &[] },
            &FactorWeights::default(),
            true,
        );

        let result = eval.result;
        assert_eq!(result.detail(CompatibilityFactor::GroupBalance).unwrap().score, 100.0);
        let projection = result.balance.unwrap();
        assert!(projection.improves_balance);
    }

    #[test]
    fn test_tribe_averages_members() {
        let engine = ScoringEngine::default();
        let tribe = Tribe::new("t", Coordinates::new(47.6062, -122.3321), 8)
            .with_member("m1")
            .with_member("m2");
        let members = vec![
            Profile::new("m1", Coordinates::default()).with_style(CommunicationStyle::Direct),
            Profile::new("m2", Coordinates::default()).with_style(CommunicationStyle::Supportive),
        ];

        let eval = engine.evaluate(
            &subject(),
            Target::Tribe { tribe: &tribe, members: &members },
            &FactorWeights::default(),
            true,
        );

        // (0.9 + 0.5) / 2
        let detail = eval.result.detail(CompatibilityFactor::CommunicationStyle).unwrap().clone();
        assert_eq!(detail.score, 70.0);
    }

    #[test]
    fn test_bad_coordinates_reported_not_fatal() {
        let engine = ScoringEngine::default();
        let broken = Profile::new("broken", Coordinates::new(f64::NAN, 0.0));

        let eval = engine.evaluate(&subject(), Target::User(&broken), &FactorWeights::default(), false);

        assert!(!eval.is_clean());
        assert_eq!(eval.errors[0].0, CompatibilityFactor::Location);
        assert!(eval.error_summary().starts_with("location"));
        assert!(eval.result.details.is_empty());
    }

    #[test]
    fn test_config_validation_normalizes_weights() {
        let mut config = ScoringConfig {
            weights: FactorWeights {
                personality: 3.0,
                interests: 3.0,
                communication_style: 2.0,
                location: 1.0,
                group_balance: 1.0,
            },
            ..Default::default()
        };

        config.validate().unwrap();
        assert!((config.weights.personality - 0.3).abs() < 1e-9);

        let mut bad = ScoringConfig { max_distance_miles: -1.0, ..Default::default() };
        assert!(bad.validate().is_err());
    }
}
