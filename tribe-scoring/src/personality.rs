//! Personality compatibility
//!
//! Per-trait rules on scores normalised to [0, 1]:
//! - openness, conscientiousness: similarity, `1 - |a - b|`
//! - extraversion, agreeableness: moderate difference, `1 - max(d, 0.5 - d)`
//! - neuroticism: lower is better, `1 - (a + b) / 2`

use serde::{Deserialize, Serialize};

use tribe_core::{PersonalityTrait, Profile};

use crate::ScoreError;

/// Relative weight of each trait in the personality factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitWeights {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for TraitWeights {
    fn default() -> Self {
        Self {
            openness: 0.2,
            conscientiousness: 0.2,
            extraversion: 0.2,
            agreeableness: 0.2,
            neuroticism: 0.2,
        }
    }
}

impl TraitWeights {
    pub fn get(&self, personality_trait: PersonalityTrait) -> f64 {
        match personality_trait {
            PersonalityTrait::Openness => self.openness,
            PersonalityTrait::Conscientiousness => self.conscientiousness,
            PersonalityTrait::Extraversion => self.extraversion,
            PersonalityTrait::Agreeableness => self.agreeableness,
            PersonalityTrait::Neuroticism => self.neuroticism,
        }
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        let mut total = 0.0;
        for t in PersonalityTrait::ALL {
            let w = self.get(t);
            if !w.is_finite() || w < 0.0 {
                return Err(ScoreError::InvalidTraitWeights(format!("{} = {}", t, w)));
            }
            total += w;
        }
        if total <= f64::EPSILON {
            return Err(ScoreError::InvalidTraitWeights("weights sum to zero".to_string()));
        }
        Ok(())
    }
}

/// Compatibility of two normalised values of one trait
pub fn trait_compatibility(personality_trait: PersonalityTrait, a: f64, b: f64) -> f64 {
    let score = match personality_trait {
        PersonalityTrait::Openness | PersonalityTrait::Conscientiousness => 1.0 - (a - b).abs(),
        PersonalityTrait::Extraversion | PersonalityTrait::Agreeableness => {
            let diff = (a - b).abs();
            1.0 - diff.max(0.5 - diff)
        }
        PersonalityTrait::Neuroticism => 1.0 - (a + b) / 2.0,
    };
    score.clamp(0.0, 1.0)
}

/// Per-trait breakdown of a personality comparison
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalityMatch {
    /// Weighted score, 0.0 - 1.0
    pub score: f64,
    pub per_trait: [(PersonalityTrait, f64); 5],
}

/// Compare two profiles trait by trait
///
/// Identical profiles do not reach 1.0. Extraversion and agreeableness give
/// 0.5 for equal values and peak at 0.75 for a 0.25 difference, and
/// neuroticism only maxes out when both values are 0.
pub fn personality_match(a: &Profile, b: &Profile, weights: &TraitWeights) -> PersonalityMatch {
    let per_trait = PersonalityTrait::ALL.map(|t| {
        (t, trait_compatibility(t, a.normalized_trait(t), b.normalized_trait(t)))
    });

    let total_weight: f64 = PersonalityTrait::ALL.iter().map(|t| weights.get(*t).max(0.0)).sum();
    let score = if total_weight <= f64::EPSILON {
        0.0
    } else {
        per_trait
            .iter()
            .map(|(t, s)| s * weights.get(*t).max(0.0))
            .sum::<f64>()
            / total_weight
    };

    PersonalityMatch { score, per_trait }
}

/// Weighted personality compatibility, 0.0 - 1.0
pub fn personality_score(a: &Profile, b: &Profile, weights: &TraitWeights) -> f64 {
    personality_match(a, b, weights).score
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_core::Coordinates;

    fn profile(id: &str, scores: [f64; 5]) -> Profile {
        Profile::new(id, Coordinates::default()).with_traits(scores)
    }

    #[test]
    fn test_similarity_traits() {
        assert_eq!(trait_compatibility(PersonalityTrait::Openness, 0.8, 0.8), 1.0);
        assert!((trait_compatibility(PersonalityTrait::Conscientiousness, 0.9, 0.4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_moderate_difference_traits() {
        let t = PersonalityTrait::Extraversion;
        assert!((trait_compatibility(t, 0.5, 0.5) - 0.5).abs() < 1e-12);
        assert!((trait_compatibility(t, 0.25, 0.5) - 0.75).abs() < 1e-12);
        assert!((trait_compatibility(t, 0.0, 1.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_neuroticism_rewards_low_values() {
        let t = PersonalityTrait::Neuroticism;
        assert!(trait_compatibility(t, 0.1, 0.2) > trait_compatibility(t, 0.7, 0.8));
        assert!((trait_compatibility(t, 0.3, 0.3) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_identical_profiles() {
        let a = profile("a", [80.0, 70.0, 50.0, 60.0, 30.0]);
        let b = profile("b", [80.0, 70.0, 50.0, 60.0, 30.0]);

        let m = personality_match(&a, &b, &TraitWeights::default());
        assert_eq!(m.per_trait[0].1, 1.0);
        assert_eq!(m.per_trait[1].1, 1.0);
        // (1 + 1 + 0.5 + 0.5 + 0.7) / 5
        assert!((m.score - 0.74).abs() < 1e-12);
    }

    #[test]
    fn test_self_compatibility_beats_distant_profile() {
        let a = profile("a", [80.0, 70.0, 50.0, 60.0, 30.0]);
        let far = profile("far", [10.0, 5.0, 50.0, 60.0, 30.0]);
        let w = TraitWeights::default();

        assert!(personality_score(&a, &a, &w) > personality_score(&a, &far, &w));
    }

    #[test]
    fn test_empty_profiles_do_not_fail() {
        let a = Profile::new("a", Coordinates::default());
        let b = Profile::new("b", Coordinates::default());
        let score = personality_score(&a, &b, &TraitWeights::default());
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_trait_weight_override() {
        let a = profile("a", [100.0, 0.0, 50.0, 50.0, 100.0]);
        let b = profile("b", [100.0, 100.0, 50.0, 50.0, 100.0]);
        let openness_only = TraitWeights {
            openness: 1.0,
            conscientiousness: 0.0,
            extraversion: 0.0,
            agreeableness: 0.0,
            neuroticism: 0.0,
        };

        assert_eq!(personality_score(&a, &b, &openness_only), 1.0);
    }

    #[test]
    fn test_trait_weight_validation() {
        assert!(TraitWeights::default().validate().is_ok());

        let negative = TraitWeights { neuroticism: -1.0, ..Default::default() };
        assert!(negative.validate().is_err());
    }
}
