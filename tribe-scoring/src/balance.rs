//! Group balance projection
//!
//! Estimates whether adding a candidate moves a tribe's mean trait profile
//! closer to the ideal where every trait sits at `IDEAL_TRAIT_SHARE`.

use std::collections::BTreeMap;

use tribe_core::{BalanceProjection, PersonalityTrait, Profile, IDEAL_TRAIT_SHARE};

/// Largest change in deviation credited to a single candidate
const MAX_IMPROVEMENT: f64 = 0.5;

/// Mean normalised score per trait across `profiles`
pub fn trait_distribution<'a, I>(profiles: I) -> BTreeMap<PersonalityTrait, f64>
where
    I: IntoIterator<Item = &'a Profile>,
{
    let mut sums: BTreeMap<PersonalityTrait, f64> =
        PersonalityTrait::ALL.iter().map(|t| (*t, 0.0)).collect();
    let mut count = 0usize;

    for profile in profiles {
        for t in PersonalityTrait::ALL {
            if let Some(sum) = sums.get_mut(&t) {
                *sum += profile.normalized_trait(t);
            }
        }
        count += 1;
    }

    if count > 0 {
        for sum in sums.values_mut() {
            *sum /= count as f64;
        }
    }
    sums
}

/// L1 distance of a distribution from the ideal
pub fn deviation_from_ideal(distribution: &BTreeMap<PersonalityTrait, f64>) -> f64 {
    PersonalityTrait::ALL
        .iter()
        .map(|t| (distribution.get(t).copied().unwrap_or(0.0) - IDEAL_TRAIT_SHARE).abs())
        .sum()
}

/// Project the effect of `candidate` joining a tribe with `members`
pub fn project_balance(members: &[Profile], candidate: &Profile) -> BalanceProjection {
    let projected_distribution = trait_distribution(members.iter().chain(std::iter::once(candidate)));

    if members.is_empty() {
        // The candidate defines the group
        return BalanceProjection {
            score: 1.0,
            improves_balance: true,
            current_distribution: trait_distribution(members),
            projected_distribution,
        };
    }

    let current_distribution = trait_distribution(members);
    let improvement = deviation_from_ideal(&current_distribution)
        - deviation_from_ideal(&projected_distribution);

    BalanceProjection {
        score: 0.5 + improvement.clamp(-MAX_IMPROVEMENT, MAX_IMPROVEMENT),
        improves_balance: improvement > 0.0,
        current_distribution,
        projected_distribution,
    }
}

/// Group balance factor score, 0.0 - 1.0
pub fn balance_score(members: &[Profile], candidate: &Profile) -> f64 {
    project_balance(members, candidate).score
}

pub fn describe_projection(projection: &BalanceProjection, member_count: usize) -> String {
    if member_count == 0 {
        "First member; defines the tribe's trait balance".to_string()
    } else if projection.improves_balance {
        format!("Improves the trait balance of {} members", member_count)
    } else if (projection.score - 0.5).abs() < 1e-12 {
        format!("Leaves the trait balance of {} members unchanged", member_count)
    } else {
        format!("Skews the trait balance of {} members", member_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_core::Coordinates;

    fn profile(id: &str, scores: [f64; 5]) -> Profile {
        Profile::new(id, Coordinates::default()).with_traits(scores)
    }

    #[test]
    fn test_empty_tribe_is_maximum() {
        let candidate = profile("c", [90.0, 90.0, 90.0, 90.0, 90.0]);
        let projection = project_balance(&[], &candidate);

        assert_eq!(projection.score, 1.0);
        assert!(projection.improves_balance);
    }

    #[test]
    fn test_distribution_is_mean() {
        let members = vec![
            profile("a", [40.0, 20.0, 0.0, 100.0, 60.0]),
            profile("b", [60.0, 40.0, 20.0, 0.0, 20.0]),
        ];

        let d = trait_distribution(&members);
        assert!((d[&PersonalityTrait::Openness] - 0.5).abs() < 1e-12);
        assert!((d[&PersonalityTrait::Agreeableness] - 0.5).abs() < 1e-12);
        assert!((d[&PersonalityTrait::Neuroticism] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_candidate_near_ideal_improves() {
        let members = vec![profile("a", [80.0, 80.0, 80.0, 80.0, 80.0])];
        let candidate = profile("c", [20.0, 20.0, 20.0, 20.0, 20.0]);

        let projection = project_balance(&members, &candidate);
        // deviation 3.0 -> 1.5, improvement 1.5 clamps to 0.5
        assert_eq!(projection.score, 1.0);
        assert!(projection.improves_balance);
    }

    #[test]
    fn test_candidate_far_from_ideal_worsens() {
        let members = vec![
            profile("a", [30.0, 30.0, 30.0, 30.0, 30.0]),
            profile("b", [30.0, 30.0, 30.0, 30.0, 30.0]),
        ];
        let candidate = profile("c", [60.0, 60.0, 30.0, 30.0, 30.0]);

        let projection = project_balance(&members, &candidate);
        // deviation 0.5 -> 0.7
        assert!((projection.score - 0.3).abs() < 1e-9);
        assert!(!projection.improves_balance);
        assert!(describe_projection(&projection, 2).starts_with("Skews"));
    }

    #[test]
    fn test_identical_candidate_is_neutral() {
        let members = vec![profile("a", [50.0, 50.0, 50.0, 50.0, 50.0])];
        let candidate = profile("c", [50.0, 50.0, 50.0, 50.0, 50.0]);

        let projection = project_balance(&members, &candidate);
        assert!((projection.score - 0.5).abs() < 1e-12);
        assert!(!projection.improves_balance);
    }
}
