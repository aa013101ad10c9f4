//! User profiles as seen by the scoring engine
//!
//! Profiles are owned by the external profile store and are read-only here.
//! Every field that may be absent in stored data has a serde default so that a
//! sparse record still deserialises; absent values score as neutral (0).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The five personality traits tracked for every user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl PersonalityTrait {
    pub const ALL: [PersonalityTrait; 5] = [
        PersonalityTrait::Openness,
        PersonalityTrait::Conscientiousness,
        PersonalityTrait::Extraversion,
        PersonalityTrait::Agreeableness,
        PersonalityTrait::Neuroticism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityTrait::Openness => "openness",
            PersonalityTrait::Conscientiousness => "conscientiousness",
            PersonalityTrait::Extraversion => "extraversion",
            PersonalityTrait::Agreeableness => "agreeableness",
            PersonalityTrait::Neuroticism => "neuroticism",
        }
    }
}

impl fmt::Display for PersonalityTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred communication style
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    Direct,
    Thoughtful,
    Expressive,
    Supportive,
    Analytical,
}

impl CommunicationStyle {
    pub const ALL: [CommunicationStyle; 5] = [
        CommunicationStyle::Direct,
        CommunicationStyle::Thoughtful,
        CommunicationStyle::Expressive,
        CommunicationStyle::Supportive,
        CommunicationStyle::Analytical,
    ];

    /// Row/column of this style in the compatibility matrix
    pub fn index(&self) -> usize {
        match self {
            CommunicationStyle::Direct => 0,
            CommunicationStyle::Thoughtful => 1,
            CommunicationStyle::Expressive => 2,
            CommunicationStyle::Supportive => 3,
            CommunicationStyle::Analytical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationStyle::Direct => "direct",
            CommunicationStyle::Thoughtful => "thoughtful",
            CommunicationStyle::Expressive => "expressive",
            CommunicationStyle::Supportive => "supportive",
            CommunicationStyle::Analytical => "analytical",
        }
    }
}

impl fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declared interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    /// Interest category (e.g. "outdoor", "arts")
    pub category: String,
    /// Specific interest within the category
    pub name: String,
    /// Enthusiasm level: 1 (casual) to 3 (passionate)
    #[serde(default = "default_level")]
    pub level: u8,
}

fn default_level() -> u8 {
    1
}

impl Interest {
    pub fn new(category: &str, name: &str, level: u8) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            level,
        }
    }

    /// Level clamped to the valid 1..=3 range
    pub fn weight(&self) -> u32 {
        self.level.clamp(1, 3) as u32
    }
}

/// A point on the globe, in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and within [-90, 90] x [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Aggregated activity history, consumed only by optional weight strategies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Number of activities the user took part in
    #[serde(default)]
    pub total_activities: u32,
    /// Activities per interest category
    #[serde(default)]
    pub by_category: BTreeMap<String, u32>,
    /// Fraction (0.0 - 1.0) of activities that were group events
    #[serde(default)]
    pub group_event_ratio: f64,
}

impl ActivitySummary {
    /// Share (0.0 - 1.0) of categorised activities in the busiest category
    pub fn top_category_share(&self) -> Option<f64> {
        let total: u32 = self.by_category.values().sum();
        if total == 0 {
            return None;
        }
        self.by_category
            .values()
            .max()
            .map(|top| f64::from(*top) / f64::from(total))
    }
}

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    /// Raw trait scores, 0 - 100
    #[serde(default)]
    pub personality_traits: BTreeMap<PersonalityTrait, f64>,
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub communication_style: Option<CommunicationStyle>,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub activity: Option<ActivitySummary>,
}

impl Profile {
    pub fn new(id: &str, coordinates: Coordinates) -> Self {
        Self {
            id: id.to_string(),
            personality_traits: BTreeMap::new(),
            interests: Vec::new(),
            communication_style: None,
            coordinates,
            activity: None,
        }
    }

    pub fn with_trait(mut self, personality_trait: PersonalityTrait, score: f64) -> Self {
        self.personality_traits.insert(personality_trait, score);
        self
    }

    pub fn with_traits(mut self, scores: [f64; 5]) -> Self {
        for (t, score) in PersonalityTrait::ALL.into_iter().zip(scores) {
            self.personality_traits.insert(t, score);
        }
        self
    }

    pub fn with_interest(mut self, category: &str, name: &str, level: u8) -> Self {
        self.interests.push(Interest::new(category, name, level));
        self
    }

    pub fn with_style(mut self, style: CommunicationStyle) -> Self {
        self.communication_style = Some(style);
        self
    }

    pub fn with_activity(mut self, activity: ActivitySummary) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Trait score scaled to [0, 1]; missing or non-finite traits are 0
    pub fn normalized_trait(&self, personality_trait: PersonalityTrait) -> f64 {
        self.personality_traits
            .get(&personality_trait)
            .copied()
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 100.0) / 100.0)
            .unwrap_or(0.0)
    }

    /// Category with the highest summed interest level.
    /// Ties resolve to the alphabetically first category.
    pub fn primary_category(&self) -> Option<&str> {
        let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
        for interest in &self.interests {
            *totals.entry(interest.category.as_str()).or_default() += interest.weight();
        }

        let mut best: Option<(&str, u32)> = None;
        for (category, total) in totals {
            if best.map_or(true, |(_, t)| total > t) {
                best = Some((category, total));
            }
        }
        best.map(|(category, _)| category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_category_share() {
        let mut activity = ActivitySummary::default();
        assert_eq!(activity.top_category_share(), None);

        activity.by_category.insert("outdoor".to_string(), 6);
        activity.by_category.insert("arts".to_string(), 2);
        assert_eq!(activity.top_category_share(), Some(0.75));
    }

    #[test]
    fn test_missing_trait_is_neutral() {
        let profile = Profile::new("u1", Coordinates::default())
            .with_trait(PersonalityTrait::Openness, 80.0);

        assert_eq!(profile.normalized_trait(PersonalityTrait::Openness), 0.8);
        assert_eq!(profile.normalized_trait(PersonalityTrait::Neuroticism), 0.0);
    }

    #[test]
    fn test_trait_scores_are_clamped() {
        let profile = Profile::new("u1", Coordinates::default())
            .with_trait(PersonalityTrait::Openness, 140.0)
            .with_trait(PersonalityTrait::Extraversion, -5.0)
            .with_trait(PersonalityTrait::Agreeableness, f64::NAN);

        assert_eq!(profile.normalized_trait(PersonalityTrait::Openness), 1.0);
        assert_eq!(profile.normalized_trait(PersonalityTrait::Extraversion), 0.0);
        assert_eq!(profile.normalized_trait(PersonalityTrait::Agreeableness), 0.0);
    }

    #[test]
    fn test_primary_category() {
        let profile = Profile::new("u1", Coordinates::default())
            .with_interest("outdoor", "hiking", 2)
            .with_interest("arts", "painting", 3)
            .with_interest("outdoor", "climbing", 2);

        assert_eq!(profile.primary_category(), Some("outdoor"));
        assert_eq!(Profile::new("u2", Coordinates::default()).primary_category(), None);
    }

    #[test]
    fn test_primary_category_tie_is_alphabetical() {
        let profile = Profile::new("u1", Coordinates::default())
            .with_interest("games", "chess", 2)
            .with_interest("arts", "pottery", 2);

        assert_eq!(profile.primary_category(), Some("arts"));
    }

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(47.6, -122.3).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_sparse_profile_deserializes() {
        let profile: Profile = serde_json::from_str(r#"{"id": "u9"}"#).unwrap();
        assert!(profile.interests.is_empty());
        assert!(profile.communication_style.is_none());
        assert_eq!(profile.coordinates, Coordinates::default());
    }
}
