//! Tribes - bounded-size interest groups a user can join

use serde::{Deserialize, Serialize};

use crate::Coordinates;

/// An interest declared by a tribe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TribeInterest {
    pub category: String,
    pub name: String,
    /// Whether this is the tribe's headline interest
    #[serde(default)]
    pub is_primary: bool,
}

impl TribeInterest {
    pub fn new(category: &str, name: &str, is_primary: bool) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            is_primary,
        }
    }
}

/// A tribe as seen by the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tribe {
    pub id: String,
    /// User ids of current members
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub interests: Vec<TribeInterest>,
    #[serde(default)]
    pub coordinates: Coordinates,
    pub max_members: usize,
}

impl Tribe {
    pub fn new(id: &str, coordinates: Coordinates, max_members: usize) -> Self {
        Self {
            id: id.to_string(),
            members: Vec::new(),
            interests: Vec::new(),
            coordinates,
            max_members,
        }
    }

    pub fn with_member(mut self, user_id: &str) -> Self {
        self.members.push(user_id.to_string());
        self
    }

    pub fn with_interest(mut self, category: &str, name: &str, is_primary: bool) -> Self {
        self.interests.push(TribeInterest::new(category, name, is_primary));
        self
    }

    /// Room for at least one more member
    pub fn has_capacity(&self) -> bool {
        self.members.len() < self.max_members
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Category of the first primary interest, falling back to the most
    /// frequent category (alphabetically first on ties)
    pub fn primary_category(&self) -> Option<&str> {
        if let Some(primary) = self.interests.iter().find(|i| i.is_primary) {
            return Some(primary.category.as_str());
        }

        let mut counts: std::collections::BTreeMap<&str, usize> = Default::default();
        for interest in &self.interests {
            *counts.entry(interest.category.as_str()).or_default() += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for (category, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((category, count));
            }
        }
        best.map(|(category, _)| category)
    }
}
