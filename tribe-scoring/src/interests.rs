//! Interest overlap
//!
//! The numeric score is the Jaccard similarity of the two category sets.
//! Whether the parties share their headline category is reported
//! alongside but never changes the number.

use std::collections::BTreeSet;

use tribe_core::{Profile, Tribe};

/// Result of comparing two sets of interests
#[derive(Debug, Clone, PartialEq)]
pub struct InterestMatch {
    /// Jaccard similarity, 0.0 - 1.0
    pub score: f64,
    /// Both sides have the same primary category
    pub primary_match: bool,
    /// Categories present on both sides, sorted
    pub shared: Vec<String>,
    /// Size of the union of both category sets
    pub union_size: usize,
}

impl InterestMatch {
    pub fn describe(&self) -> String {
        let primary = if self.primary_match {
            "primary interest matches"
        } else {
            "primary interests differ"
        };

        if self.shared.is_empty() {
            format!("No shared interest categories; {}", primary)
        } else {
            format!(
                "{} of {} interest categories shared ({}); {}",
                self.shared.len(),
                self.union_size,
                self.shared.join(", "),
                primary
            )
        }
    }
}

/// Jaccard similarity over category sets, 0 for an empty union
pub fn jaccard<'a>(a: &BTreeSet<&'a str>, b: &BTreeSet<&'a str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn compare<'a>(
    a: BTreeSet<&'a str>,
    b: BTreeSet<&'a str>,
    primary_a: Option<&str>,
    primary_b: Option<&str>,
) -> InterestMatch {
    let shared: Vec<String> = a.intersection(&b).map(|c| c.to_string()).collect();
    let union_size = a.union(&b).count();
    let primary_match = matches!((primary_a, primary_b), (Some(x), Some(y)) if x == y);

    InterestMatch {
        score: jaccard(&a, &b),
        primary_match,
        shared,
        union_size,
    }
}

/// Compare the interests of two users
pub fn interest_match(a: &Profile, b: &Profile) -> InterestMatch {
    compare(
        a.interests.iter().map(|i| i.category.as_str()).collect(),
        b.interests.iter().map(|i| i.category.as_str()).collect(),
        a.primary_category(),
        b.primary_category(),
    )
}

/// Compare a user's interests with a tribe's declared interests
pub fn tribe_interest_match(subject: &Profile, tribe: &Tribe) -> InterestMatch {
    compare(
        subject.interests.iter().map(|i| i.category.as_str()).collect(),
        tribe.interests.iter().map(|i| i.category.as_str()).collect(),
        subject.primary_category(),
        tribe.primary_category(),
    )
}
