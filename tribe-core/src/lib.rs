//! Tribe Core - Domain model for compatibility scoring
//!
//! This crate provides the foundational primitives:
//! - User profiles (personality traits, interests, communication style, location)
//! - Tribes and their membership
//! - Compatibility factors and normalised factor weights
//! - Compatibility results and ranked matches

pub mod profile;
pub mod tribe;
pub mod factors;
pub mod result;

pub use profile::*;
pub use tribe::*;
pub use factors::*;
pub use result::*;

/// Default minimum score (0-100) for a candidate to be returned by a top-N search
pub const DEFAULT_THRESHOLD: f64 = 70.0;

/// Default radius beyond which the location factor scores zero
pub const DEFAULT_MAX_DISTANCE_MILES: f64 = 25.0;

/// Default number of matches returned by a top-N search
pub const DEFAULT_TOP_N: usize = 10;

/// Default lifetime of a cached compatibility result (24h)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Share of each trait in a perfectly balanced group
pub const IDEAL_TRAIT_SHARE: f64 = 0.2;

/// Mean Earth radius used by the haversine distance
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres to statute miles
pub const KM_TO_MILES: f64 = 0.621371;
