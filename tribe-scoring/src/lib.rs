//! Tribe Scoring
//!
//! Pure compatibility scoring, no I/O:
//! - **Personality**: trait-by-trait similarity of the Big Five
//! - **Interests**: Jaccard similarity of interest categories
//! - **Communication**: fixed style compatibility matrix
//! - **Location**: haversine distance with linear decay
//! - **Balance**: projected effect of a candidate on a tribe's trait mix
//! - **Aggregator**: weighted combination into one 0-100 score
//! - **Preferences**: pluggable weight strategies
//!
//! [`ScoringEngine`] runs all of the above for one subject/target pair.

pub mod traits;
pub mod personality;
pub mod interests;
pub mod communication;
pub mod location;
pub mod balance;
pub mod aggregator;
pub mod preferences;
pub mod engine;

pub use traits::*;
pub use personality::*;
pub use interests::*;
pub use communication::*;
pub use location::*;
pub use balance::*;
pub use aggregator::*;
pub use preferences::*;
pub use engine::*;
