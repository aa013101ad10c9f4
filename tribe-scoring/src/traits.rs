//! Common error type and the weight strategy seam

use std::sync::Arc;
use thiserror::Error;

use tribe_core::{FactorWeights, Profile, WeightError};

/// Errors from a single factor scorer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("Invalid coordinates: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Invalid max distance: {0}")]
    InvalidMaxDistance(f64),

    #[error("Invalid trait weights: {0}")]
    InvalidTraitWeights(String),

    #[error("Invalid factor weights: {0}")]
    InvalidWeights(#[from] WeightError),
}

/// Adjusts the normalised factor weights for a particular subject.
///
/// Implementations must return normalised weights.
pub trait WeightStrategy: Send + Sync {
    /// Strategy name, used in logs
    fn name(&self) -> &str;

    fn adjust(&self, subject: &Profile, weights: FactorWeights) -> FactorWeights;
}

/// Thread-safe reference to a weight strategy
pub type SharedStrategy = Arc<dyn WeightStrategy>;
