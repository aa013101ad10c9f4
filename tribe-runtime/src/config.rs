//! Engine configuration
//!
//! One TOML document configures scoring, caching and the matcher:
//!
//! ```toml
//! [scoring]
//! max_distance_miles = 25.0
//!
//! [scoring.weights]
//! personality = 0.3
//! interests = 0.3
//! communication_style = 0.2
//! location = 0.1
//! group_balance = 0.1
//!
//! [matcher]
//! threshold = 70.0
//! limit = 10
//! max_concurrent = 16
//!
//! [cache]
//! ttl_secs = 86400
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use tribe_cache::CacheConfig;
use tribe_core::{DEFAULT_THRESHOLD, DEFAULT_TOP_N};
use tribe_scoring::{ActivityBiasConfig, ScoreError, ScoringConfig};

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid scoring config: {0}")]
    Scoring(#[from] ScoreError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Matcher defaults and fan-out limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum score for top-N results when the caller gives none
    pub threshold: f64,
    /// Number of top-N results when the caller gives none
    pub limit: usize,
    /// Candidates scored concurrently within one request
    pub max_concurrent: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_TOP_N,
            max_concurrent: 16,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub matcher: MatcherConfig,
    pub cache: CacheConfig,
    /// Enables the activity-based weight strategy when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_bias: Option<ActivityBiasConfig>,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check ranges and normalise the default weights
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.scoring.validate()?;

        let threshold = self.matcher.threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be within 0-100, got {}",
                threshold
            )));
        }
        if self.matcher.max_concurrent == 0 {
            return Err(ConfigError::Invalid("max_concurrent must be at least 1".into()));
        }
        if self.cache.namespace.is_empty() {
            return Err(ConfigError::Invalid("cache namespace must not be empty".into()));
        }

        Ok(self)
    }
}
