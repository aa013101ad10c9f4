//! Compatibility matcher
//!
//! Resolves profiles through the [`ProfileStore`](crate::ProfileStore), consults the
//! [`CompatibilityCache`] and runs the [`ScoringEngine`] on a miss:
//! - `score` for one subject/target pair
//! - `score_batch` for a list of targets, in request order
//! - `find_top_matches` for the best candidates of a pool
//!
//! The matcher holds no per-request state. Candidates of one request are
//! scored concurrently up to `max_concurrent`.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use tribe_cache::{fingerprint, CacheStats, CompatibilityCache, SharedCacheClient};
use tribe_core::{
    BatchOutcome, CandidateFailure, CompatibilityResult, FactorWeights, Profile, RankedMatch,
    TargetType, TopMatches, Tribe, WeightError, WeightOverrides,
};
use tribe_scoring::{
    ActivityBias, Evaluation, NoAdjustment, ScoringEngine, SharedStrategy, Target,
};

use crate::{ConfigError, EngineConfig, MatcherConfig, SharedStore, StoreError};

/// Errors returned by the matcher
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Deadline exceeded after {completed} of {total} candidates")]
    DeadlineExceeded { completed: usize, total: usize },
}

impl From<WeightError> for MatchError {
    fn from(e: WeightError) -> Self {
        MatchError::InvalidInput(e.to_string())
    }
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct MatchRequest {
    /// Partial weight overrides merged over the configured defaults
    pub weights: Option<WeightOverrides>,
    /// Attach per-factor details to results
    pub include_details: bool,
    /// Stop scoring further candidates once passed
    pub deadline: Option<Instant>,
    /// Top-N size; the configured default when unset
    pub limit: Option<usize>,
    /// Top-N minimum score (0-100); the configured default when unset
    pub threshold: Option<f64>,
}

impl MatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: WeightOverrides) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_details(mut self, include_details: bool) -> Self {
        self.include_details = include_details;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Matcher counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherStats {
    /// Results computed by the scoring engine rather than read from cache
    pub computed: u64,
    pub strategy: String,
    pub cache: CacheStats,
}

/// Outcome for one candidate of a batch or top-N request
enum Candidate {
    Cached(CompatibilityResult),
    Scored(Evaluation),
    Unresolved(String),
    Cancelled,
}

/// Cached, concurrent compatibility matcher
pub struct Matcher {
    store: SharedStore,
    cache: Arc<CompatibilityCache>,
    engine: ScoringEngine,
    strategy: SharedStrategy,
    config: MatcherConfig,
    computed: AtomicU64,
}

impl Matcher {
    /// Create a matcher from already validated parts
    pub fn new(
        store: SharedStore,
        cache: Arc<CompatibilityCache>,
        engine: ScoringEngine,
        config: MatcherConfig,
    ) -> Self {
        Self {
            store,
            cache,
            engine,
            strategy: Arc::new(NoAdjustment),
            config,
            computed: AtomicU64::new(0),
        }
    }

    /// Validate `config` and build a matcher over `store` and `cache_client`
    pub fn from_config(
        config: EngineConfig,
        store: SharedStore,
        cache_client: SharedCacheClient,
    ) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let cache = Arc::new(CompatibilityCache::new(cache_client, config.cache));
        let mut matcher = Self::new(
            store,
            cache,
            ScoringEngine::new(config.scoring),
            config.matcher,
        );
        if let Some(bias) = config.activity_bias {
            matcher = matcher.with_strategy(Arc::new(ActivityBias::new(bias)));
        }
        Ok(matcher)
    }

    pub fn with_strategy(mut self, strategy: SharedStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn cache(&self) -> &CompatibilityCache {
        &self.cache
    }

    /// Score `subject_id` against one target
    pub async fn score(
        &self,
        subject_id: &str,
        target_type: TargetType,
        target_id: &str,
        request: &MatchRequest,
    ) -> Result<CompatibilityResult, MatchError> {
        let weights = self.request_weights(request)?;
        let fingerprint = fingerprint(&weights, request.include_details, &[]);

        if let Some(cached) = self
            .cache
            .get(subject_id, target_type, target_id, &fingerprint)
            .await
        {
            debug!("Cache hit for {} -> {} {}", subject_id, target_type, target_id);
            return Ok(cached);
        }
        if request.expired() {
            return Err(MatchError::DeadlineExceeded { completed: 0, total: 1 });
        }

        let subject = self.resolve_subject(subject_id).await?;
        let weights = self.strategy.adjust(&subject, weights);
        let evaluation = self
            .evaluate_target(&subject, target_type, target_id, &weights, request.include_details)
            .await?;
        self.computed.fetch_add(1, Ordering::Relaxed);

        // Results with failed factors stay out of the cache so batch and
        // top-N requests still see the failure
        if evaluation.is_clean() {
            self.cache.put(&evaluation.result, &fingerprint).await;
        } else {
            warn!(
                "Scored {} -> {} {} with failed factors: {}",
                subject_id,
                target_type,
                target_id,
                evaluation.error_summary()
            );
        }

        Ok(evaluation.result)
    }

    /// Score `subject_id` against every target, keeping request order
    ///
    /// Unresolvable targets get a zero result and a failure record. Targets
    /// whose scoring failed are left out of `results` and recorded as
    /// failures.
    pub async fn score_batch(
        &self,
        subject_id: &str,
        target_type: TargetType,
        target_ids: &[String],
        request: &MatchRequest,
    ) -> Result<BatchOutcome, MatchError> {
        let weights = self.request_weights(request)?;
        let fingerprint = fingerprint(&weights, request.include_details, &[]);

        if let Some(cached) = self
            .cache
            .get_batch(subject_id, target_type, target_ids, &fingerprint)
            .await
        {
            if let Some(ordered) = reorder(cached, target_ids) {
                debug!("Batch cache hit for {} ({} targets)", subject_id, target_ids.len());
                return Ok(ordered);
            }
        }

        let subject = self.resolve_subject(subject_id).await?;
        let candidates = self
            .score_candidates(&subject, target_type, target_ids, weights, &fingerprint, request)
            .await?;

        let mut outcome = BatchOutcome::default();
        for (target_id, candidate) in candidates {
            match candidate {
                Candidate::Cached(result) => outcome.results.push(result),
                Candidate::Scored(evaluation) if evaluation.is_clean() => {
                    outcome.results.push(evaluation.result)
                }
                Candidate::Scored(evaluation) => {
                    let reason = evaluation.error_summary();
                    warn!("Excluding {} from batch of {}: {}", target_id, subject_id, reason);
                    outcome.failures.push(CandidateFailure { target_id, reason });
                }
                Candidate::Unresolved(reason) => {
                    outcome
                        .results
                        .push(CompatibilityResult::unscored(subject_id, &target_id, target_type));
                    outcome.failures.push(CandidateFailure { target_id, reason });
                }
                Candidate::Cancelled => {}
            }
        }

        if outcome.failures.is_empty() {
            self.cache
                .put_batch(subject_id, target_type, target_ids, &fingerprint, &outcome)
                .await;
        }

        info!(
            "Batch for {}: {} results, {} failures",
            subject_id,
            outcome.results.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }

    /// Best candidates of `pool` at or above the threshold
    ///
    /// Sorted by descending score, ties by ascending target id, truncated
    /// to the limit. The pool is taken as given.
    pub async fn find_top_matches(
        &self,
        subject_id: &str,
        target_type: TargetType,
        pool: &[String],
        request: &MatchRequest,
    ) -> Result<TopMatches, MatchError> {
        let threshold = request.threshold.unwrap_or(self.config.threshold);
        if !(0.0..=100.0).contains(&threshold) {
            return Err(MatchError::InvalidInput(format!(
                "threshold must be within 0-100, got {}",
                threshold
            )));
        }
        let limit = request.limit.unwrap_or(self.config.limit);

        let weights = self.request_weights(request)?;
        let single_fingerprint = fingerprint(&weights, request.include_details, &[]);
        let top_fingerprint = fingerprint(
            &weights,
            request.include_details,
            &[("threshold", threshold.to_string()), ("limit", limit.to_string())],
        );

        if let Some(cached) = self
            .cache
            .get_top(subject_id, target_type, pool, &top_fingerprint)
            .await
        {
            debug!("Top-N cache hit for {} ({} candidates)", subject_id, pool.len());
            return Ok(cached);
        }

        let subject = self.resolve_subject(subject_id).await?;
        let candidates = self
            .score_candidates(&subject, target_type, pool, weights, &single_fingerprint, request)
            .await?;

        let mut top = TopMatches::default();
        for (target_id, candidate) in candidates {
            let result = match candidate {
                Candidate::Cached(result) => result,
                Candidate::Scored(evaluation) if evaluation.is_clean() => evaluation.result,
                Candidate::Scored(evaluation) => {
                    let reason = evaluation.error_summary();
                    warn!("Excluding {} from top matches of {}: {}", target_id, subject_id, reason);
                    top.failures.push(CandidateFailure { target_id, reason });
                    continue;
                }
                Candidate::Unresolved(reason) => {
                    debug!("Skipping {}: {}", target_id, reason);
                    top.failures.push(CandidateFailure { target_id, reason });
                    continue;
                }
                Candidate::Cancelled => continue,
            };

            if result.overall_score >= threshold {
                top.matches.push(RankedMatch {
                    target_id: result.target_id,
                    score: result.overall_score,
                    details: request.include_details.then_some(result.details),
                });
            }
        }

        top.matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
        top.matches.truncate(limit);

        if top.failures.is_empty() {
            self.cache
                .put_top(subject_id, target_type, pool, &top_fingerprint, &top)
                .await;
        }

        info!(
            "Top matches for {}: {} of {} candidates at or above {}",
            subject_id,
            top.matches.len(),
            pool.len(),
            threshold
        );
        Ok(top)
    }

    /// Drop every cached result of `subject_id`
    pub async fn invalidate(&self, subject_id: &str) -> usize {
        self.cache.invalidate(subject_id).await
    }

    pub async fn stats(&self) -> MatcherStats {
        MatcherStats {
            computed: self.computed.load(Ordering::Relaxed),
            strategy: self.strategy.name().to_string(),
            cache: self.cache.stats().await,
        }
    }

    fn request_weights(&self, request: &MatchRequest) -> Result<FactorWeights, MatchError> {
        let defaults = &self.engine.config().weights;
        match &request.weights {
            Some(overrides) => Ok(FactorWeights::merge(defaults, overrides)?),
            None => Ok(defaults.normalized()?),
        }
    }

    async fn resolve_subject(&self, subject_id: &str) -> Result<Profile, MatchError> {
        self.store
            .profile(subject_id)
            .await?
            .ok_or_else(|| MatchError::NotFound {
                kind: TargetType::User.as_str(),
                id: subject_id.to_string(),
            })
    }

    async fn score_candidates(
        &self,
        subject: &Profile,
        target_type: TargetType,
        target_ids: &[String],
        weights: FactorWeights,
        fingerprint: &str,
        request: &MatchRequest,
    ) -> Result<Vec<(String, Candidate)>, MatchError> {
        let weights = &self.strategy.adjust(subject, weights);

        let candidates: Vec<(String, Candidate)> = stream::iter(target_ids)
            .map(|target_id| async move {
                let candidate = self
                    .candidate(subject, target_type, target_id, weights, fingerprint, request)
                    .await;
                (target_id.clone(), candidate)
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let cancelled = candidates
            .iter()
            .filter(|(_, c)| matches!(c, Candidate::Cancelled))
            .count();
        if cancelled > 0 {
            warn!(
                "Deadline passed for {} with {} of {} candidates left",
                subject.id,
                cancelled,
                target_ids.len()
            );
            return Err(MatchError::DeadlineExceeded {
                completed: target_ids.len() - cancelled,
                total: target_ids.len(),
            });
        }

        Ok(candidates)
    }

    async fn candidate(
        &self,
        subject: &Profile,
        target_type: TargetType,
        target_id: &str,
        weights: &FactorWeights,
        fingerprint: &str,
        request: &MatchRequest,
    ) -> Candidate {
        if request.expired() {
            return Candidate::Cancelled;
        }
        if let Some(cached) = self
            .cache
            .get(&subject.id, target_type, target_id, fingerprint)
            .await
        {
            return Candidate::Cached(cached);
        }

        match self
            .evaluate_target(subject, target_type, target_id, weights, request.include_details)
            .await
        {
            Ok(evaluation) => {
                self.computed.fetch_add(1, Ordering::Relaxed);
                if evaluation.is_clean() {
                    self.cache.put(&evaluation.result, fingerprint).await;
                }
                Candidate::Scored(evaluation)
            }
            Err(e) => Candidate::Unresolved(e.to_string()),
        }
    }

    async fn evaluate_target(
        &self,
        subject: &Profile,
        target_type: TargetType,
        target_id: &str,
        weights: &FactorWeights,
        include_details: bool,
    ) -> Result<Evaluation, MatchError> {
        let not_found = || MatchError::NotFound {
            kind: target_type.as_str(),
            id: target_id.to_string(),
        };

        match target_type {
            TargetType::User => {
                let other = self.store.profile(target_id).await?.ok_or_else(not_found)?;
                Ok(self
                    .engine
                    .evaluate(subject, Target::User(&other), weights, include_details))
            }
            TargetType::Tribe => {
                let tribe = self.store.tribe(target_id).await?.ok_or_else(not_found)?;
                let members = self.resolve_members(&tribe).await;
                Ok(self.engine.evaluate(
                    subject,
                    Target::Tribe {
                        tribe: &tribe,
                        members: &members,
                    },
                    weights,
                    include_details,
                ))
            }
        }
    }

    async fn resolve_members(&self, tribe: &Tribe) -> Vec<Profile> {
        let lookups = tribe
            .members
            .iter()
            .map(|id| async move { (id, self.store.profile(id).await) });

        let mut members = Vec::with_capacity(tribe.members.len());
        for (id, lookup) in join_all(lookups).await {
            match lookup {
                Ok(Some(profile)) => members.push(profile),
                Ok(None) => debug!("Skipping unknown member {} of tribe {}", id, tribe.id),
                Err(e) => warn!("Failed to load member {} of tribe {}: {}", id, tribe.id, e),
            }
        }
        members
    }
}

/// Arrange a cached batch in the order of `target_ids`
///
/// The batch key ignores order, so a hit may come from a request that
/// listed the same targets differently. `None` when the entry does not
/// line up with the request.
fn reorder(mut cached: BatchOutcome, target_ids: &[String]) -> Option<BatchOutcome> {
    if cached.results.len() != target_ids.len() {
        return None;
    }

    let mut results = Vec::with_capacity(target_ids.len());
    for target_id in target_ids {
        let position = cached.results.iter().position(|r| &r.target_id == target_id)?;
        results.push(cached.results.swap_remove(position));
    }
    cached.results = results;
    Some(cached)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(target_id: &str) -> CompatibilityResult {
        CompatibilityResult::unscored("u1", target_id, TargetType::User)
    }

    #[test]
    fn test_reorder_cached_batch() {
        let cached = BatchOutcome {
            results: vec![result("b"), result("a"), result("c")],
            failures: Vec::new(),
        };
        let ids = vec!["a".to_string(), "c".to_string(), "b".to_string()];

        let ordered = reorder(cached, &ids).unwrap();
        let order: Vec<&str> = ordered.results.iter().map(|r| r.target_id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_reorder_duplicates() {
        let cached = BatchOutcome {
            results: vec![result("a"), result("b"), result("a")],
            failures: Vec::new(),
        };
        let ids = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        assert!(reorder(cached, &ids).is_some());
    }

    #[test]
    fn test_reorder_mismatch() {
        let cached = BatchOutcome {
            results: vec![result("a")],
            failures: Vec::new(),
        };
        assert!(reorder(cached.clone(), &["b".to_string()]).is_none());
        assert!(reorder(cached, &["a".to_string(), "b".to_string()]).is_none());
    }

    #[test]
    fn test_request_builder() {
        let request = MatchRequest::new().with_details(true).with_limit(3).with_threshold(50.0);
        assert!(request.include_details);
        assert_eq!(request.limit, Some(3));
        assert!(!request.expired());

        let past = MatchRequest::new().with_deadline(Instant::now());
        assert!(past.expired());
    }
}
