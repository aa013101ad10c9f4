//! Typed compatibility cache
//!
//! Wraps a [`CacheClient`] with serialisation, a per-operation timeout and
//! hit/miss accounting. The cache is advisory: timeouts, client failures
//! and undecodable entries are logged and reported as misses, never as
//! errors.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use tribe_core::{
    BatchOutcome, CompatibilityResult, TargetType, TopMatches, DEFAULT_CACHE_TTL_SECS,
};

use crate::{pool_key, subject_prefix, target_key, CacheError, SharedCacheClient};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every lookup misses and nothing is written
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Upper bound on a single cache call in milliseconds
    pub timeout_ms: u64,
    /// Key namespace
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            timeout_ms: 250,
            namespace: "compat".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
    /// Live entries, if the client could report them
    pub entries: Option<usize>,
    pub ttl_secs: u64,
}

/// Compatibility result cache
pub struct CompatibilityCache {
    client: SharedCacheClient,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

impl CompatibilityCache {
    pub fn new(client: SharedCacheClient, config: CacheConfig) -> Self {
        if config.enabled {
            debug!("Compatibility cache enabled with TTL {}s", config.ttl_secs);
        } else {
            debug!("Compatibility cache disabled");
        }

        Self {
            client,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Run a client call under the configured timeout
    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.config.timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.config.timeout_ms)),
        }
    }

    fn record_error(&self, operation: &str, key: &str, error: &CacheError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!("Cache {} failed for {}: {}", operation, key, error);
    }

    /// Fetch and decode an entry; every failure is a miss
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.config.enabled {
            return None;
        }

        let raw = match self.bounded(self.client.get(key)).await {
            Ok(raw) => raw,
            Err(e) => {
                self.record_error("get", key, &e);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let Some(raw) = raw else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache miss: {}", key);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                self.record_error("decode", key, &CacheError::from(e));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Encode and write an entry; failures are logged and swallowed
    pub async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if !self.config.enabled {
            return;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                self.record_error("encode", key, &CacheError::from(e));
                return;
            }
        };

        match self.bounded(self.client.set(key, raw, self.config.ttl())).await {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.record_error("set", key, &e),
        }
    }

    /// Cached result for a single target
    pub async fn get(
        &self,
        subject_id: &str,
        target_type: TargetType,
        target_id: &str,
        fingerprint: &str,
    ) -> Option<CompatibilityResult> {
        let key = target_key(&self.config.namespace, subject_id, target_type, target_id, fingerprint);
        self.load(&key).await
    }

    /// Cache the result for a single target
    pub async fn put(&self, result: &CompatibilityResult, fingerprint: &str) {
        let key = target_key(
            &self.config.namespace,
            &result.subject_id,
            result.target_type,
            &result.target_id,
            fingerprint,
        );
        self.store(&key, result).await;
    }

    pub async fn get_batch(
        &self,
        subject_id: &str,
        target_type: TargetType,
        target_ids: &[String],
        fingerprint: &str,
    ) -> Option<BatchOutcome> {
        let key = pool_key(&self.config.namespace, subject_id, target_type, "batch", target_ids, fingerprint);
        self.load(&key).await
    }

    pub async fn put_batch(
        &self,
        subject_id: &str,
        target_type: TargetType,
        target_ids: &[String],
        fingerprint: &str,
        outcome: &BatchOutcome,
    ) {
        let key = pool_key(&self.config.namespace, subject_id, target_type, "batch", target_ids, fingerprint);
        self.store(&key, outcome).await;
    }

    pub async fn get_top(
        &self,
        subject_id: &str,
        target_type: TargetType,
        pool: &[String],
        fingerprint: &str,
    ) -> Option<TopMatches> {
        let key = pool_key(&self.config.namespace, subject_id, target_type, "top", pool, fingerprint);
        self.load(&key).await
    }

    pub async fn put_top(
        &self,
        subject_id: &str,
        target_type: TargetType,
        pool: &[String],
        fingerprint: &str,
        matches: &TopMatches,
    ) {
        let key = pool_key(&self.config.namespace, subject_id, target_type, "top", pool, fingerprint);
        self.store(&key, matches).await;
    }

    /// Drop every entry of `subject_id`, e.g. after a profile edit
    pub async fn invalidate(&self, subject_id: &str) -> usize {
        let prefix = subject_prefix(&self.config.namespace, subject_id);
        match self.bounded(self.client.delete_prefix(&prefix)).await {
            Ok(removed) => {
                debug!("Invalidated {} cache entries for {}", removed, subject_id);
                removed
            }
            Err(e) => {
                self.record_error("invalidate", &prefix, &e);
                0
            }
        }
    }

    /// Drop every entry in the namespace
    pub async fn clear(&self) -> usize {
        let prefix = format!("{}:", self.config.namespace);
        match self.bounded(self.client.delete_prefix(&prefix)).await {
            Ok(removed) => {
                debug!("Compatibility cache cleared ({} entries)", removed);
                removed
            }
            Err(e) => {
                self.record_error("clear", &prefix, &e);
                0
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = match self.bounded(self.client.len()).await {
            Ok(n) => Some(n),
            Err(e) => {
                self.record_error("len", &self.config.namespace, &e);
                None
            }
        };

        CacheStats {
            enabled: self.config.enabled,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            entries,
            ttl_secs: self.config.ttl_secs,
        }
    }
}
