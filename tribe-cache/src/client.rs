//! Cache clients
//!
//! The engine talks to its cache through [`CacheClient`] so a shared store
//! (Redis, memcached, ...) can replace the in-process [`MemoryCache`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key/value store with per-entry TTL and prefix deletion.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch a live value
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Insert or overwrite a value
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove every entry whose key starts with `prefix`; returns how many
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;

    /// Number of live entries
    async fn len(&self) -> Result<usize, CacheError>;
}

/// Thread-safe reference to a cache client
pub type SharedCacheClient = Arc<dyn CacheClient>;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache backed by `DashMap`
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared client
    pub fn shared() -> SharedCacheClient {
        Arc::new(Self::new())
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Utc::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn len(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), DAY).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(cache.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), Duration::ZERO).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.len().await.unwrap(), 0);
        assert_eq!(cache.entries.len(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.set("old", "1".to_string(), Duration::ZERO).await.unwrap();
        cache.set("new", "2".to_string(), DAY).await.unwrap();

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let cache = MemoryCache::new();
        cache.set("compat:u1:user:u2", "x".to_string(), DAY).await.unwrap();
        cache.set("compat:u1:tribe:t1", "y".to_string(), DAY).await.unwrap();
        cache.set("compat:u10:user:u2", "z".to_string(), DAY).await.unwrap();

        assert_eq!(cache.delete_prefix("compat:u1:").await.unwrap(), 2);
        assert!(cache.get("compat:u10:user:u2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), Duration::MAX).await.unwrap();
        assert!(cache.get("a").await.unwrap().is_some());
    }
}
