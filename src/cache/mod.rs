//! Time-stamped key/value cache used for balances and LP price history.
//!
//! A stored entry is a `(value, stored_at, ttl_minutes)` triple. Expiry is decided
//! at read time by the [`Cache`] facade against its [`Clock`], so stores only need
//! to persist the triple.

use crate::clock::Clock;
use crate::domain::TimeMs;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub mod keys;
pub mod memory;
pub mod sqlite;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

/// A cached JSON value with the instant it was written and its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub stored_at: TimeMs,
    pub ttl_minutes: u32,
}

impl CacheEntry {
    pub fn new(value: serde_json::Value, stored_at: TimeMs, ttl_minutes: u32) -> Self {
        Self {
            value,
            stored_at,
            ttl_minutes,
        }
    }

    pub fn expires_at(&self) -> TimeMs {
        self.stored_at
            .saturating_add_ms(i64::from(self.ttl_minutes) * 60_000)
    }

    /// An entry is a miss from its expiry instant onwards.
    pub fn is_expired(&self, now: TimeMs) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Backing storage for cache entries.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Typed cache facade.
///
/// Storage failures are logged and reported as misses; a cache problem never
/// fails the caller.
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = match self.store.load(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!("Cache entry {} expired at {}", key, entry.expires_at().as_ms());
            if let Err(e) = self.store.remove(key).await {
                warn!("Failed to evict expired cache entry {}: {}", key, e);
            }
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_minutes: u32) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };
        let entry = CacheEntry::new(value, self.clock.now(), ttl_minutes);
        if let Err(e) = self.store.store(key, entry).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!("Cache invalidation failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (Cache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(TimeMs::new(1_000_000)));
        let cache = Cache::new(Arc::new(MemoryCacheStore::new()), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = CacheEntry::new(serde_json::json!(1), TimeMs::new(0), 5);
        assert_eq!(entry.expires_at(), TimeMs::new(300_000));
        assert!(!entry.is_expired(TimeMs::new(299_999)));
        assert!(entry.is_expired(TimeMs::new(300_000)));
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", &vec![1, 2, 3], 5).await;
        let value: Option<Vec<i32>> = cache.get("k").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_get_after_ttl_is_miss() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", &"v", 5).await;

        clock.advance_minutes(4);
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));

        clock.advance_minutes(1);
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_miss() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", &"not a number", 5).await;
        assert_eq!(cache.get::<u64>("k").await, None);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", &1u8, 5).await;
        cache.invalidate("k").await;
        assert_eq!(cache.get::<u8>("k").await, None);
    }
}
