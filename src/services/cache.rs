use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Coordinates, PoiCategory};

/// Errors that can occur with cache operations.
///
/// These never reach a caller of the resolver or the proximity engine; the
/// cache degrades to a miss instead.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A cached payload with its insertion timestamp.
///
/// Freshness is decided at read time against the caller's TTL, so an entry
/// written under an older, longer TTL still expires on schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    #[serde(rename = "cachedAt")]
    pub cached_at: DateTime<Utc>,
    pub payload: T,
}

/// Two-tier cache for resolved geodata and live POI results.
///
/// L1 (moka, in-process) is always on; L2 (Redis) is optional and shared
/// across instances. Writes are last-writer-wins: cached values are pure
/// functions of the rounded coordinate key, so concurrent writers racing on
/// a miss both store equivalent payloads.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
}

impl CacheManager {
    /// Create a cache manager with an L1 tier only
    pub fn in_memory(l1_size: u64) -> Self {
        Self {
            redis: None,
            l1_cache: moka::future::CacheBuilder::new(l1_size).build(),
        }
    }

    /// Create a cache manager with both tiers
    pub async fn with_redis(redis_url: &str, l1_size: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: moka::future::CacheBuilder::new(l1_size).build(),
        })
    }

    /// Get a value no older than `max_age` (L1 first, then L2).
    ///
    /// An entry past its TTL is treated as absent, never returned. Tier
    /// errors are logged and reported as misses.
    pub async fn get_fresh<T>(&self, key: &str, max_age: Duration) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            match serde_json::from_slice::<CacheEntry<T>>(&bytes) {
                Ok(entry) if is_fresh(&entry.cached_at, max_age) => {
                    tracing::trace!("L1 cache hit: {}", key);
                    return Some(entry.payload);
                }
                Ok(_) => {
                    tracing::trace!("L1 cache entry expired: {}", key);
                    self.l1_cache.invalidate(key).await;
                }
                Err(e) => {
                    tracing::warn!("Corrupt L1 cache entry for {}: {}", key, e);
                    self.l1_cache.invalidate(key).await;
                }
            }
        }

        let json = match self.redis_get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Redis read failed for {}: {}", key, e);
                None
            }
        }?;

        match serde_json::from_str::<CacheEntry<T>>(&json) {
            Ok(entry) if is_fresh(&entry.cached_at, max_age) => {
                tracing::trace!("L2 cache hit: {}", key);
                // Populate L1 for subsequent reads
                self.l1_cache.insert(key.to_string(), json.into_bytes()).await;
                Some(entry.payload)
            }
            Ok(_) => {
                tracing::trace!("L2 cache entry expired: {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Corrupt L2 cache entry for {}: {}", key, e);
                None
            }
        }
    }

    /// Store a value in both tiers with a fresh timestamp.
    ///
    /// `ttl` bounds the Redis entry's lifetime; failures are logged, not
    /// surfaced, since a cache write must never fail a resolve.
    pub async fn put<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize,
    {
        let entry = CacheEntry { cached_at: Utc::now(), payload: value };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry for {}: {}", key, e);
                return;
            }
        };

        self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

        if let Err(e) = self.redis_setex(key, &json, ttl).await {
            tracing::warn!("Redis write failed for {}: {}", key, e);
        }

        tracing::trace!("Cache set: {}", key);
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL").arg(key).query_async::<()>(&mut *conn).await?;
        }

        Ok(())
    }

    async fn redis_get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let Some(redis) = &self.redis else {
            return Ok(None);
        };

        let mut conn = redis.lock().await;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        Ok(value)
    }

    async fn redis_setex(&self, key: &str, json: &str, ttl: Duration) -> Result<(), CacheError> {
        let Some(redis) = &self.redis else {
            return Ok(());
        };

        let mut conn = redis.lock().await;
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }
}

#[inline]
fn is_fresh(cached_at: &DateTime<Utc>, max_age: Duration) -> bool {
    let age = Utc::now().signed_duration_since(*cached_at);
    age.num_milliseconds() >= 0 && age.to_std().map(|a| a <= max_age).unwrap_or(false)
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Key for a resolved zoning/lot payload at a rounded coordinate
    pub fn geodata(coords: &Coordinates) -> String {
        format!("geodata:{}", coords.rounded_key())
    }

    /// Key for one category's live POI list at a rounded coordinate
    pub fn pois(coords: &Coordinates, category: PoiCategory) -> String {
        format!("poi:{}:{}", coords.rounded_key(), category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_set_get() {
        let cache = CacheManager::in_memory(100);
        let ttl = Duration::from_secs(60);

        cache.put("test_key", &"test_value".to_string(), ttl).await;
        let result: Option<String> = cache.get_fresh("test_key", ttl).await;
        assert_eq!(result, Some("test_value".to_string()));

        cache.delete("test_key").await.unwrap();
        let result: Option<String> = cache.get_fresh("test_key", ttl).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = CacheManager::in_memory(100);

        cache.put("stale", &42u32, Duration::from_secs(60)).await;

        // Reading with a zero TTL must treat the entry as absent
        let result: Option<u32> = cache.get_fresh("stale", Duration::ZERO).await;
        assert_eq!(result, None);
    }

    #[test]
    fn test_cache_key_builder() {
        let coords = Coordinates::new(-37.8136, 144.9631);
        assert_eq!(CacheKey::geodata(&coords), "geodata:-37.8136,144.9631");
        assert_eq!(CacheKey::pois(&coords, PoiCategory::Transit), "poi:-37.8136,144.9631:transit");
    }
}
