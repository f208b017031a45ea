//! In-memory cache implementation using moka
//!
//! Provides a fast, thread-safe in-memory cache with TTL support.
//!
//! # Features
//! - TTL-based expiration for each cache entry
//! - Glob-style pattern matching for bulk deletion
//! - Thread-safe concurrent access

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default maximum cache capacity (number of entries)
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Default TTL for cache entries (1 hour)
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache entry wrapper that stores serialized JSON data
/// This allows us to store any serializable type in the cache
#[derive(Clone)]
struct CacheEntry {
    /// JSON-serialized value
    data: Arc<String>,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// In-memory cache using moka
///
/// Values are stored as JSON strings to support generic types. Expiry is the
/// cache-wide time-to-live configured at construction.
pub struct MemoryCache {
    /// The underlying moka cache instance
    cache: Cache<String, CacheEntry>,
    /// Default TTL for entries when not specified
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a new memory cache with default settings
    ///
    /// Default configuration:
    /// - Max capacity: 10,000 entries
    /// - Default TTL: 1 hour
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a new memory cache with custom max capacity
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::with_capacity_and_ttl(max_capacity, DEFAULT_TTL)
    }

    /// Create a new memory cache with custom capacity and default TTL
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(default_ttl)
            .support_invalidation_closures()
            .build();

        Self { cache, default_ttl }
    }

    /// Get the default TTL for this cache
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get the current number of entries in the cache
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Check if a pattern matches a key using glob-style matching
    ///
    /// Supports:
    /// - `*` matches any sequence of characters
    /// - `?` matches any single character
    ///
    /// # Examples
    /// - `catalog:*` matches `catalog:subjects`, `catalog:courses:all`
    /// - `course:?` matches `course:1`, `course:a`
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        let pattern_chars: Vec<char> = pattern.chars().collect();
        let key_chars: Vec<char> = key.chars().collect();
        Self::glob_match(&pattern_chars, &key_chars, 0, 0)
    }

    /// Recursive glob pattern matching
    fn glob_match(pattern: &[char], key: &[char], pi: usize, ki: usize) -> bool {
        // If we've consumed the entire pattern
        if pi == pattern.len() {
            return ki == key.len();
        }

        let p = pattern[pi];

        match p {
            '*' => {
                // Try matching zero characters first, then one or more
                if Self::glob_match(pattern, key, pi + 1, ki) {
                    return true;
                }
                if ki < key.len() && Self::glob_match(pattern, key, pi, ki + 1) {
                    return true;
                }
                false
            }
            '?' => {
                // Match exactly one character
                if ki < key.len() {
                    Self::glob_match(pattern, key, pi + 1, ki + 1)
                } else {
                    false
                }
            }
            _ => {
                // Match literal character
                if ki < key.len() && key[ki] == p {
                    Self::glob_match(pattern, key, pi + 1, ki + 1)
                } else {
                    false
                }
            }
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    /// Get a value from cache
    ///
    /// Returns `Ok(Some(value))` if the key exists and hasn't expired,
    /// `Ok(None)` if the key doesn't exist or has expired.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => {
                let value = entry.deserialize()?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a value in cache
    ///
    /// Expiry is governed by the cache-wide time_to_live configured at
    /// construction; the per-call `ttl` argument is accepted for interface
    /// compatibility with the Redis backend, which honors it exactly.
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let entry = CacheEntry::new(value)?;
        self.cache.insert(key.to_string(), entry).await;
        let _ = ttl;
        Ok(())
    }

    /// Delete a value from cache
    ///
    /// If the key doesn't exist, this is a no-op.
    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    /// Delete all values matching a glob-style pattern
    ///
    /// Requires iterating over all keys, which may be slow for large caches.
    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let keys_to_delete: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| Self::pattern_matches(pattern, key.as_ref()))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in keys_to_delete {
            self.cache.invalidate(&key).await;
        }

        Ok(())
    }

    /// Clear all cache entries
    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();

        cache
            .set("key1", &"value1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        let result: Option<String> = cache.get("missing").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_overwrite_existing_key() {
        let cache = MemoryCache::new();

        cache
            .set("key", &"old".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("key", &"new".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key").await.unwrap();
        assert_eq!(result, Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();

        cache
            .set("key", &"value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("key").await.unwrap();

        let result: Option<String> = cache.get("key").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        cache.set("catalog:subjects", &1i64, ttl).await.unwrap();
        cache.set("catalog:courses:all", &2i64, ttl).await.unwrap();
        cache.set("other:key", &3i64, ttl).await.unwrap();

        cache.delete_pattern("catalog:*").await.unwrap();

        let subjects: Option<i64> = cache.get("catalog:subjects").await.unwrap();
        let courses: Option<i64> = cache.get("catalog:courses:all").await.unwrap();
        let other: Option<i64> = cache.get("other:key").await.unwrap();

        assert_eq!(subjects, None);
        assert_eq!(courses, None);
        assert_eq!(other, Some(3));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        cache.set("a", &1i64, ttl).await.unwrap();
        cache.set("b", &2i64, ttl).await.unwrap();

        cache.clear().await.unwrap();

        let a: Option<i64> = cache.get("a").await.unwrap();
        let b: Option<i64> = cache.get("b").await.unwrap();
        assert_eq!(a, None);
        assert_eq!(b, None);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let ttl = Duration::from_millis(10);
        let cache = MemoryCache::with_capacity_and_ttl(1000, ttl);

        cache.set("key", &"value".to_string(), ttl).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.cache.run_pending_tasks().await;

        let result: Option<String> = cache.get("key").await.unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_pattern_matches_literal() {
        assert!(MemoryCache::pattern_matches("abc", "abc"));
        assert!(!MemoryCache::pattern_matches("abc", "abd"));
        assert!(!MemoryCache::pattern_matches("abc", "ab"));
    }

    #[test]
    fn test_pattern_matches_star() {
        assert!(MemoryCache::pattern_matches("catalog:*", "catalog:subjects"));
        assert!(MemoryCache::pattern_matches("catalog:*", "catalog:"));
        assert!(!MemoryCache::pattern_matches("catalog:*", "other:subjects"));
        assert!(MemoryCache::pattern_matches("*:all", "courses:all"));
    }

    #[test]
    fn test_pattern_matches_question_mark() {
        assert!(MemoryCache::pattern_matches("course:?", "course:1"));
        assert!(!MemoryCache::pattern_matches("course:?", "course:12"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(20))]

            /// Any value stored under a key comes back bit-identical before
            /// its TTL elapses.
            #[test]
            fn property_set_get_roundtrip(
                key in "[a-z]{1,10}",
                value in "[a-z]{1,100}"
            ) {
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let cache = MemoryCache::new();
                    cache.set(&key, &value, Duration::from_secs(60)).await.unwrap();
                    let result: Option<String> = cache.get(&key).await.unwrap();
                    prop_assert_eq!(result, Some(value));
                    Ok(())
                })?;
            }

            /// A literal pattern (no wildcards) matches exactly itself.
            #[test]
            fn property_literal_pattern_matches_self(key in "[a-z0-9:]{1,20}") {
                prop_assert!(MemoryCache::pattern_matches(&key, &key));
            }

            /// A `prefix*` pattern matches every key with that prefix.
            #[test]
            fn property_star_matches_any_suffix(
                prefix in "[a-z]{1,8}",
                suffix in "[a-z0-9:]{0,16}"
            ) {
                let pattern = format!("{}*", prefix);
                let key = format!("{}{}", prefix, suffix);
                prop_assert!(MemoryCache::pattern_matches(&pattern, &key));
            }
        }
    }
}
