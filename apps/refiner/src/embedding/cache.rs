//! Embedding cache: bounded TTL + LRU map from (provider, model, text) to a vector.
//!
//! - Keys are `provider:model:sha256(text)`; raw text is never stored.
//! - TTL is lazy: expiry is checked on read and the expired entry is evicted by that read.
//! - Every successful read or write moves the entry to the most-recently-used position.
//! - Inserting past `max_size` evicts the least-recently-used entry.
//!
//! The cache never fails. Lock poisoning, absence and malformed vectors all read as a miss.
//! Entry age is measured on the tokio clock, so a paused test clock controls expiry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use linked_hash_map::LinkedHashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{debug, warn};

struct CacheEntry {
    inserted_at: Instant,
    vector: Vec<f32>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }

    /// Empty or non-finite vectors are never served.
    fn is_well_formed(&self) -> bool {
        !self.vector.is_empty() && self.vector.iter().all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

pub struct EmbeddingCache {
    /// Front = least recently used.
    entries: Mutex<LinkedHashMap<String, CacheEntry>>,
    ttl: Duration,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Builds the cache key. Identical text from different callers collapses to one entry.
pub fn cache_key(provider: &str, model: &str, text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{provider}:{model}:{}", hex::encode(digest))
}

impl EmbeddingCache {
    /// `max_size` of zero is bumped to one so a freshly written entry is always readable.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: Mutex::new(LinkedHashMap::new()),
            ttl,
            max_size: max_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the cached vector, or `None` on miss, expiry, or a malformed entry.
    pub fn get(&self, provider: &str, model: &str, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(provider, model, text);

        // Write lock for the whole check-refresh-evict sequence so no reader
        // observes a half-evicted entry.
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => {
                warn!("Embedding cache lock poisoned; treating read as a miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let usable = match entries.get_refresh(&key) {
            Some(entry) => !entry.is_expired(self.ttl) && entry.is_well_formed(),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if !usable {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted stale embedding cache entry {key}");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(&key).map(|entry| entry.vector.clone())
    }

    /// Stores a vector, refreshing its recency and evicting LRU entries past `max_size`.
    pub fn set(&self, provider: &str, model: &str, text: &str, vector: Vec<f32>) {
        let key = cache_key(provider, model, text);

        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => {
                warn!("Embedding cache lock poisoned; dropping write");
                return;
            }
        };

        // Re-inserting an existing key must move it to the back.
        entries.remove(&key);
        entries.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                vector,
            },
        );

        while entries.len() > self.max_size {
            if let Some((evicted, _)) = entries.pop_front() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("Evicted LRU embedding cache entry {evicted}");
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_set_then_get_returns_identical_vector() {
        let cache = EmbeddingCache::new(HOUR, 10);
        cache.set("openai", "small", "hello", vec![0.1, 0.2, 0.3]);
        assert_eq!(cache.get("openai", "small", "hello"), Some(vec![0.1, 0.2, 0.3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_ttl_is_absent_and_evicts() {
        let cache = EmbeddingCache::new(Duration::from_secs(10), 10);
        cache.set("openai", "small", "hello", vec![1.0]);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get("openai", "small", "hello"), Some(vec![1.0]));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("openai", "small", "hello"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_lru_eviction_scenario() {
        let cache = EmbeddingCache::new(HOUR, 2);
        cache.set("p", "m", "A", vec![1.0]);
        cache.set("p", "m", "B", vec![2.0]);
        cache.set("p", "m", "C", vec![3.0]);

        assert_eq!(cache.get("p", "m", "A"), None);
        assert_eq!(cache.get("p", "m", "B"), Some(vec![2.0]));
        assert_eq!(cache.get("p", "m", "C"), Some(vec![3.0]));
    }

    #[test]
    fn test_read_refreshes_recency() {
        let cache = EmbeddingCache::new(HOUR, 2);
        cache.set("p", "m", "A", vec![1.0]);
        cache.set("p", "m", "B", vec![2.0]);
        // Touch A so B becomes least recently used.
        assert!(cache.get("p", "m", "A").is_some());
        cache.set("p", "m", "C", vec![3.0]);

        assert!(cache.get("p", "m", "A").is_some());
        assert!(cache.get("p", "m", "B").is_none());
    }

    #[test]
    fn test_size_never_exceeds_max() {
        let cache = EmbeddingCache::new(HOUR, 5);
        for i in 0..50 {
            cache.set("p", "m", &format!("text-{i}"), vec![i as f32 + 1.0]);
            assert!(cache.len() <= 5);
        }
        assert_eq!(cache.stats().evictions, 45);
    }

    #[test]
    fn test_key_separates_provider_and_model() {
        let cache = EmbeddingCache::new(HOUR, 10);
        cache.set("openai", "small", "same text", vec![1.0]);
        assert!(cache.get("openai", "large", "same text").is_none());
        assert!(cache.get("voyage", "small", "same text").is_none());
        assert!(cache.get("openai", "small", "same text").is_some());
    }

    #[test]
    fn test_key_does_not_contain_raw_text() {
        let key = cache_key("openai", "small", "secret resume text");
        assert!(!key.contains("secret"));
        assert!(key.starts_with("openai:small:"));
        // 32-byte digest, hex encoded
        assert_eq!(key.len(), "openai:small:".len() + 64);
    }

    #[test]
    fn test_malformed_vector_is_a_miss() {
        let cache = EmbeddingCache::new(HOUR, 10);
        cache.set("p", "m", "nan", vec![f32::NAN, 1.0]);
        cache.set("p", "m", "empty", vec![]);
        assert!(cache.get("p", "m", "nan").is_none());
        assert!(cache.get("p", "m", "empty").is_none());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = EmbeddingCache::new(HOUR, 10);
        assert!(cache.get("p", "m", "x").is_none());
        cache.set("p", "m", "x", vec![1.0]);
        assert!(cache.get("p", "m", "x").is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_concurrent_access_respects_capacity() {
        let cache = Arc::new(EmbeddingCache::new(HOUR, 8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let text = format!("{t}-{i}");
                        cache.set("p", "m", &text, vec![1.0, i as f32]);
                        let _ = cache.get("p", "m", &text);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 8);
    }
}
