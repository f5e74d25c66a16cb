//! Embeddings: provider calls routed through the process-wide cache.
//!
//! Provider failures and timeouts never fail a scoring request: the embedding is
//! reported as absent and the scorer redistributes the semantic weight.

pub mod cache;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::embedding::cache::EmbeddingCache;
use crate::embedding::provider::EmbeddingProvider;

pub struct CachedEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    timeout: Duration,
}

impl CachedEmbedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<EmbeddingCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            timeout,
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Returns the embedding for `text`, consulting the cache first.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let provider_id = self.provider.provider_id();
        let model_id = self.provider.model_id();

        if let Some(hit) = self.cache.get(provider_id, model_id, text) {
            return Some(hit);
        }

        match tokio::time::timeout(self.timeout, self.provider.embed(text)).await {
            Ok(Ok(vector)) if !is_usable(&vector) => {
                warn!(
                    "Embedding provider {provider_id} returned an unusable vector ({} dims)",
                    vector.len()
                );
                None
            }
            Ok(Ok(vector)) => {
                self.cache.set(provider_id, model_id, text, vector.clone());
                Some(vector)
            }
            Ok(Err(e)) => {
                warn!("Embedding provider {provider_id} failed: {e}");
                None
            }
            Err(_) => {
                warn!(
                    "Embedding provider {provider_id} timed out after {}s",
                    self.timeout.as_secs()
                );
                None
            }
        }
    }

    /// Embeds both documents; `None` unless both vectors were obtained with equal dimensions.
    pub async fn embed_pair(&self, left: &str, right: &str) -> Option<(Vec<f32>, Vec<f32>)> {
        let (a, b) = tokio::join!(self.embed(left), self.embed(right));
        let (a, b) = (a?, b?);
        if a.len() != b.len() {
            warn!(
                "Embedding dimensions differ ({} vs {}); scoring without semantic similarity",
                a.len(),
                b.len()
            );
            return None;
        }
        Some((a, b))
    }
}

/// Non-empty and every component finite.
fn is_usable(vector: &[f32]) -> bool {
    !vector.is_empty() && vector.iter().all(|v| v.is_finite())
}

/// Cosine similarity of two equal-length vectors; `None` on length mismatch, zero norm or a
/// non-finite result.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let cosine = dot / (norm_a * norm_b);
    cosine.is_finite().then_some(cosine)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::errors::AppError;

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl CountingProvider {
        fn new(fail: bool, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
                delay,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn provider_id(&self) -> &str {
            "fake"
        }

        fn model_id(&self) -> &str {
            "fake-1"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(AppError::Embedding("boom".to_string()));
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn embedder(provider: Arc<CountingProvider>) -> CachedEmbedder {
        CachedEmbedder::new(
            provider,
            Arc::new(EmbeddingCache::new(Duration::from_secs(60), 16)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let provider = Arc::new(CountingProvider::new(false, Duration::ZERO));
        let embedder = embedder(Arc::clone(&provider));

        let first = embedder.embed("resume text").await;
        let second = embedder.embed("resume text").await;

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_absent() {
        let provider = Arc::new(CountingProvider::new(true, Duration::ZERO));
        let embedder = embedder(provider);
        assert!(embedder.embed("x").await.is_none());
        assert!(embedder.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_absent() {
        let provider = Arc::new(CountingProvider::new(false, Duration::from_secs(60)));
        let embedder = embedder(provider);
        assert!(embedder.embed("slow").await.is_none());
    }

    #[tokio::test]
    async fn test_pair_requires_both() {
        let provider = Arc::new(CountingProvider::new(false, Duration::ZERO));
        let embedder = embedder(provider);
        let pair = embedder.embed_pair("a", "bb").await.unwrap();
        assert_eq!(pair.0, vec![1.0, 1.0]);
        assert_eq!(pair.1, vec![2.0, 1.0]);
    }

    /// Answers each text with a fixed vector.
    struct FixedProvider(Vec<(&'static str, Vec<f32>)>);

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn provider_id(&self) -> &str {
            "fixed"
        }

        fn model_id(&self) -> &str {
            "fixed-1"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
            self.0
                .iter()
                .find(|(t, _)| *t == text)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| AppError::Embedding(format!("no vector for {text}")))
        }
    }

    fn fixed_embedder(vectors: Vec<(&'static str, Vec<f32>)>) -> CachedEmbedder {
        CachedEmbedder::new(
            Arc::new(FixedProvider(vectors)),
            Arc::new(EmbeddingCache::new(Duration::from_secs(60), 16)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_non_finite_vector_is_absent_and_not_cached() {
        let embedder = fixed_embedder(vec![
            ("nan", vec![f32::NAN, 1.0]),
            ("inf", vec![1.0, f32::NEG_INFINITY]),
            ("empty", vec![]),
        ]);
        for text in ["nan", "inf", "empty"] {
            assert!(embedder.embed(text).await.is_none(), "{text}");
        }
        assert!(embedder.cache().is_empty());
    }

    #[tokio::test]
    async fn test_pair_with_different_dimensions_is_absent() {
        let embedder = fixed_embedder(vec![("resume", vec![1.0, 0.0]), ("job", vec![1.0])]);
        assert!(embedder.embed_pair("resume", "job").await.is_none());
        // Each vector is fine on its own and stays cached.
        assert_eq!(embedder.cache().len(), 2);
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_none());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_none());
        assert!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 2.0]).is_none());
    }
}
