// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter between the external embedding provider and the indexes.
//!
//! Guarantees the contract the store relies on: one output vector per input
//! text, in order, always. Empty or whitespace-only inputs never reach the
//! provider; a per-item provider failure becomes a zero vector and is logged,
//! never aborting the batch. Output vectors are L2-normalized in place so
//! inner product equals cosine similarity; zero vectors stay zero.

use tracing::warn;

use crate::embedding::provider::EmbeddingProvider;

/// Dimension used when no provider call ever succeeds.
pub const FALLBACK_DIMENSION: usize = 768;

/// Wraps a provider with zero-vector fallback and normalization.
pub struct EmbeddingAdapter {
    provider: Box<dyn EmbeddingProvider>,
    /// Detected from the first successful provider response.
    dimension: Option<usize>,
    fallback_dim: usize,
}

impl EmbeddingAdapter {
    /// Creates an adapter over the given provider.
    pub fn new(provider: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            dimension: None,
            fallback_dim: FALLBACK_DIMENSION,
        }
    }

    /// Overrides the dimension used when every provider call fails.
    pub fn with_fallback_dimension(mut self, dim: usize) -> Self {
        self.fallback_dim = dim;
        self
    }

    /// Model identifier of the wrapped provider.
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Vector dimension, once known.
    pub fn dimension(&self) -> usize {
        self.dimension.unwrap_or(self.fallback_dim)
    }

    /// Embeds a batch of texts: one normalized vector per input, same order.
    pub fn encode(&mut self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut raw: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());

        for text in texts {
            if text.trim().is_empty() {
                raw.push(None);
                continue;
            }
            match self.provider.embed_one(text) {
                Ok(vector) if !vector.is_empty() => {
                    if self.dimension.is_none() {
                        self.dimension = Some(vector.len());
                    }
                    raw.push(Some(vector));
                }
                Ok(_) => {
                    warn!(model = self.provider.model_id(), "provider returned an empty vector, substituting zeros");
                    raw.push(None);
                }
                Err(err) => {
                    warn!(model = self.provider.model_id(), error = %err, "embedding failed, substituting zero vector");
                    raw.push(None);
                }
            }
        }

        let dim = self.dimension();
        raw.into_iter()
            .map(|item| {
                let mut vector = item.unwrap_or_else(|| vec![0.0; dim]);
                if vector.len() != dim {
                    vector.resize(dim, 0.0);
                }
                l2_normalize(&mut vector);
                vector
            })
            .collect()
    }

    /// Embeds a single text (used for queries).
    pub fn encode_one(&mut self, text: &str) -> Vec<f32> {
        let mut result = self.encode(std::slice::from_ref(&text.to_string()));
        result.pop().unwrap_or_else(|| vec![0.0; self.dimension()])
    }
}

/// Normalizes to unit length; a zero vector is left untouched.
fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use crate::embedding::provider::DummyProvider;

    /// Provider that fails on texts containing "bad" and otherwise returns
    /// a fixed non-unit vector.
    struct FlakyProvider;

    impl EmbeddingProvider for FlakyProvider {
        fn model_id(&self) -> &str {
            "flaky"
        }

        fn embed_one(&mut self, text: &str) -> Result<Vec<f32>> {
            if text.contains("bad") {
                bail!("provider refused item");
            }
            Ok(vec![3.0, 4.0])
        }
    }

    /// Provider that always fails.
    struct BrokenProvider;

    impl EmbeddingProvider for BrokenProvider {
        fn model_id(&self) -> &str {
            "broken"
        }

        fn embed_one(&mut self, _text: &str) -> Result<Vec<f32>> {
            bail!("provider down")
        }
    }

    #[test]
    fn test_one_vector_per_input_in_order() {
        let mut adapter = EmbeddingAdapter::new(Box::new(FlakyProvider));
        let texts = vec![
            "good one".to_string(),
            "a bad one".to_string(),
            "good two".to_string(),
        ];
        let vectors = adapter.encode(&texts);
        assert_eq!(vectors.len(), 3);
        assert!(vectors[0].iter().any(|&v| v != 0.0));
        assert!(vectors[1].iter().all(|&v| v == 0.0));
        assert!(vectors[2].iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let mut adapter = EmbeddingAdapter::new(Box::new(FlakyProvider));
        let vectors = adapter.encode(&["hello".to_string()]);
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        // 3-4-5 triangle normalizes to 0.6 / 0.8.
        assert!((vectors[0][0] - 0.6).abs() < 1e-5);
        assert!((vectors[0][1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_whitespace_input_skips_provider() {
        // BrokenProvider would fail if called; whitespace must short-circuit.
        let mut adapter = EmbeddingAdapter::new(Box::new(BrokenProvider)).with_fallback_dimension(4);
        let vectors = adapter.encode(&["   \t ".to_string(), String::new()]);
        assert_eq!(vectors.len(), 2);
        for vector in &vectors {
            assert_eq!(vector.len(), 4);
            assert!(vector.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_all_failures_use_fallback_dimension() {
        let mut adapter = EmbeddingAdapter::new(Box::new(BrokenProvider));
        let vectors = adapter.encode(&["anything".to_string()]);
        assert_eq!(vectors[0].len(), FALLBACK_DIMENSION);
        assert!(vectors[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dimension_detected_from_first_success() {
        let mut adapter = EmbeddingAdapter::new(Box::new(FlakyProvider));
        adapter.encode(&["good".to_string()]);
        assert_eq!(adapter.dimension(), 2);

        // Later failures are sized to the detected dimension, not the fallback.
        let vectors = adapter.encode(&["bad".to_string()]);
        assert_eq!(vectors[0].len(), 2);
    }

    #[test]
    fn test_zero_vectors_survive_normalization() {
        let mut adapter = EmbeddingAdapter::new(Box::new(DummyProvider::new(8)));
        let vectors = adapter.encode(&["text".to_string()]);
        assert_eq!(vectors[0].len(), 8);
        assert!(vectors[0].iter().all(|&v| v == 0.0 && !v.is_nan()));
    }

    #[test]
    fn test_encode_one() {
        let mut adapter = EmbeddingAdapter::new(Box::new(FlakyProvider));
        let vector = adapter.encode_one("query text");
        assert_eq!(vector.len(), 2);
    }
}
