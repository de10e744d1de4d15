//! Embedding generators shipped with the crate

use crate::config::EmbeddingConfig;
use crate::data::VectorStoreError;
use crate::traits::EmbeddingGenerator;

/// Deterministic embedding generator hashing tokens into a fixed number of
/// buckets. Stands in for a real embedding model wherever reproducible vectors
/// matter more than semantic quality (tests, offline dataset dry-runs).
#[derive(Debug, Clone)]
pub struct HashEmbeddingGenerator {
    dimension: usize,
    max_tokens: Option<usize>,
}

impl HashEmbeddingGenerator {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let generator = Self::new(config.dimension);
        match config.max_tokens {
            Some(limit) => generator.with_max_tokens(limit),
            None => generator,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, token: &str) -> usize {
        // FNV-1a
        let hash = token.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });
        (hash % self.dimension as u64) as usize
    }
}

impl Default for HashEmbeddingGenerator {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingGenerator for HashEmbeddingGenerator {
    fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, VectorStoreError> {
        let mut embedding = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            embedding[self.bucket(&token.to_lowercase())] += 1.0;
        }

        let magnitude: f32 = embedding.iter().map(|&v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }
        Ok(embedding)
    }

    fn max_tokens(&self) -> Option<usize> {
        self.max_tokens
    }
}
