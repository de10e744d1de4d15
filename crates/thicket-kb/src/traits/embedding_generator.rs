//! EmbeddingGenerator trait definition for vector embeddings

use crate::data::VectorStoreError;

/// Represents the interface for generating vector embeddings from text.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generates an embedding vector for the given text.
    ///
    /// Contract: Uses the configured embedding model to convert input text into a dense vector representation.
    fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, VectorStoreError>;

    /// Token budget of the embedding model, if it has one.
    fn max_tokens(&self) -> Option<usize> {
        None
    }

    /// Token count of `text` as the embedding model sees it.
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
