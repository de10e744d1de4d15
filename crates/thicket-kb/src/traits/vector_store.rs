//! VectorStore trait definition for attribute embeddings

use serde::{Deserialize, Serialize};

use crate::data::{EntityId, VectorStoreError};

/// An embedding together with the document it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub vector: Vec<f32>,
    pub document: String,
}

/// Represents the interface for the vector store.
///
/// Embeddings are namespaced by table and attribute (one collection per
/// embedded attribute) and keyed by entity id within it. The store computes
/// vectors itself from the documents it is handed.
pub trait VectorStore: Send + Sync {
    /// Contract: fails with `EmbeddingsNotFound` when nothing is stored for the
    /// key. Callers use that error as the signal to generate.
    fn retrieve(
        &self,
        table: &str,
        attribute: &str,
        id: &EntityId,
    ) -> Result<StoredEmbedding, VectorStoreError>;

    /// Embeds and stores new documents. `ids` and `documents` are parallel.
    ///
    /// Contract: fails with `EmptyDocument` on an empty document or an empty
    /// batch (the latter with an empty id), and with `TokenLimit` when a
    /// document exceeds the embedding model's budget.
    fn generate(
        &self,
        table: &str,
        attribute: &str,
        ids: &[EntityId],
        documents: &[String],
    ) -> Result<(), VectorStoreError>;

    /// Re-embeds and overwrites existing documents.
    fn update(
        &self,
        table: &str,
        attribute: &str,
        ids: &[EntityId],
        documents: &[String],
    ) -> Result<(), VectorStoreError>;

    /// Removes embeddings. Returns how many were removed.
    fn delete(&self, table: &str, attribute: &str, ids: &[EntityId]) -> Result<usize, VectorStoreError>;
}
