//! Storage adapters and in-memory backends

pub mod memory;
pub mod relational;
pub mod vector;

use std::sync::Arc;

pub use memory::{MemoryRelationalStore, MemoryVectorStore, RelationalStoreStats, VectorStoreStats};
pub use relational::RelationalAdapter;
pub use vector::{VectorAdapter, EMPTY_DOCUMENT_SENTINEL};

use crate::data::LoaderError;
use crate::traits::{RelationalStore, VectorStore};

/// Backend handles available to an entity while it loads and syncs.
///
/// Either handle may be missing; loaders check what they need up front.
#[derive(Clone, Default)]
pub struct Sources {
    pub relational: Option<RelationalAdapter>,
    pub vector: Option<VectorAdapter>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relational(mut self, store: Arc<dyn RelationalStore>) -> Self {
        self.relational = Some(RelationalAdapter::new(store));
        self
    }

    pub fn with_vector(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector = Some(VectorAdapter::new(store));
        self
    }

    pub fn relational(&self) -> Result<&RelationalAdapter, LoaderError> {
        self.relational
            .as_ref()
            .ok_or(LoaderError::MissingSource("relational store"))
    }

    pub fn vector(&self) -> Result<&VectorAdapter, LoaderError> {
        self.vector
            .as_ref()
            .ok_or(LoaderError::MissingSource("vector store"))
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("relational", &self.relational.is_some())
            .field("vector", &self.vector.is_some())
            .finish()
    }
}
