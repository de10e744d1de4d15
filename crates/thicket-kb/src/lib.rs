//! Thicket entity store
//!
//! Keeps forum entities consistent across a relational store, a vector store
//! and a text generator, and models discussion threads as identifier forests
//! whose nodes resolve to entities on demand.

// Core modules
pub mod data;
pub mod model;
pub mod traits;
pub mod storage;
pub mod entity;
pub mod tree;

// Supporting services
pub mod config;
pub mod embedding;
pub mod generation;

// Testing utilities
pub mod test_utils;

// Re-export key types for convenient usage
pub use data::errors::{
    CoreError, LoaderError, ModelError, Result, StoreError, SubmissionForestError, VectorStoreError,
};
pub use data::identifiers::EntityId;
pub use data::types::{AttributeMap, AttributeValue, Row, SqlValue};

pub use model::{AttributeClass, AttributeModel, EntityModel, PersistedType, PromptTemplate, ValueType};

pub use entity::{
    BaseLoader, ClassRequirement, DeriveContext, DerivedLoader, DerivedParams, EmbeddingSyncReport, Entity,
    EntityFactory, EntityLoader, Requirements, StoreSyncReport,
};

pub use tree::{Branch, Resolver, SerializedNode, SubmissionForest, SubmissionTreeNode};

// Re-export collaborator traits
pub use traits::{Completion, EmbeddingGenerator, RelationalStore, StoredEmbedding, TextGenerator, VectorStore};

pub use storage::{MemoryRelationalStore, MemoryVectorStore, Sources};

pub use config::{EmbeddingConfig, GenerationConfig, ThicketConfig};
pub use embedding::HashEmbeddingGenerator;
pub use generation::{GenerationUsage, MeteredGenerator, TokenRates};

/// Initialize tracing for the entity store.
///
/// `RUST_LOG` wins over the configured filter. Calling this again once a
/// subscriber is installed does nothing.
pub fn init_tracing(config: &ThicketConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
