//! Core data structures for the Thicket entity store

pub mod types;
pub mod identifiers;
pub mod errors;

// Re-export all common types
pub use types::{AttributeValue, AttributeMap, SqlValue, Row};
pub use identifiers::EntityId;
pub use errors::{
    CoreError, Result, ModelError, LoaderError, StoreError, VectorStoreError,
    SubmissionForestError,
};
