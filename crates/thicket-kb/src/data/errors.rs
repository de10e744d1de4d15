//! Error types for the Thicket entity store

use thiserror::Error;

use crate::data::identifiers::EntityId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Base error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error(transparent)]
    SubmissionForest(#[from] SubmissionForestError),

    #[error("Unknown attribute '{attribute}' on {table}")]
    UnknownAttribute { table: String, attribute: String },

    #[error("Type mismatch for {table}.{attribute}: expected {expected}, got {actual}")]
    TypeMismatch {
        table: String,
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to derive {table}.{attribute} for {id}")]
    DerivedLoad {
        table: String,
        attribute: String,
        id: EntityId,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Text generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization/Deserialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Helper to create an unknown attribute error
    pub fn unknown_attribute(table: impl Into<String>, attribute: impl Into<String>) -> Self {
        CoreError::UnknownAttribute {
            table: table.into(),
            attribute: attribute.into(),
        }
    }

    /// Helper to wrap a failed derived computation
    pub fn derived_load(
        table: impl Into<String>,
        attribute: impl Into<String>,
        id: EntityId,
        source: CoreError,
    ) -> Self {
        CoreError::DerivedLoad {
            table: table.into(),
            attribute: attribute.into(),
            id,
            source: Box::new(source),
        }
    }

    /// True for the "row or embedding does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::Store(StoreError::NotFound { .. })
                | CoreError::VectorStore(VectorStoreError::EmbeddingsNotFound { .. })
        )
    }
}

/// Invalid entity or attribute model declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Id attribute '{id_attribute}' is not a base attribute of {table}")]
    MissingIdAttribute { table: String, id_attribute: String },
    #[error("Attribute '{attribute}' is declared more than once on {table}")]
    DuplicateAttribute { table: String, attribute: String },
    #[error("Attribute '{attribute}' on {table} is declared in the {declared} group but is a {actual} attribute")]
    MisplacedAttribute {
        table: String,
        attribute: String,
        declared: String,
        actual: String,
    },
    #[error("Attribute '{attribute}' on {table} cannot persist {value_type} as {persisted_type}")]
    IncompatiblePersistedType {
        table: String,
        attribute: String,
        value_type: String,
        persisted_type: String,
    },
}

/// Loader misconfiguration or unusable loader input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Base loader cannot read from both the store and a dictionary")]
    ConflictingSources,
    #[error("Base loader has no source")]
    NoSource,
    #[error("Dictionary loading requested but no dictionary was supplied")]
    MissingDict,
    #[error("Dictionary for {table} {id} is missing required attribute '{attribute}'")]
    MissingKey {
        table: String,
        id: EntityId,
        attribute: String,
    },
    #[error("Dictionary id {found} does not match requested id {expected}")]
    IdMismatch { expected: EntityId, found: EntityId },
    #[error("Loader requires a {0} handle but none was supplied")]
    MissingSource(&'static str),
    #[error("Derived parameter '{0}' was not supplied")]
    MissingParam(String),
}

/// Relational store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No row in {table} for id {id}")]
    NotFound { table: String, id: EntityId },
    #[error("{count} rows in {table} for id {id}")]
    AmbiguousResult {
        table: String,
        id: EntityId,
        count: usize,
    },
    #[error("Cannot map {table}.{column}: {message}")]
    Mapping {
        table: String,
        column: String,
        message: String,
    },
    #[error("Relational store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn mapping(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Mapping {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }
}

/// Vector store errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorStoreError {
    #[error("No embedding for {table}.{attribute} of {id}")]
    EmbeddingsNotFound {
        table: String,
        attribute: String,
        id: EntityId,
    },
    #[error("Refusing to embed an empty document for {table}.{attribute} of {id}")]
    EmptyDocument {
        table: String,
        attribute: String,
        id: EntityId,
    },
    #[error("Document for {attribute} of {id} has {tokens} tokens, limit is {limit}")]
    TokenLimit {
        attribute: String,
        id: EntityId,
        tokens: usize,
        limit: usize,
    },
    #[error("Embedding for {table}.{attribute} of {id} already exists")]
    AlreadyExists {
        table: String,
        attribute: String,
        id: EntityId,
    },
    #[error("Vector store error: {0}")]
    Backend(String),
}

/// Structural problems in a submission forest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionForestError {
    #[error("Identifier {id} appears in {roots} roots")]
    Ambiguous { id: EntityId, roots: usize },
    #[error("Identifier {0} is not in the forest")]
    UnknownNode(EntityId),
    #[error("Identifier {0} is already in the forest")]
    DuplicateId(EntityId),
}
