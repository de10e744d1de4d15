//! Collaborator traits (interfaces) for the Thicket entity store

pub mod relational_store;
pub mod vector_store;
mod embedding_generator;
mod text_generator;

pub use relational_store::RelationalStore;
pub use vector_store::{VectorStore, StoredEmbedding};
pub use embedding_generator::EmbeddingGenerator;
pub use text_generator::{TextGenerator, Completion};
