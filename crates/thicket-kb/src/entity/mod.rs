//! Entities kept consistent across the relational store, the vector store and
//! the text generator

pub mod instance;
pub mod loader;
pub mod requirements;
pub mod sync;

pub use instance::{ClassStatus, DeriveContext, Entity, Status};
pub use loader::{BaseLoader, BaseSource, DerivedLoader, DerivedParams, EntityFactory, EntityLoader};
pub use requirements::{ClassRequirement, ExtraCheck, Requirements};
pub use sync::{EmbeddingSyncReport, StoreSyncReport};
