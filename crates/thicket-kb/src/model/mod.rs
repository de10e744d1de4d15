//! Declarative entity and attribute models

pub mod attribute;
pub mod entity_model;
pub mod prompt;

pub use attribute::{
    AttributeClass, AttributeKind, AttributeModel, DeriveFn, PersistedType, ValueType,
};
pub use entity_model::EntityModel;
pub use prompt::PromptTemplate;
