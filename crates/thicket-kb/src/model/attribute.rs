//! Attribute declarations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::data::{AttributeValue, Result};
use crate::entity::DeriveContext;
use crate::model::prompt::PromptTemplate;

/// In-memory type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    String,
    Int,
    Mapping,
    EntityRef,
    EntityRefList,
}

impl ValueType {
    /// Column type used when the model does not say otherwise.
    pub fn default_persisted_type(self) -> PersistedType {
        match self {
            ValueType::String | ValueType::EntityRef => PersistedType::Text,
            ValueType::Int => PersistedType::Integer,
            ValueType::Mapping | ValueType::EntityRefList => PersistedType::Json,
        }
    }

    pub fn can_persist_as(self, persisted: PersistedType) -> bool {
        match (self, persisted) {
            (ValueType::String | ValueType::EntityRef, PersistedType::Text) => true,
            (ValueType::Int, PersistedType::Integer | PersistedType::Text) => true,
            (ValueType::Mapping | ValueType::EntityRefList, PersistedType::Json) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Int => write!(f, "int"),
            ValueType::Mapping => write!(f, "mapping"),
            ValueType::EntityRef => write!(f, "entity_ref"),
            ValueType::EntityRefList => write!(f, "entity_ref_list"),
        }
    }
}

/// Column type in the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistedType {
    Integer,
    Text,
    /// JSON-encoded text.
    Json,
}

impl fmt::Display for PersistedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistedType::Integer => write!(f, "INTEGER"),
            PersistedType::Text => write!(f, "TEXT"),
            PersistedType::Json => write!(f, "JSON"),
        }
    }
}

/// The three attribute lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeClass {
    /// Sourced from the relational store or supplied data.
    Base,
    /// Computed at load time; never persisted.
    Derived,
    /// Synthesized once by the text generator, then cached in the store.
    Generated,
}

impl AttributeClass {
    pub const ALL: [AttributeClass; 3] = [
        AttributeClass::Base,
        AttributeClass::Derived,
        AttributeClass::Generated,
    ];

    pub fn is_persisted(self) -> bool {
        match self {
            AttributeClass::Base | AttributeClass::Generated => true,
            AttributeClass::Derived => false,
        }
    }
}

impl fmt::Display for AttributeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeClass::Base => write!(f, "base"),
            AttributeClass::Derived => write!(f, "derived"),
            AttributeClass::Generated => write!(f, "generated"),
        }
    }
}

/// Computation behind a derived attribute.
pub type DeriveFn = Arc<dyn Fn(&DeriveContext<'_>) -> Result<AttributeValue> + Send + Sync>;

/// Class of an attribute together with the data that class needs.
#[derive(Clone)]
pub enum AttributeKind {
    Base,
    Derived(DeriveFn),
    Generated(PromptTemplate),
}

impl AttributeKind {
    pub fn class(&self) -> AttributeClass {
        match self {
            AttributeKind::Base => AttributeClass::Base,
            AttributeKind::Derived(_) => AttributeClass::Derived,
            AttributeKind::Generated(_) => AttributeClass::Generated,
        }
    }
}

impl fmt::Debug for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Base => write!(f, "Base"),
            AttributeKind::Derived(_) => write!(f, "Derived(<fn>)"),
            AttributeKind::Generated(prompt) => f.debug_tuple("Generated").field(prompt).finish(),
        }
    }
}

/// Declarative description of one attribute of one entity kind.
#[derive(Debug, Clone)]
pub struct AttributeModel {
    pub name: String,
    pub nullable: bool,
    pub embedded: bool,
    pub value_type: ValueType,
    pub persisted_type: PersistedType,
    pub kind: AttributeKind,
}

impl AttributeModel {
    fn with_kind(name: impl Into<String>, value_type: ValueType, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            nullable: false,
            embedded: false,
            value_type,
            persisted_type: value_type.default_persisted_type(),
            kind,
        }
    }

    pub fn base(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_kind(name, value_type, AttributeKind::Base)
    }

    pub fn derived<F>(name: impl Into<String>, value_type: ValueType, compute: F) -> Self
    where
        F: Fn(&DeriveContext<'_>) -> Result<AttributeValue> + Send + Sync + 'static,
    {
        Self::with_kind(name, value_type, AttributeKind::Derived(Arc::new(compute)))
    }

    pub fn generated(name: impl Into<String>, value_type: ValueType, prompt: PromptTemplate) -> Self {
        Self::with_kind(name, value_type, AttributeKind::Generated(prompt))
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn persisted_as(mut self, persisted_type: PersistedType) -> Self {
        self.persisted_type = persisted_type;
        self
    }

    pub fn class(&self) -> AttributeClass {
        self.kind.class()
    }

    pub fn prompt(&self) -> Option<&PromptTemplate> {
        match &self.kind {
            AttributeKind::Generated(prompt) => Some(prompt),
            _ => None,
        }
    }

    pub fn accepts(&self, value: &AttributeValue) -> bool {
        if value.is_null() {
            return self.nullable;
        }
        value.matches(self.value_type)
    }
}
