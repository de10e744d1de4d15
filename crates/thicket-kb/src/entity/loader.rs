//! Loader configuration

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::data::{AttributeMap, AttributeValue, EntityId, LoaderError, Result};
use crate::entity::Entity;
use crate::storage::Sources;

/// Capability to construct a related entity by id.
///
/// Derived computations use factories to reach related entities one level
/// deep (a submission's author, a user's submissions) without the entities
/// holding each other.
pub trait EntityFactory: Send + Sync {
    fn load(&self, id: &EntityId) -> Result<Entity>;
}

impl<F> EntityFactory for F
where
    F: Fn(&EntityId) -> Result<Entity> + Send + Sync,
{
    fn load(&self, id: &EntityId) -> Result<Entity> {
        self(id)
    }
}

/// Where base attributes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseSource {
    Store,
    Dict(AttributeMap),
}

/// Configuration of the base stage of a load.
#[derive(Debug, Clone)]
pub struct BaseLoader {
    source: BaseSource,
    with_embeddings: bool,
    sync_embeddings: bool,
}

impl BaseLoader {
    /// Exactly one of `from_store` and `from_dict` must be set, and
    /// `from_dict` needs a dictionary.
    pub fn new(from_store: bool, from_dict: bool, dict: Option<AttributeMap>) -> std::result::Result<Self, LoaderError> {
        let source = match (from_store, from_dict, dict) {
            (true, true, _) => return Err(LoaderError::ConflictingSources),
            (false, false, _) => return Err(LoaderError::NoSource),
            (false, true, None) => return Err(LoaderError::MissingDict),
            (false, true, Some(dict)) => BaseSource::Dict(dict),
            (true, false, _) => BaseSource::Store,
        };
        Ok(Self {
            source,
            with_embeddings: false,
            sync_embeddings: false,
        })
    }

    pub fn from_store() -> Self {
        Self {
            source: BaseSource::Store,
            with_embeddings: false,
            sync_embeddings: false,
        }
    }

    pub fn from_dict(dict: AttributeMap) -> Self {
        Self {
            source: BaseSource::Dict(dict),
            with_embeddings: false,
            sync_embeddings: false,
        }
    }

    /// Retrieve embeddings of embedded base and generated attributes.
    pub fn with_embeddings(mut self) -> Self {
        self.with_embeddings = true;
        self
    }

    /// Push missing embeddings instead of failing. Implies `with_embeddings`.
    pub fn sync_embeddings(mut self) -> Self {
        self.with_embeddings = true;
        self.sync_embeddings = true;
        self
    }

    pub fn source(&self) -> &BaseSource {
        &self.source
    }

    pub fn embeddings_requested(&self) -> bool {
        self.with_embeddings
    }

    pub fn syncs_embeddings(&self) -> bool {
        self.sync_embeddings
    }
}

/// Named factories and plain values handed to derived computations.
#[derive(Clone, Default)]
pub struct DerivedParams {
    factories: HashMap<String, Arc<dyn EntityFactory>>,
    values: HashMap<String, AttributeValue>,
}

impl DerivedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(mut self, name: impl Into<String>, factory: Arc<dyn EntityFactory>) -> Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn factory(&self, name: &str) -> std::result::Result<&dyn EntityFactory, LoaderError> {
        self.factories
            .get(name)
            .map(|factory| factory.as_ref())
            .ok_or_else(|| LoaderError::MissingParam(name.to_string()))
    }

    pub fn value(&self, name: &str) -> std::result::Result<&AttributeValue, LoaderError> {
        self.values
            .get(name)
            .ok_or_else(|| LoaderError::MissingParam(name.to_string()))
    }
}

impl fmt::Debug for DerivedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut factories: Vec<&String> = self.factories.keys().collect();
        factories.sort();
        f.debug_struct("DerivedParams")
            .field("factories", &factories)
            .field("values", &self.values)
            .finish()
    }
}

/// Configuration of the derived stage of a load.
#[derive(Debug, Clone, Default)]
pub struct DerivedLoader {
    params: DerivedParams,
    with_embeddings: bool,
    sync_embeddings: bool,
    skip_on_error: bool,
}

impl DerivedLoader {
    pub fn new(params: DerivedParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_embeddings(mut self) -> Self {
        self.with_embeddings = true;
        self
    }

    /// Push missing embeddings instead of failing. Implies `with_embeddings`.
    pub fn sync_embeddings(mut self) -> Self {
        self.with_embeddings = true;
        self.sync_embeddings = true;
        self
    }

    /// Leave a failing derived attribute absent instead of failing the load.
    pub fn skip_on_error(mut self) -> Self {
        self.skip_on_error = true;
        self
    }

    pub fn params(&self) -> &DerivedParams {
        &self.params
    }

    pub fn embeddings_requested(&self) -> bool {
        self.with_embeddings
    }

    pub fn syncs_embeddings(&self) -> bool {
        self.sync_embeddings
    }

    pub fn skips_on_error(&self) -> bool {
        self.skip_on_error
    }
}

/// Base stage plus optional derived stage.
#[derive(Debug, Clone)]
pub struct EntityLoader {
    pub base: BaseLoader,
    pub derived: Option<DerivedLoader>,
}

impl EntityLoader {
    pub fn new(base: BaseLoader) -> Self {
        Self { base, derived: None }
    }

    pub fn with_derived(mut self, derived: DerivedLoader) -> Self {
        self.derived = Some(derived);
        self
    }

    /// Base-only load from the relational store.
    pub fn base_from_store() -> Self {
        Self::new(BaseLoader::from_store())
    }

    pub fn needs_store(&self) -> bool {
        matches!(self.base.source, BaseSource::Store) || self.derived.is_some()
    }

    pub fn needs_vector_store(&self) -> bool {
        self.base.with_embeddings
            || self
                .derived
                .as_ref()
                .map_or(false, |derived| derived.with_embeddings)
    }

    pub fn check_sources(&self, sources: &Sources) -> std::result::Result<(), LoaderError> {
        if self.needs_store() {
            sources.relational()?;
        }
        if self.needs_vector_store() {
            sources.vector()?;
        }
        Ok(())
    }
}
