//! Entity instances and the load protocol

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::data::{
    AttributeMap, AttributeValue, CoreError, EntityId, LoaderError, Result, VectorStoreError,
};
use crate::entity::loader::{BaseSource, DerivedParams, EntityFactory, EntityLoader};
use crate::entity::requirements::Requirements;
use crate::model::{AttributeClass, AttributeKind, AttributeModel, EntityModel};
use crate::storage::Sources;

/// Load state of one attribute class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassStatus {
    pub values: bool,
    pub embeddings: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub base: ClassStatus,
    pub derived: ClassStatus,
    pub generated: ClassStatus,
}

impl Status {
    pub fn of(&self, class: AttributeClass) -> &ClassStatus {
        match class {
            AttributeClass::Base => &self.base,
            AttributeClass::Derived => &self.derived,
            AttributeClass::Generated => &self.generated,
        }
    }

    pub(crate) fn of_mut(&mut self, class: AttributeClass) -> &mut ClassStatus {
        match class {
            AttributeClass::Base => &mut self.base,
            AttributeClass::Derived => &mut self.derived,
            AttributeClass::Generated => &mut self.generated,
        }
    }
}

/// Everything a derived computation may look at.
pub struct DeriveContext<'a> {
    pub entity: &'a Entity,
    pub params: &'a DerivedParams,
    pub sources: &'a Sources,
}

impl<'a> DeriveContext<'a> {
    pub fn id(&self) -> &EntityId {
        self.entity.id()
    }

    /// A loaded value of the entity being derived. Absent values are an error.
    pub fn value(&self, attribute: &str) -> Result<&'a AttributeValue> {
        self.entity.get(attribute)?.ok_or_else(|| {
            CoreError::Loader(LoaderError::MissingParam(format!(
                "{} (not loaded on {} {})",
                attribute,
                self.entity.model().table_name(),
                self.entity.id()
            )))
        })
    }

    pub fn factory(&self, name: &str) -> Result<&'a dyn EntityFactory> {
        Ok(self.params.factory(name)?)
    }

    pub fn param(&self, name: &str) -> Result<&'a AttributeValue> {
        Ok(self.params.value(name)?)
    }
}

/// One forum entity: the values of its attributes, the cached embeddings of
/// its embedded attributes and the handles it syncs through.
///
/// Values are populated once by [`Entity::load`] and afterwards change only
/// through [`Entity::set`]; nothing is re-fetched behind the caller's back.
#[derive(Clone)]
pub struct Entity {
    pub(crate) model: Arc<EntityModel>,
    pub(crate) id: EntityId,
    pub(crate) values: BTreeMap<String, Option<AttributeValue>>,
    pub(crate) embeddings: BTreeMap<String, Option<Vec<f32>>>,
    pub(crate) status: Status,
    pub(crate) sources: Sources,
}

impl Entity {
    /// Every declared attribute absent, every embedding slot empty.
    pub fn empty(model: Arc<EntityModel>, id: impl Into<EntityId>, sources: Sources) -> Self {
        let values = model
            .all_attributes()
            .map(|attribute| (attribute.name.clone(), None))
            .collect();
        let embeddings = model
            .all_embedded_attributes()
            .map(|attribute| (attribute.name.clone(), None))
            .collect();
        Self {
            model,
            id: id.into(),
            values,
            embeddings,
            status: Status::default(),
            sources,
        }
    }

    /// Builds an entity and populates it according to `loader`.
    pub fn load(
        model: Arc<EntityModel>,
        id: impl Into<EntityId>,
        loader: &EntityLoader,
        sources: &Sources,
    ) -> Result<Self> {
        let mut entity = Self::empty(model, id, sources.clone());
        loader.check_sources(sources)?;

        match loader.base.source() {
            BaseSource::Store => entity.load_base_from_store()?,
            BaseSource::Dict(dict) => entity.load_base_from_dict(dict)?,
        }

        if let Some(derived) = &loader.derived {
            entity.load_derived(derived.params(), derived.skips_on_error())?;
        }

        if loader.base.embeddings_requested() {
            let sync = loader.base.syncs_embeddings();
            entity.load_class_embeddings(AttributeClass::Base, sync)?;
            if entity.status.generated.values {
                entity.load_class_embeddings(AttributeClass::Generated, sync)?;
            }
        }
        if let Some(derived) = loader.derived.as_ref().filter(|d| d.embeddings_requested()) {
            entity.load_class_embeddings(AttributeClass::Derived, derived.syncs_embeddings())?;
        }

        debug!(table = entity.model.table_name(), id = %entity.id, status = ?entity.status, "loaded entity");
        Ok(entity)
    }

    fn load_base_from_store(&mut self) -> Result<()> {
        let row = self.sources.relational()?.get_by_id(&self.model, &self.id)?;
        for (name, value) in row {
            self.values.insert(name, Some(value));
        }
        self.status.base.values = true;
        self.status.generated.values = self.all_generated_present();
        Ok(())
    }

    fn load_base_from_dict(&mut self, dict: &AttributeMap) -> Result<()> {
        let model = Arc::clone(&self.model);
        let table = model.table_name();

        if let Some(found) = dict.get(model.id_attribute()) {
            if found.document_text().as_deref() != Some(self.id.as_str()) {
                return Err(LoaderError::IdMismatch {
                    expected: self.id.clone(),
                    found: EntityId(found.document_text().unwrap_or_default()),
                }
                .into());
            }
        }

        for attribute in model.attributes_of_class(AttributeClass::Base) {
            let value = match dict.get(&attribute.name) {
                Some(value) => value.clone(),
                None if attribute.nullable => AttributeValue::Null,
                None => {
                    return Err(LoaderError::MissingKey {
                        table: table.to_string(),
                        id: self.id.clone(),
                        attribute: attribute.name.clone(),
                    }
                    .into())
                }
            };
            self.check_type(attribute, &value, true)?;
            self.values.insert(attribute.name.clone(), Some(value));
        }

        for attribute in model.attributes_of_class(AttributeClass::Generated) {
            if let Some(value) = dict.get(&attribute.name) {
                self.check_type(attribute, value, false)?;
                self.values.insert(attribute.name.clone(), Some(value.clone()));
            }
        }

        for key in dict.keys().filter(|key| !model.contains(key)) {
            trace!(table = table, id = %self.id, %key, "ignoring undeclared dictionary key");
        }

        self.status.base.values = true;
        self.status.generated.values = self.all_generated_present();
        Ok(())
    }

    fn load_derived(&mut self, params: &DerivedParams, skip_on_error: bool) -> Result<()> {
        let model = Arc::clone(&self.model);
        let sources = self.sources.clone();

        for attribute in model.attributes_of_class(AttributeClass::Derived) {
            let AttributeKind::Derived(compute) = &attribute.kind else {
                continue;
            };
            let context = DeriveContext {
                entity: self,
                params,
                sources: &sources,
            };
            let computed = compute(&context).and_then(|value| {
                self.check_type(attribute, &value, false)?;
                Ok(value)
            });

            match computed {
                Ok(value) => {
                    self.values.insert(attribute.name.clone(), Some(value));
                }
                Err(error) if skip_on_error => {
                    warn!(
                        table = model.table_name(),
                        id = %self.id,
                        attribute = %attribute.name,
                        error = %error,
                        "skipping derived attribute"
                    );
                }
                Err(error) => {
                    return Err(CoreError::derived_load(
                        model.table_name(),
                        attribute.name.as_str(),
                        self.id.clone(),
                        error,
                    ))
                }
            }
        }

        self.status.derived.values = true;
        Ok(())
    }

    /// Retrieves the stored vector of every embedded attribute of `class`
    /// holding a value. A missing vector fails the load unless `sync`, in which
    /// case it is generated first.
    fn load_class_embeddings(&mut self, class: AttributeClass, sync: bool) -> Result<()> {
        let model = Arc::clone(&self.model);
        let vector = self.sources.vector()?.clone();

        for attribute in model.attributes_of_class(class).iter().filter(|a| a.embedded) {
            let value = match self.values.get(&attribute.name) {
                Some(Some(value)) => value.clone(),
                _ => continue,
            };
            if value.is_null() && attribute.nullable {
                continue;
            }

            let stored = match vector.retrieve(&model, attribute, &self.id) {
                Ok(stored) => stored,
                Err(VectorStoreError::EmbeddingsNotFound { .. }) if sync => {
                    let Some(document) = vector.document_for(&model, attribute, &self.id, &value)? else {
                        continue;
                    };
                    vector.generate(&model, attribute, &self.id, document)?;
                    vector.retrieve(&model, attribute, &self.id)?
                }
                Err(error) => return Err(error.into()),
            };
            self.embeddings.insert(attribute.name.clone(), Some(stored.vector));
        }

        self.status.of_mut(class).embeddings = true;
        Ok(())
    }

    pub(crate) fn all_generated_present(&self) -> bool {
        self.model
            .attributes_of_class(AttributeClass::Generated)
            .iter()
            .all(|attribute| self.value(&attribute.name).map_or(false, |v| !v.is_null()))
    }

    pub(crate) fn check_type(&self, attribute: &AttributeModel, value: &AttributeValue, enforce_nullability: bool) -> Result<()> {
        let accepted = if enforce_nullability {
            attribute.accepts(value)
        } else {
            value.matches(attribute.value_type)
        };
        if accepted {
            return Ok(());
        }
        Err(CoreError::TypeMismatch {
            table: self.model.table_name().to_string(),
            attribute: attribute.name.clone(),
            expected: attribute.value_type.to_string(),
            actual: value.type_name().to_string(),
        })
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// The value of `attribute`; `None` if it was never loaded.
    pub fn get(&self, attribute: &str) -> Result<Option<&AttributeValue>> {
        self.values
            .get(attribute)
            .map(Option::as_ref)
            .ok_or_else(|| CoreError::unknown_attribute(self.model.table_name(), attribute))
    }

    /// Like [`get`](Self::get) but an unknown attribute is just `None`.
    pub fn value(&self, attribute: &str) -> Option<&AttributeValue> {
        self.values.get(attribute).and_then(Option::as_ref)
    }

    /// Replaces a value in memory. Nothing is persisted until a sync.
    ///
    /// `Null` is accepted even on non-nullable attributes; such a value is
    /// refused later by [`sync_to_store`](Self::sync_to_store) and reported as
    /// `EmptyDocument` by the embedding push.
    pub fn set(&mut self, attribute: &str, value: impl Into<AttributeValue>) -> Result<()> {
        let value = value.into();
        let model = Arc::clone(&self.model);
        let declared = model
            .attribute_by_name(attribute)
            .ok_or_else(|| CoreError::unknown_attribute(model.table_name(), attribute))?;
        self.check_type(declared, &value, false)?;

        let previous = self.values.insert(attribute.to_string(), Some(value));
        if declared.embedded && previous.flatten().as_ref() != self.value(attribute) {
            self.embeddings.insert(attribute.to_string(), None);
        }
        Ok(())
    }

    /// The cached vector of an embedded attribute, if one was loaded or synced.
    pub fn embedding(&self, attribute: &str) -> Result<Option<&[f32]>> {
        if !self.model.contains(attribute) {
            return Err(CoreError::unknown_attribute(self.model.table_name(), attribute));
        }
        Ok(self.cached_embedding(attribute))
    }

    pub(crate) fn cached_embedding(&self, attribute: &str) -> Option<&[f32]> {
        self.embeddings
            .get(attribute)
            .and_then(Option::as_ref)
            .map(Vec::as_slice)
    }

    /// Present values of every attribute, absent ones left out.
    pub fn to_attribute_map(&self) -> AttributeMap {
        self.values
            .iter()
            .filter_map(|(name, value)| value.clone().map(|value| (name.clone(), value)))
            .collect()
    }

    /// Whether the entity satisfies `requirements`. The first unmet
    /// requirement is logged.
    pub fn check(&self, requirements: &Requirements) -> bool {
        match requirements.evaluate(self) {
            Ok(()) => true,
            Err(reason) => {
                debug!(table = self.model.table_name(), id = %self.id, %reason, "entity check failed");
                false
            }
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("table", &self.model.table_name())
            .field("id", &self.id)
            .field("values", &self.values)
            .field("status", &self.status)
            .finish()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.model.table_name() == other.model.table_name()
            && self.id == other.id
            && self.values == other.values
    }
}
