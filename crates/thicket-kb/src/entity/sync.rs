//! Pushing entity state to the backends

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::data::{AttributeMap, AttributeValue, CoreError, EntityId, Result, StoreError, VectorStoreError};
use crate::entity::Entity;
use crate::model::{AttributeClass, AttributeModel, ValueType};
use crate::traits::TextGenerator;

/// Outcome of [`Entity::sync_to_store`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSyncReport {
    /// A new row was written.
    pub inserted: bool,
    /// Columns overwritten in an existing row.
    pub updated: Vec<String>,
}

impl StoreSyncReport {
    pub fn wrote(&self) -> bool {
        self.inserted || !self.updated.is_empty()
    }
}

/// Outcome of an embedding push, by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddingSyncReport {
    pub generated: Vec<String>,
    pub regenerated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl EmbeddingSyncReport {
    pub fn merge(&mut self, other: EmbeddingSyncReport) {
        self.generated.extend(other.generated);
        self.regenerated.extend(other.regenerated);
        self.unchanged.extend(other.unchanged);
    }

    pub fn wrote(&self) -> bool {
        !self.generated.is_empty() || !self.regenerated.is_empty()
    }
}

impl Entity {
    /// Writes base and generated values that differ from the stored row.
    ///
    /// Inserts the full row when there is none; otherwise updates only the
    /// changed columns, and writes nothing when nothing changed. Absent values
    /// are never compared; on insert they are written as `Null`. A loaded
    /// `Null` on a non-nullable attribute is refused before any write.
    pub fn sync_to_store(&self) -> Result<StoreSyncReport> {
        let store = self.sources.relational()?;
        let table = self.model.table_name();

        for attribute in self.model.persisted_attributes() {
            if let Some(value) = self.value(&attribute.name) {
                self.check_type(attribute, value, true)?;
            }
        }

        match store.select_by_id(&self.model, &self.id)? {
            None => {
                let row: AttributeMap = self
                    .model
                    .persisted_attributes()
                    .map(|attribute| {
                        let value = self.value(&attribute.name).cloned().unwrap_or(AttributeValue::Null);
                        (attribute.name.clone(), value)
                    })
                    .collect();
                store.insert(&self.model, &row)?;
                info!(table = table, id = %self.id, "inserted entity row");
                Ok(StoreSyncReport {
                    inserted: true,
                    updated: Vec::new(),
                })
            }
            Some(stored) => {
                let changed: AttributeMap = self
                    .model
                    .persisted_attributes()
                    .filter_map(|attribute| {
                        let current = self.value(&attribute.name)?;
                        if stored.get(&attribute.name) == Some(current) {
                            None
                        } else {
                            Some((attribute.name.clone(), current.clone()))
                        }
                    })
                    .collect();

                if changed.is_empty() {
                    debug!(table = table, id = %self.id, "entity row up to date");
                    return Ok(StoreSyncReport::default());
                }

                store.update_by_id(&self.model, &self.id, &changed)?;
                let updated: Vec<String> = changed.into_keys().collect();
                info!(table = table, id = %self.id, columns = ?updated, "updated entity row");
                Ok(StoreSyncReport {
                    inserted: false,
                    updated,
                })
            }
        }
    }

    /// Brings the embeddings of every embedded attribute in line with the
    /// current values.
    pub fn sync_to_vector_store(&mut self) -> Result<EmbeddingSyncReport> {
        let mut report = EmbeddingSyncReport::default();
        for class in AttributeClass::ALL {
            report.merge(self.sync_class_to_vector_store(class)?);
        }
        Ok(report)
    }

    /// Embedding push for one attribute class.
    ///
    /// Missing embeddings are generated, embeddings whose stored document
    /// differs from the current one are regenerated, and the resulting vectors
    /// are cached on the entity.
    pub fn sync_class_to_vector_store(&mut self, class: AttributeClass) -> Result<EmbeddingSyncReport> {
        let model = Arc::clone(&self.model);
        let vector = self.sources.vector()?.clone();
        let mut report = EmbeddingSyncReport::default();

        for attribute in model.attributes_of_class(class).iter().filter(|a| a.embedded) {
            let Some(value) = self.value(&attribute.name).cloned() else {
                continue;
            };
            let Some(document) = vector.document_for(&model, attribute, &self.id, &value)? else {
                debug!(table = model.table_name(), id = %self.id, attribute = %attribute.name, "null value, no embedding");
                continue;
            };

            let stored = match vector.retrieve(&model, attribute, &self.id) {
                Ok(stored) if stored.document == document => {
                    report.unchanged.push(attribute.name.clone());
                    stored
                }
                Ok(_) => {
                    vector.update(&model, attribute, &self.id, document)?;
                    report.regenerated.push(attribute.name.clone());
                    vector.retrieve(&model, attribute, &self.id)?
                }
                Err(VectorStoreError::EmbeddingsNotFound { .. }) => {
                    vector.generate(&model, attribute, &self.id, document)?;
                    report.generated.push(attribute.name.clone());
                    vector.retrieve(&model, attribute, &self.id)?
                }
                Err(error) => return Err(error.into()),
            };
            self.embeddings.insert(attribute.name.clone(), Some(stored.vector));
        }

        if report.wrote() {
            info!(
                table = model.table_name(),
                id = %self.id,
                class = %class,
                generated = report.generated.len(),
                regenerated = report.regenerated.len(),
                "synced embeddings"
            );
        }
        if self.status.of(class).values {
            self.status.of_mut(class).embeddings = true;
        }
        Ok(report)
    }

    /// Synthesizes every generated attribute that has no value yet.
    ///
    /// Attributes already holding a value are left alone. The new values are
    /// only in memory until [`sync_to_store`](Self::sync_to_store).
    pub fn generate_attributes(&mut self, generator: &dyn TextGenerator) -> Result<Vec<String>> {
        let model = Arc::clone(&self.model);
        let mut generated = Vec::new();

        for attribute in model.attributes_of_class(AttributeClass::Generated) {
            if self.value(&attribute.name).map_or(false, |v| !v.is_null()) {
                continue;
            }
            let Some(prompt) = attribute.prompt() else {
                continue;
            };

            let prompt = prompt.render(self)?;
            let completion = generator.complete(&prompt)?;
            let value = parse_completion(attribute, &completion.text)?;
            debug!(
                table = model.table_name(),
                id = %self.id,
                attribute = %attribute.name,
                prompt_tokens = completion.prompt_tokens,
                completion_tokens = completion.completion_tokens,
                "generated attribute"
            );
            self.set(&attribute.name, value)?;
            generated.push(attribute.name.clone());
        }

        self.status.generated.values = self.all_generated_present();
        Ok(generated)
    }

    /// Removes the entity's row and all its embeddings. Missing data is
    /// logged and skipped.
    pub fn delete(&self) -> Result<()> {
        let table = self.model.table_name();
        let ids = std::slice::from_ref(&self.id);

        match self.sources.relational()?.delete_by_ids(&self.model, ids) {
            Ok(0) | Err(StoreError::NotFound { .. }) => {
                warn!(table = table, id = %self.id, "no row to delete")
            }
            Ok(_) => info!(table = table, id = %self.id, "deleted entity row"),
            Err(error) => return Err(error.into()),
        }

        let embedded: Vec<&AttributeModel> = self.model.all_embedded_attributes().collect();
        if embedded.is_empty() {
            return Ok(());
        }
        let vector = self.sources.vector()?;
        for attribute in embedded {
            match vector.delete(&self.model, attribute, ids) {
                Ok(0) | Err(VectorStoreError::EmbeddingsNotFound { .. }) => {
                    debug!(table = table, id = %self.id, attribute = %attribute.name, "no embedding to delete")
                }
                Ok(_) => {}
                Err(error) => return Err(error.into()),
            }
        }
        Ok(())
    }
}

/// Interprets completion text as a value of the attribute's type.
fn parse_completion(attribute: &AttributeModel, text: &str) -> Result<AttributeValue> {
    let invalid = |message: String| {
        CoreError::Generation(format!("completion for '{}' is not a valid {}: {}", attribute.name, attribute.value_type, message))
    };
    let text = text.trim();

    let value = match attribute.value_type {
        ValueType::String => AttributeValue::String(text.to_string()),
        ValueType::Int => AttributeValue::Int(text.parse().map_err(|e| invalid(format!("{}", e)))?),
        ValueType::EntityRef => AttributeValue::EntityRef(EntityId::new(text)),
        ValueType::Mapping => {
            AttributeValue::Mapping(serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?)
        }
        ValueType::EntityRefList => {
            AttributeValue::EntityRefList(serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?)
        }
    };
    Ok(value)
}
