//! Model-driven embedding marshalling over a `VectorStore`

use std::slice;
use std::sync::Arc;
use tracing::debug;

use crate::data::{AttributeValue, EntityId, VectorStoreError};
use crate::model::{AttributeModel, EntityModel};
use crate::traits::{StoredEmbedding, VectorStore};

/// Document embedded in place of a genuinely empty string, so that empty text
/// can be embedded without colliding with "no embedding".
pub const EMPTY_DOCUMENT_SENTINEL: &str = "<|empty|>";

/// Addresses embeddings by `(table, attribute, id)` and owns the rules for
/// turning attribute values into documents.
#[derive(Clone)]
pub struct VectorAdapter {
    store: Arc<dyn VectorStore>,
}

impl VectorAdapter {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// The document to embed for `value`.
    ///
    /// `Ok(None)` means the attribute has nothing to embed (a null value on a
    /// nullable attribute). A null value on a non-nullable attribute is refused
    /// with `EmptyDocument`.
    pub fn document_for(
        &self,
        model: &EntityModel,
        attribute: &AttributeModel,
        id: &EntityId,
        value: &AttributeValue,
    ) -> Result<Option<String>, VectorStoreError> {
        match value.document_text() {
            None if attribute.nullable => Ok(None),
            None => Err(VectorStoreError::EmptyDocument {
                table: model.table_name().to_string(),
                attribute: attribute.name.clone(),
                id: id.clone(),
            }),
            Some(text) if text.trim().is_empty() => Ok(Some(EMPTY_DOCUMENT_SENTINEL.to_string())),
            Some(text) => Ok(Some(text)),
        }
    }

    pub fn retrieve(
        &self,
        model: &EntityModel,
        attribute: &AttributeModel,
        id: &EntityId,
    ) -> Result<StoredEmbedding, VectorStoreError> {
        self.store.retrieve(model.table_name(), &attribute.name, id)
    }

    pub fn generate(
        &self,
        model: &EntityModel,
        attribute: &AttributeModel,
        id: &EntityId,
        document: String,
    ) -> Result<(), VectorStoreError> {
        debug!(table = model.table_name(), attribute = %attribute.name, %id, "generating embedding");
        self.store.generate(
            model.table_name(),
            &attribute.name,
            slice::from_ref(id),
            slice::from_ref(&document),
        )
    }

    pub fn update(
        &self,
        model: &EntityModel,
        attribute: &AttributeModel,
        id: &EntityId,
        document: String,
    ) -> Result<(), VectorStoreError> {
        debug!(table = model.table_name(), attribute = %attribute.name, %id, "regenerating embedding");
        self.store.update(
            model.table_name(),
            &attribute.name,
            slice::from_ref(id),
            slice::from_ref(&document),
        )
    }

    pub fn delete(
        &self,
        model: &EntityModel,
        attribute: &AttributeModel,
        ids: &[EntityId],
    ) -> Result<usize, VectorStoreError> {
        self.store.delete(model.table_name(), &attribute.name, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;
    use crate::storage::MemoryVectorStore;

    fn model() -> EntityModel {
        EntityModel::new(
            "comments",
            "id",
            vec![
                AttributeModel::base("id", ValueType::String),
                AttributeModel::base("body", ValueType::String).embedded(),
                AttributeModel::base("edit", ValueType::String).nullable().embedded(),
            ],
            vec![],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_document_rules() {
        let adapter = VectorAdapter::new(Arc::new(MemoryVectorStore::default()));
        let model = model();
        let body = model.attribute_by_name("body").unwrap();
        let edit = model.attribute_by_name("edit").unwrap();
        let id = EntityId::from("c1");

        assert_eq!(
            adapter.document_for(&model, body, &id, &AttributeValue::from("hi")).unwrap(),
            Some("hi".to_string())
        );
        assert_eq!(
            adapter.document_for(&model, body, &id, &AttributeValue::from("")).unwrap(),
            Some(EMPTY_DOCUMENT_SENTINEL.to_string())
        );
        assert_eq!(
            adapter.document_for(&model, body, &id, &AttributeValue::from("  \n")).unwrap(),
            Some(EMPTY_DOCUMENT_SENTINEL.to_string())
        );
        assert_eq!(
            adapter.document_for(&model, edit, &id, &AttributeValue::Null).unwrap(),
            None
        );
        let err = adapter
            .document_for(&model, body, &id, &AttributeValue::Null)
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::EmptyDocument { .. }));
    }

    #[test]
    fn test_generate_then_retrieve() {
        let adapter = VectorAdapter::new(Arc::new(MemoryVectorStore::default()));
        let model = model();
        let body = model.attribute_by_name("body").unwrap();
        let id = EntityId::from("c1");

        let missing = adapter.retrieve(&model, body, &id).unwrap_err();
        assert!(matches!(missing, VectorStoreError::EmbeddingsNotFound { .. }));

        adapter.generate(&model, body, &id, "first".into()).unwrap();
        let stored = adapter.retrieve(&model, body, &id).unwrap();
        assert_eq!(stored.document, "first");
        assert!(!stored.vector.is_empty());
    }
}
