//! Model-driven row marshalling over a `RelationalStore`

use std::sync::Arc;
use tracing::{debug, trace};

use crate::data::{AttributeMap, AttributeValue, EntityId, Row, SqlValue, StoreError};
use crate::model::{AttributeModel, EntityModel, PersistedType, ValueType};
use crate::traits::RelationalStore;

/// Converts between entity attribute maps and relational rows using only the
/// entity model; there is no per-entity-kind code here.
#[derive(Clone)]
pub struct RelationalAdapter {
    store: Arc<dyn RelationalStore>,
}

impl RelationalAdapter {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RelationalStore> {
        &self.store
    }

    /// The persisted attributes of the row keyed by `id`, or `None` if there is
    /// no such row. More than one row is an `AmbiguousResult`.
    pub fn select_by_id(&self, model: &EntityModel, id: &EntityId) -> Result<Option<AttributeMap>, StoreError> {
        let table = model.table_name();
        let mut rows = self.store.select(table, model.id_attribute(), id)?;
        match rows.len() {
            0 => Ok(None),
            1 => {
                let row = rows.remove(0);
                Ok(Some(self.row_to_attributes(model, row)?))
            }
            count => Err(StoreError::AmbiguousResult {
                table: table.to_string(),
                id: id.clone(),
                count,
            }),
        }
    }

    /// Like [`select_by_id`](Self::select_by_id) but a missing row is `NotFound`.
    pub fn get_by_id(&self, model: &EntityModel, id: &EntityId) -> Result<AttributeMap, StoreError> {
        self.select_by_id(model, id)?.ok_or_else(|| StoreError::NotFound {
            table: model.table_name().to_string(),
            id: id.clone(),
        })
    }

    pub fn insert(&self, model: &EntityModel, values: &AttributeMap) -> Result<(), StoreError> {
        let row = self.attributes_to_row(model, values)?;
        debug!(table = model.table_name(), columns = row.len(), "inserting row");
        self.store.insert(model.table_name(), vec![row])
    }

    pub fn update_by_id(
        &self,
        model: &EntityModel,
        id: &EntityId,
        partial: &AttributeMap,
    ) -> Result<(), StoreError> {
        let row = self.attributes_to_row(model, partial)?;
        debug!(table = model.table_name(), %id, columns = row.len(), "updating row");
        self.store
            .update_by_id(model.table_name(), model.id_attribute(), id, row)
    }

    pub fn delete_by_ids(&self, model: &EntityModel, ids: &[EntityId]) -> Result<usize, StoreError> {
        self.store
            .delete_by_ids(model.table_name(), model.id_attribute(), ids)
    }

    fn row_to_attributes(&self, model: &EntityModel, row: Row) -> Result<AttributeMap, StoreError> {
        let mut values = AttributeMap::new();
        for (column, cell) in row {
            match model.attribute_by_name(&column) {
                Some(attribute) if attribute.class().is_persisted() => {
                    let value = from_sql(model.table_name(), attribute, cell)?;
                    values.insert(column, value);
                }
                _ => trace!(table = model.table_name(), %column, "ignoring unmodeled column"),
            }
        }
        Ok(values)
    }

    fn attributes_to_row(&self, model: &EntityModel, values: &AttributeMap) -> Result<Row, StoreError> {
        let mut row = Row::new();
        for (name, value) in values {
            let attribute = model
                .attribute_by_name(name)
                .filter(|a| a.class().is_persisted())
                .ok_or_else(|| {
                    StoreError::mapping(model.table_name(), name.as_str(), "not a persisted attribute")
                })?;
            row.insert(name.clone(), to_sql(model.table_name(), attribute, value)?);
        }
        Ok(row)
    }
}

/// Encodes one attribute value as a relational cell.
pub fn to_sql(table: &str, attribute: &AttributeModel, value: &AttributeValue) -> Result<SqlValue, StoreError> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    if !value.matches(attribute.value_type) {
        return Err(StoreError::mapping(
            table,
            attribute.name.as_str(),
            format!("expected {}, got {}", attribute.value_type, value.type_name()),
        ));
    }
    let cell = match (attribute.persisted_type, value) {
        (PersistedType::Integer, AttributeValue::Int(i)) => SqlValue::Integer(*i),
        (PersistedType::Text, AttributeValue::Int(i)) => SqlValue::Text(i.to_string()),
        (PersistedType::Text, AttributeValue::String(s)) => SqlValue::Text(s.clone()),
        (PersistedType::Text, AttributeValue::EntityRef(id)) => SqlValue::Text(id.to_string()),
        (PersistedType::Json, composite) => SqlValue::Text(composite.to_json().to_string()),
        (persisted, other) => {
            return Err(StoreError::mapping(
                table,
                attribute.name.as_str(),
                format!("cannot persist {} as {}", other.type_name(), persisted),
            ))
        }
    };
    Ok(cell)
}

/// Decodes one relational cell into an attribute value.
pub fn from_sql(table: &str, attribute: &AttributeModel, cell: SqlValue) -> Result<AttributeValue, StoreError> {
    let mapping_error = |message: String| StoreError::mapping(table, attribute.name.as_str(), message);

    let value = match (attribute.value_type, cell) {
        (_, SqlValue::Null) => AttributeValue::Null,
        (ValueType::Int, SqlValue::Integer(i)) => AttributeValue::Int(i),
        (ValueType::Int, SqlValue::Text(s)) => AttributeValue::Int(
            s.trim()
                .parse()
                .map_err(|e| mapping_error(format!("invalid integer '{}': {}", s, e)))?,
        ),
        (ValueType::String, SqlValue::Text(s)) => AttributeValue::String(s),
        (ValueType::String, SqlValue::Integer(i)) => AttributeValue::String(i.to_string()),
        (ValueType::EntityRef, SqlValue::Text(s)) => AttributeValue::EntityRef(EntityId(s)),
        (ValueType::Mapping, SqlValue::Text(s)) => {
            let map = serde_json::from_str(&s)
                .map_err(|e| mapping_error(format!("invalid JSON mapping: {}", e)))?;
            AttributeValue::Mapping(map)
        }
        (ValueType::EntityRefList, SqlValue::Text(s)) => {
            let ids = serde_json::from_str(&s)
                .map_err(|e| mapping_error(format!("invalid JSON id list: {}", e)))?;
            AttributeValue::EntityRefList(ids)
        }
        (value_type, cell) => {
            return Err(mapping_error(format!("cannot read {} from {}", value_type, cell)))
        }
    };
    Ok(value)
}
