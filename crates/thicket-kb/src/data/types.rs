//! Basic value types shared by the entity store and its backends

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::data::identifiers::EntityId;
use crate::model::ValueType;

/// In-memory value of one entity attribute.
///
/// `Null` is a loaded value; an attribute that was never loaded is represented
/// by the absence of a value (`Option::None`) in the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    String(String),
    Int(i64),
    Mapping(BTreeMap<String, serde_json::Value>),
    EntityRef(EntityId),
    EntityRefList(Vec<EntityId>),
}

/// Attribute name to value, as supplied to a dictionary loader.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_entity_ref(&self) -> Option<&EntityId> {
        match self {
            AttributeValue::EntityRef(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_entity_refs(&self) -> Option<&[EntityId]> {
        match self {
            AttributeValue::EntityRefList(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, serde_json::Value>> {
        match self {
            AttributeValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Whether this value may be stored in an attribute of `value_type`.
    /// `Null` matches every type; nullability is checked by the caller.
    pub fn matches(&self, value_type: ValueType) -> bool {
        matches!(
            (self, value_type),
            (AttributeValue::Null, _)
                | (AttributeValue::String(_), ValueType::String)
                | (AttributeValue::Int(_), ValueType::Int)
                | (AttributeValue::Mapping(_), ValueType::Mapping)
                | (AttributeValue::EntityRef(_), ValueType::EntityRef)
                | (AttributeValue::EntityRefList(_), ValueType::EntityRefList)
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::String(_) => "string",
            AttributeValue::Int(_) => "int",
            AttributeValue::Mapping(_) => "mapping",
            AttributeValue::EntityRef(_) => "entity_ref",
            AttributeValue::EntityRefList(_) => "entity_ref_list",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::String(s) => serde_json::Value::String(s.clone()),
            AttributeValue::Int(i) => serde_json::json!(i),
            AttributeValue::Mapping(map) => {
                serde_json::Value::Object(map.clone().into_iter().collect())
            }
            AttributeValue::EntityRef(id) => serde_json::Value::String(id.to_string()),
            AttributeValue::EntityRefList(ids) => serde_json::Value::Array(
                ids.iter()
                    .map(|id| serde_json::Value::String(id.to_string()))
                    .collect(),
            ),
        }
    }

    /// Text handed to the embedding model for this value. `None` for `Null`.
    pub fn document_text(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Int(i) => Some(i.to_string()),
            AttributeValue::EntityRef(id) => Some(id.to_string()),
            AttributeValue::Mapping(_) | AttributeValue::EntityRefList(_) => {
                Some(self.to_json().to_string())
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<EntityId> for AttributeValue {
    fn from(id: EntityId) -> Self {
        AttributeValue::EntityRef(id)
    }
}

impl From<Vec<EntityId>> for AttributeValue {
    fn from(ids: Vec<EntityId>) -> Self {
        AttributeValue::EntityRefList(ids)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

/// Scalar cell of the relational store. Composite values travel as
/// JSON-encoded `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// One relational row: column name to cell.
pub type Row = BTreeMap<String, SqlValue>;
