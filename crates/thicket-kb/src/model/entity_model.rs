//! Entity kind declarations

use std::collections::HashMap;

use crate::data::ModelError;
use crate::model::attribute::{AttributeClass, AttributeModel};

/// Declarative description of one entity kind.
///
/// Immutable once built; share it between entities through an `Arc`.
#[derive(Debug, Clone)]
pub struct EntityModel {
    id_attribute: String,
    table_name: String,
    base: Vec<AttributeModel>,
    derived: Vec<AttributeModel>,
    generated: Vec<AttributeModel>,
    index: HashMap<String, (AttributeClass, usize)>,
}

impl EntityModel {
    /// Validates and builds a model.
    ///
    /// Fails if `id_attribute` is not a base attribute, if an attribute name is
    /// declared twice (in any group), if an attribute sits in the wrong group,
    /// or if an attribute's persisted type cannot hold its value type.
    pub fn new(
        table_name: impl Into<String>,
        id_attribute: impl Into<String>,
        base: Vec<AttributeModel>,
        derived: Vec<AttributeModel>,
        generated: Vec<AttributeModel>,
    ) -> Result<Self, ModelError> {
        let table_name = table_name.into();
        let id_attribute = id_attribute.into();
        let mut index = HashMap::new();

        for (class, group) in [
            (AttributeClass::Base, &base),
            (AttributeClass::Derived, &derived),
            (AttributeClass::Generated, &generated),
        ] {
            for (position, attribute) in group.iter().enumerate() {
                if attribute.class() != class {
                    return Err(ModelError::MisplacedAttribute {
                        table: table_name.clone(),
                        attribute: attribute.name.clone(),
                        declared: class.to_string(),
                        actual: attribute.class().to_string(),
                    });
                }
                if !attribute.value_type.can_persist_as(attribute.persisted_type) {
                    return Err(ModelError::IncompatiblePersistedType {
                        table: table_name.clone(),
                        attribute: attribute.name.clone(),
                        value_type: attribute.value_type.to_string(),
                        persisted_type: attribute.persisted_type.to_string(),
                    });
                }
                if index
                    .insert(attribute.name.clone(), (class, position))
                    .is_some()
                {
                    return Err(ModelError::DuplicateAttribute {
                        table: table_name.clone(),
                        attribute: attribute.name.clone(),
                    });
                }
            }
        }

        match index.get(&id_attribute) {
            Some((AttributeClass::Base, _)) => {}
            _ => {
                return Err(ModelError::MissingIdAttribute {
                    table: table_name,
                    id_attribute,
                })
            }
        }

        Ok(Self {
            id_attribute,
            table_name,
            base,
            derived,
            generated,
            index,
        })
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn attributes_of_class(&self, class: AttributeClass) -> &[AttributeModel] {
        match class {
            AttributeClass::Base => &self.base,
            AttributeClass::Derived => &self.derived,
            AttributeClass::Generated => &self.generated,
        }
    }

    /// Every attribute, base first, then derived, then generated.
    pub fn all_attributes(&self) -> impl Iterator<Item = &AttributeModel> {
        self.base
            .iter()
            .chain(self.derived.iter())
            .chain(self.generated.iter())
    }

    /// Base and generated attributes; the columns of the entity's table.
    pub fn persisted_attributes(&self) -> impl Iterator<Item = &AttributeModel> {
        self.all_attributes().filter(|a| a.class().is_persisted())
    }

    pub fn all_embedded_attributes(&self) -> impl Iterator<Item = &AttributeModel> {
        self.all_attributes().filter(|a| a.embedded)
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&AttributeModel> {
        let (class, position) = self.index.get(name)?;
        self.attributes_of_class(*class).get(*position)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}
