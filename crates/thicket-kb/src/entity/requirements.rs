//! Completeness requirements checked before an entity is used

use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;
use crate::model::AttributeClass;

/// Extra validation over a whole entity. `Err` carries the reason.
pub type ExtraCheck = Arc<dyn Fn(&Entity) -> Result<(), String> + Send + Sync>;

/// What one attribute class must satisfy.
#[derive(Clone, Default)]
pub struct ClassRequirement {
    pub values: bool,
    pub embeddings: bool,
    pub extra: Option<ExtraCheck>,
}

impl ClassRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(mut self) -> Self {
        self.values = true;
        self
    }

    pub fn embeddings(mut self) -> Self {
        self.embeddings = true;
        self
    }

    pub fn extra<F>(mut self, check: F) -> Self
    where
        F: Fn(&Entity) -> Result<(), String> + Send + Sync + 'static,
    {
        self.extra = Some(Arc::new(check));
        self
    }

    fn evaluate(&self, class: AttributeClass, entity: &Entity) -> Result<(), String> {
        let status = entity.status().of(class);
        let attributes = entity.model().attributes_of_class(class);

        if self.values {
            if !status.values {
                return Err(format!("{} values were not loaded", class));
            }
            for attribute in attributes.iter().filter(|a| !a.nullable) {
                match entity.value(&attribute.name) {
                    Some(value) if !value.is_null() => {}
                    _ => return Err(format!("{} attribute '{}' has no value", class, attribute.name)),
                }
            }
        }

        if self.embeddings {
            if !status.embeddings {
                return Err(format!("{} embeddings were not loaded", class));
            }
            for attribute in attributes.iter().filter(|a| a.embedded) {
                let has_value = entity.value(&attribute.name).map_or(false, |v| !v.is_null());
                if has_value && entity.cached_embedding(&attribute.name).is_none() {
                    return Err(format!("{} attribute '{}' has no embedding", class, attribute.name));
                }
            }
        }

        if let Some(check) = &self.extra {
            check(entity)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClassRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRequirement")
            .field("values", &self.values)
            .field("embeddings", &self.embeddings)
            .field("extra", &self.extra.is_some())
            .finish()
    }
}

/// Per-class requirements; a class without one is not checked.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    pub base: Option<ClassRequirement>,
    pub derived: Option<ClassRequirement>,
    pub generated: Option<ClassRequirement>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class: AttributeClass, requirement: ClassRequirement) -> Self {
        match class {
            AttributeClass::Base => self.base = Some(requirement),
            AttributeClass::Derived => self.derived = Some(requirement),
            AttributeClass::Generated => self.generated = Some(requirement),
        }
        self
    }

    pub fn for_class(&self, class: AttributeClass) -> Option<&ClassRequirement> {
        match class {
            AttributeClass::Base => self.base.as_ref(),
            AttributeClass::Derived => self.derived.as_ref(),
            AttributeClass::Generated => self.generated.as_ref(),
        }
    }

    /// The first unmet requirement, in class order.
    pub fn evaluate(&self, entity: &Entity) -> Result<(), String> {
        for class in AttributeClass::ALL {
            if let Some(requirement) = self.for_class(class) {
                requirement.evaluate(class, entity)?;
            }
        }
        Ok(())
    }
}
