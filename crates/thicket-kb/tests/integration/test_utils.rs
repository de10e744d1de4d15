use std::sync::Arc;

use thicket_kb::test_utils::{comment_model, user_model, MemoryBackends};
use thicket_kb::{AttributeMap, BaseLoader, Entity, EntityLoader, EntityModel};

/// Backends plus both forum models.
pub struct Forum {
    pub backends: MemoryBackends,
    pub users: Arc<EntityModel>,
    pub comments: Arc<EntityModel>,
}

impl Forum {
    pub fn new() -> Self {
        Self {
            backends: MemoryBackends::new(),
            users: user_model().expect("user model"),
            comments: comment_model().expect("comment model"),
        }
    }

    /// A comment built from `dict` without touching any store.
    pub fn comment_from_dict(&self, id: &str, dict: AttributeMap) -> Entity {
        Entity::load(
            self.comments.clone(),
            id,
            &EntityLoader::new(BaseLoader::from_dict(dict)),
            &self.backends.sources,
        )
        .expect("comment from dict")
    }

    pub fn user_from_dict(&self, id: &str, dict: AttributeMap) -> Entity {
        Entity::load(
            self.users.clone(),
            id,
            &EntityLoader::new(BaseLoader::from_dict(dict)),
            &self.backends.sources,
        )
        .expect("user from dict")
    }
}
