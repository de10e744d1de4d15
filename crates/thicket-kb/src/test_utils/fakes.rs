//! Fake collaborators and forum fixtures for tests

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::data::{AttributeMap, AttributeValue, CoreError, EntityId, ModelError, Result};
use crate::entity::{BaseLoader, Entity, EntityFactory, EntityLoader};
use crate::model::{AttributeModel, EntityModel, PromptTemplate, ValueType};
use crate::storage::{MemoryRelationalStore, MemoryVectorStore, Sources};
use crate::traits::{Completion, TextGenerator};

/// Text generator replaying canned responses in order.
///
/// Token counts are whitespace-separated words. Once the script runs out the
/// fallback is returned, or an error if there is none.
#[derive(Debug, Default)]
pub struct ScriptedTextGenerator {
    responses: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTextGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers every prompt with `text`.
    pub fn repeating(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl TextGenerator for ScriptedTextGenerator {
    fn complete(&self, prompt: &str) -> std::result::Result<Completion, CoreError> {
        self.prompts.lock().push(prompt.to_string());
        let text = self
            .responses
            .lock()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| CoreError::Generation("script exhausted".to_string()))?;
        Ok(Completion {
            prompt_tokens: prompt.split_whitespace().count() as u64,
            completion_tokens: text.split_whitespace().count() as u64,
            text,
        })
    }
}

/// In-memory backends plus the `Sources` wrapping them.
pub struct MemoryBackends {
    pub relational: Arc<MemoryRelationalStore>,
    pub vector: Arc<MemoryVectorStore>,
    pub sources: Sources,
}

impl MemoryBackends {
    pub fn new() -> Self {
        let relational = Arc::new(MemoryRelationalStore::new());
        let vector = Arc::new(MemoryVectorStore::default());
        let sources = Sources::new()
            .with_relational(relational.clone())
            .with_vector(vector.clone());
        Self {
            relational,
            vector,
            sources,
        }
    }
}

impl Default for MemoryBackends {
    fn default() -> Self {
        Self::new()
    }
}

/// Forum users: a name, an optional bio and a generated persona.
pub fn user_model() -> std::result::Result<Arc<EntityModel>, ModelError> {
    EntityModel::new(
        "users",
        "name",
        vec![
            AttributeModel::base("name", ValueType::String),
            AttributeModel::base("bio", ValueType::String).nullable().embedded(),
            AttributeModel::base("created_utc", ValueType::Int),
        ],
        vec![],
        vec![AttributeModel::generated(
            "persona",
            ValueType::String,
            PromptTemplate::new("Describe the posting style of {name}. Bio: {bio}"),
        )
        .nullable()
        .embedded()],
    )
    .map(Arc::new)
}

/// Forum comments. `author_bio` is derived by loading the author through the
/// `"user"` factory.
pub fn comment_model() -> std::result::Result<Arc<EntityModel>, ModelError> {
    EntityModel::new(
        "comments",
        "id",
        vec![
            AttributeModel::base("id", ValueType::String),
            AttributeModel::base("author", ValueType::EntityRef),
            AttributeModel::base("body", ValueType::String).embedded(),
            AttributeModel::base("title", ValueType::String).nullable().embedded(),
            AttributeModel::base("created_utc", ValueType::Int),
            AttributeModel::base("flair", ValueType::Mapping).nullable(),
        ],
        vec![AttributeModel::derived("author_bio", ValueType::String, |ctx| {
            let author = ctx.value("author")?.as_entity_ref().cloned().ok_or_else(|| {
                CoreError::Generation(format!("comment {} has no author reference", ctx.id()))
            })?;
            let user = ctx.factory("user")?.load(&author)?;
            Ok(user.value("bio").cloned().unwrap_or(AttributeValue::Null))
        })
        .nullable()],
        vec![],
    )
    .map(Arc::new)
}

pub fn user_dict(name: &str, bio: Option<&str>, created_utc: i64) -> AttributeMap {
    AttributeMap::from([
        ("name".to_string(), AttributeValue::from(name)),
        ("bio".to_string(), AttributeValue::from(bio)),
        ("created_utc".to_string(), AttributeValue::Int(created_utc)),
    ])
}

pub fn comment_dict(id: &str, author: &str, body: &str, created_utc: i64) -> AttributeMap {
    AttributeMap::from([
        ("id".to_string(), AttributeValue::from(id)),
        ("author".to_string(), AttributeValue::from(EntityId::from(author))),
        ("body".to_string(), AttributeValue::from(body)),
        ("created_utc".to_string(), AttributeValue::Int(created_utc)),
    ])
}

/// Factory loading base attributes of `model` from the store in `sources`.
pub fn store_factory(model: Arc<EntityModel>, sources: Sources) -> Arc<dyn EntityFactory> {
    Arc::new(move |id: &EntityId| -> Result<Entity> {
        Entity::load(model.clone(), id.clone(), &EntityLoader::base_from_store(), &sources)
    })
}

/// Loads `dict` as a new entity and writes it to the store.
pub fn seed(model: &Arc<EntityModel>, sources: &Sources, dict: AttributeMap) -> Result<Entity> {
    let id = dict
        .get(model.id_attribute())
        .and_then(AttributeValue::document_text)
        .map(EntityId::from)
        .ok_or_else(|| CoreError::Generation("fixture dictionary has no id".to_string()))?;
    let entity = Entity::load(
        model.clone(),
        id,
        &EntityLoader::new(BaseLoader::from_dict(dict)),
        sources,
    )?;
    entity.sync_to_store()?;
    Ok(entity)
}
