use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;

use thicket_kb::test_utils::comment_dict;
use thicket_kb::{
    init_tracing, BaseLoader, CoreError, Entity, EntityLoader, HashEmbeddingGenerator, MemoryRelationalStore,
    MemoryVectorStore, Sources, ThicketConfig, TokenRates, VectorStoreError,
};

use super::test_utils::Forum;

const CONFIG: &str = r#"
log_filter: "thicket_kb=debug"
embedding:
  model: hash-embedding
  max_tokens: 4
  dimension: 8
generation:
  model: scripted
  prompt_rate: 0.25
  completion_rate: 0.5
"#;

#[test_log::test]
fn test_backends_built_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = ThicketConfig::load(Some(file.path())).unwrap();
    init_tracing(&config);
    assert_eq!(config.embedding.dimension, 8);
    assert_eq!(TokenRates::from_config(&config.generation), TokenRates::new(0.25, 0.5));

    let generator = HashEmbeddingGenerator::from_config(&config.embedding);
    let sources = Sources::new()
        .with_relational(Arc::new(MemoryRelationalStore::new()))
        .with_vector(Arc::new(MemoryVectorStore::new(Arc::new(generator))));
    let forum = Forum::new();

    let mut short = Entity::load(
        forum.comments.clone(),
        "c1",
        &EntityLoader::new(BaseLoader::from_dict(comment_dict("c1", "alice", "short one", 1))),
        &sources,
    )
    .unwrap();
    short.sync_to_vector_store().unwrap();
    assert_eq!(short.embedding("body").unwrap().map(<[f32]>::len), Some(8));

    let mut long = Entity::load(
        forum.comments.clone(),
        "c2",
        &EntityLoader::new(BaseLoader::from_dict(comment_dict(
            "c2",
            "alice",
            "this body is far too long to embed",
            1,
        ))),
        &sources,
    )
    .unwrap();
    let err = long.sync_to_vector_store().unwrap_err();
    assert!(matches!(
        err,
        CoreError::VectorStore(VectorStoreError::TokenLimit { tokens: 8, limit: 4, .. })
    ));
    assert!(long.embedding("body").unwrap().is_none());
}
