use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;

use thicket_kb::storage::{RelationalAdapter, EMPTY_DOCUMENT_SENTINEL};
use thicket_kb::test_utils::{comment_dict, seed, MockRelationalStore};
use thicket_kb::{
    AttributeValue, BaseLoader, CoreError, Entity, EntityId, EntityLoader, Sources, StoreError, VectorStore,
    VectorStoreError,
};

use super::test_utils::Forum;

#[test_log::test]
fn test_dict_values_read_back_unchanged() {
    let forum = Forum::new();
    let mut dict = comment_dict("c1", "alice", "first!", 1_700_000_000);
    dict.insert(
        "flair".to_string(),
        AttributeValue::Mapping(BTreeMap::from([("text".to_string(), serde_json::json!("OP"))])),
    );
    let entity = forum.comment_from_dict("c1", dict.clone());

    for (name, value) in &dict {
        assert_eq!(entity.get(name).unwrap(), Some(value), "attribute {name}");
    }
    assert_eq!(entity.to_attribute_map().get("title"), Some(&AttributeValue::Null));
}

#[test_log::test]
fn test_store_round_trip_and_idempotent_sync() {
    let forum = Forum::new();
    let relational = &forum.backends.relational;
    let mut dict = comment_dict("c1", "alice", "first!", 1_700_000_000);
    dict.insert(
        "flair".to_string(),
        AttributeValue::Mapping(BTreeMap::from([("text".to_string(), serde_json::json!("OP"))])),
    );
    let mut entity = forum.comment_from_dict("c1", dict);

    let report = entity.sync_to_store().unwrap();
    assert!(report.inserted);
    assert_eq!(relational.row_count("comments"), 1);

    let loaded = Entity::load(
        forum.comments.clone(),
        "c1",
        &EntityLoader::base_from_store(),
        &forum.backends.sources,
    )
    .unwrap();
    assert_eq!(loaded, entity);

    relational.reset_stats();
    let report = entity.sync_to_store().unwrap();
    assert!(!report.wrote());
    assert_eq!(relational.stats().writes(), 0);

    entity.set("body", "edited").unwrap();
    let report = entity.sync_to_store().unwrap();
    assert_eq!(report.updated, vec!["body".to_string()]);
    assert_eq!(relational.stats().updates, 1);

    let reloaded = Entity::load(
        forum.comments.clone(),
        "c1",
        &EntityLoader::base_from_store(),
        &forum.backends.sources,
    )
    .unwrap();
    assert_eq!(reloaded.value("body"), Some(&AttributeValue::from("edited")));
}

#[test_log::test]
fn test_store_load_not_found_and_ambiguous() {
    let forum = Forum::new();
    let loader = EntityLoader::base_from_store();

    let missing = Entity::load(forum.comments.clone(), "ghost", &loader, &forum.backends.sources).unwrap_err();
    assert!(missing.is_not_found());
    assert!(matches!(missing, CoreError::Store(StoreError::NotFound { .. })));

    let adapter = RelationalAdapter::new(forum.backends.relational.clone());
    let dict = comment_dict("dup", "alice", "twice", 1);
    adapter.insert(&forum.comments, &dict).unwrap();
    adapter.insert(&forum.comments, &dict).unwrap();

    let ambiguous = Entity::load(forum.comments.clone(), "dup", &loader, &forum.backends.sources).unwrap_err();
    assert!(matches!(
        ambiguous,
        CoreError::Store(StoreError::AmbiguousResult { count: 2, .. })
    ));
}

#[test_log::test]
fn test_only_changed_documents_are_reembedded() {
    let forum = Forum::new();
    let vector = &forum.backends.vector;
    let mut dict = comment_dict("c1", "alice", "first!", 1);
    dict.insert("title".to_string(), AttributeValue::from("hello"));
    let mut entity = forum.comment_from_dict("c1", dict);

    let report = entity.sync_to_vector_store().unwrap();
    assert_eq!(report.generated, vec!["body".to_string(), "title".to_string()]);
    assert!(entity.status().base.embeddings);

    entity.set("title", "hello again").unwrap();
    assert!(entity.embedding("title").unwrap().is_none());
    let report = entity.sync_to_vector_store().unwrap();
    assert_eq!(report.regenerated, vec!["title".to_string()]);
    assert_eq!(report.unchanged, vec!["body".to_string()]);
    assert!(report.generated.is_empty());

    let report = entity.sync_to_vector_store().unwrap();
    assert!(!report.wrote());
    assert_eq!(vector.stats_for("comments", "title").updated, 1);
    assert_eq!(vector.stats_for("comments", "body").updated, 0);
    assert_eq!(vector.stats_for("comments", "body").generated, 1);
}

#[test_log::test]
fn test_empty_and_null_documents() {
    let forum = Forum::new();
    let mut entity = forum.comment_from_dict("c1", comment_dict("c1", "alice", "", 1));

    let report = entity.sync_to_vector_store().unwrap();
    assert_eq!(report.generated, vec!["body".to_string()]);
    let stored = forum
        .backends
        .vector
        .retrieve("comments", "body", &EntityId::from("c1"))
        .unwrap();
    assert_eq!(stored.document, EMPTY_DOCUMENT_SENTINEL);
    assert_eq!(forum.backends.vector.len("comments", "title"), 0);

    entity.set("body", AttributeValue::Null).unwrap();
    let err = entity.sync_to_vector_store().unwrap_err();
    assert!(matches!(
        err,
        CoreError::VectorStore(VectorStoreError::EmptyDocument { ref attribute, .. }) if attribute == "body"
    ));
}

#[test_log::test]
fn test_whitespace_only_body_is_embedded() {
    let forum = Forum::new();
    let mut entity = forum.comment_from_dict("c1", comment_dict("c1", "alice", "  \n", 1));

    let report = entity.sync_to_vector_store().unwrap();
    assert_eq!(report.generated, vec!["body".to_string()]);
    assert!(entity.embedding("body").unwrap().is_some());
    let stored = forum
        .backends
        .vector
        .retrieve("comments", "body", &EntityId::from("c1"))
        .unwrap();
    assert_eq!(stored.document, EMPTY_DOCUMENT_SENTINEL);
}

#[test_log::test]
fn test_null_on_required_attribute_is_not_persisted() {
    let forum = Forum::new();
    let mut entity = seed(&forum.comments, &forum.backends.sources, comment_dict("c1", "alice", "hi", 1)).unwrap();
    forum.backends.relational.reset_stats();

    entity.set("body", AttributeValue::Null).unwrap();
    let err = entity.sync_to_store().unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch { ref attribute, .. } if attribute == "body"));
    assert_eq!(forum.backends.relational.stats().writes(), 0);

    entity.set("title", AttributeValue::Null).unwrap();
    entity.set("body", "restored").unwrap();
    assert_eq!(entity.sync_to_store().unwrap().updated, vec!["body".to_string()]);
}

#[test_log::test]
fn test_missing_embeddings_surface_unless_synced() {
    let forum = Forum::new();
    seed(&forum.comments, &forum.backends.sources, comment_dict("c1", "alice", "hi", 1)).unwrap();

    let err = Entity::load(
        forum.comments.clone(),
        "c1",
        &EntityLoader::new(BaseLoader::from_store().with_embeddings()),
        &forum.backends.sources,
    )
    .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        CoreError::VectorStore(VectorStoreError::EmbeddingsNotFound { .. })
    ));

    let entity = Entity::load(
        forum.comments.clone(),
        "c1",
        &EntityLoader::new(BaseLoader::from_store().sync_embeddings()),
        &forum.backends.sources,
    )
    .unwrap();
    assert!(entity.status().base.embeddings);
    assert!(entity.embedding("body").unwrap().is_some());
    assert_eq!(forum.backends.vector.stats_for("comments", "body").generated, 1);

    let again = Entity::load(
        forum.comments.clone(),
        "c1",
        &EntityLoader::new(BaseLoader::from_store().with_embeddings()),
        &forum.backends.sources,
    )
    .unwrap();
    assert_eq!(again.embedding("body").unwrap(), entity.embedding("body").unwrap());
}

#[test_log::test]
fn test_delete_removes_row_and_embeddings() {
    let forum = Forum::new();
    let mut entity = seed(&forum.comments, &forum.backends.sources, comment_dict("c1", "alice", "hi", 1)).unwrap();
    entity.sync_to_vector_store().unwrap();
    assert_eq!(forum.backends.vector.len("comments", "body"), 1);

    entity.delete().unwrap();
    assert_eq!(forum.backends.relational.row_count("comments"), 0);
    assert_eq!(forum.backends.vector.len("comments", "body"), 0);

    entity.delete().unwrap();
}

#[test_log::test]
fn test_backend_failure_propagates_from_load() {
    let mut store = MockRelationalStore::new();
    store
        .expect_select()
        .times(1)
        .returning(|_, _, _| Err(StoreError::Backend("connection reset".to_string())));
    let sources = Sources::new().with_relational(Arc::new(store));
    let forum = Forum::new();

    let err = Entity::load(forum.comments.clone(), "c1", &EntityLoader::base_from_store(), &sources).unwrap_err();
    assert!(matches!(err, CoreError::Store(StoreError::Backend(_))));
    assert!(!err.is_not_found());
}

#[test_log::test]
fn test_first_sync_inserts_one_full_row() {
    let mut store = MockRelationalStore::new();
    store.expect_select().times(1).returning(|_, _, _| Ok(Vec::new()));
    store
        .expect_insert()
        .withf(|table, rows| table.to_string() == "comments" && rows.len() == 1 && rows[0].len() == 6)
        .times(1)
        .returning(|_, _| Ok(()));
    store.expect_update_by_id().never();

    let forum = Forum::new();
    let sources = Sources::new().with_relational(Arc::new(store));
    let entity = Entity::load(
        forum.comments.clone(),
        "c1",
        &EntityLoader::new(BaseLoader::from_dict(comment_dict("c1", "alice", "hi", 1))),
        &sources,
    )
    .unwrap();

    let report = entity.sync_to_store().unwrap();
    assert!(report.inserted);
}
