use pretty_assertions::assert_eq;

use thicket_kb::test_utils::{comment_dict, seed, store_factory, user_dict};
use thicket_kb::{
    AttributeClass, AttributeValue, ClassRequirement, CoreError, DerivedLoader, DerivedParams, Entity, EntityLoader,
    LoaderError, Requirements, StoreError,
};

use super::test_utils::Forum;

fn derived_loader(forum: &Forum) -> DerivedLoader {
    DerivedLoader::new(
        DerivedParams::new().with_factory("user", store_factory(forum.users.clone(), forum.backends.sources.clone())),
    )
}

fn seeded_forum() -> Forum {
    let forum = Forum::new();
    let sources = &forum.backends.sources;
    seed(&forum.users, sources, user_dict("alice", Some("Writes about lifetimes"), 100)).unwrap();
    seed(&forum.comments, sources, comment_dict("c1", "alice", "hello", 200)).unwrap();
    seed(&forum.comments, sources, comment_dict("c2", "bob", "orphaned", 300)).unwrap();
    forum
}

#[test_log::test]
fn test_derived_value_loads_referenced_user() {
    let forum = seeded_forum();
    let loader = EntityLoader::base_from_store().with_derived(derived_loader(&forum));

    let comment = Entity::load(forum.comments.clone(), "c1", &loader, &forum.backends.sources).unwrap();
    assert_eq!(
        comment.get("author_bio").unwrap(),
        Some(&AttributeValue::from("Writes about lifetimes"))
    );
    assert!(comment.status().derived.values);
    assert!(!comment.status().derived.embeddings);
}

#[test_log::test]
fn test_derived_failure_is_fatal_by_default() {
    let forum = seeded_forum();
    let loader = EntityLoader::base_from_store().with_derived(derived_loader(&forum));

    let err = Entity::load(forum.comments.clone(), "c2", &loader, &forum.backends.sources).unwrap_err();
    match err {
        CoreError::DerivedLoad { attribute, source, .. } => {
            assert_eq!(attribute, "author_bio");
            assert!(matches!(*source, CoreError::Store(StoreError::NotFound { .. })));
        }
        other => panic!("expected DerivedLoad, got {other:?}"),
    }
}

#[test_log::test]
fn test_derived_failure_skipped_on_request() {
    let forum = seeded_forum();
    let loader = EntityLoader::base_from_store().with_derived(derived_loader(&forum).skip_on_error());

    let comment = Entity::load(forum.comments.clone(), "c2", &loader, &forum.backends.sources).unwrap();
    assert_eq!(comment.get("author_bio").unwrap(), None);
    assert_eq!(comment.value("body"), Some(&AttributeValue::from("orphaned")));
}

#[test_log::test]
fn test_missing_factory_is_reported() {
    let forum = seeded_forum();
    let loader = EntityLoader::base_from_store().with_derived(DerivedLoader::new(DerivedParams::new()));

    let err = Entity::load(forum.comments.clone(), "c1", &loader, &forum.backends.sources).unwrap_err();
    let CoreError::DerivedLoad { source, .. } = err else {
        panic!("expected DerivedLoad");
    };
    assert!(matches!(*source, CoreError::Loader(LoaderError::MissingParam(ref name)) if name == "user"));
}

#[test_log::test]
fn test_requirements_follow_load_state() {
    let forum = seeded_forum();
    let loader = EntityLoader::base_from_store().with_derived(derived_loader(&forum));
    let mut comment = Entity::load(forum.comments.clone(), "c1", &loader, &forum.backends.sources).unwrap();

    let requirements = Requirements::new()
        .with(AttributeClass::Base, ClassRequirement::new().values().embeddings())
        .with(
            AttributeClass::Derived,
            ClassRequirement::new().values().extra(|entity: &Entity| {
                match entity.value("author_bio") {
                    Some(bio) if !bio.is_null() => Ok(()),
                    _ => Err("author has no bio".to_string()),
                }
            }),
        );

    assert!(!comment.check(&requirements));
    comment.sync_to_vector_store().unwrap();
    assert!(comment.check(&requirements));

    comment.set("author_bio", AttributeValue::Null).unwrap();
    assert!(!comment.check(&requirements));
    assert_eq!(requirements.evaluate(&comment), Err("author has no bio".to_string()));
}

#[test_log::test]
fn test_unloaded_class_never_counts_as_embedded() {
    let forum = seeded_forum();
    let mut user = Entity::load(
        forum.users.clone(),
        "alice",
        &EntityLoader::base_from_store(),
        &forum.backends.sources,
    )
    .unwrap();
    let requirements = Requirements::new().with(AttributeClass::Generated, ClassRequirement::new().embeddings());

    user.sync_to_vector_store().unwrap();
    assert!(user.status().base.embeddings);
    assert!(!user.status().generated.values);
    assert!(!user.status().generated.embeddings);
    assert!(user.embedding("persona").unwrap().is_none());
    assert!(!user.check(&requirements));
}
