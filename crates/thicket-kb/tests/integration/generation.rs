use pretty_assertions::assert_eq;

use thicket_kb::test_utils::{user_dict, MockTextGenerator, ScriptedTextGenerator};
use thicket_kb::{AttributeValue, Completion, CoreError, Entity, EntityLoader, MeteredGenerator, TokenRates};

use super::test_utils::Forum;

#[test_log::test]
fn test_generated_once_then_persisted() {
    let forum = Forum::new();
    let mut user = forum.user_from_dict("alice", user_dict("alice", Some("Writes about borrow checking"), 1));
    assert!(!user.status().generated.values);

    let generator = MeteredGenerator::new(
        ScriptedTextGenerator::new(["Terse and technical."]),
        TokenRates::new(0.001, 0.002),
    );
    let generated = user.generate_attributes(&generator).unwrap();
    assert_eq!(generated, vec!["persona".to_string()]);
    assert_eq!(user.value("persona"), Some(&AttributeValue::from("Terse and technical.")));
    assert!(user.status().generated.values);
    assert_eq!(
        generator.inner().prompts(),
        vec!["Describe the posting style of alice. Bio: Writes about borrow checking".to_string()]
    );

    assert!(user.generate_attributes(&generator).unwrap().is_empty());
    let usage = generator.usage();
    assert_eq!(usage.calls, 1);
    assert_eq!(usage.prompt_tokens, 11);
    assert_eq!(usage.completion_tokens, 3);
    assert!((usage.cost - 0.017).abs() < 1e-9);

    user.sync_to_store().unwrap();
    let loaded = Entity::load(
        forum.users.clone(),
        "alice",
        &EntityLoader::base_from_store(),
        &forum.backends.sources,
    )
    .unwrap();
    assert!(loaded.status().generated.values);
    assert_eq!(loaded.value("persona"), user.value("persona"));
}

#[test_log::test]
fn test_generated_embedding_follows_generation() {
    let forum = Forum::new();
    let mut user = forum.user_from_dict("alice", user_dict("alice", None, 1));

    let report = user.sync_to_vector_store().unwrap();
    assert!(report.generated.is_empty());

    user.generate_attributes(&ScriptedTextGenerator::repeating("Quiet lurker."))
        .unwrap();
    let report = user.sync_to_vector_store().unwrap();
    assert_eq!(report.generated, vec!["persona".to_string()]);
    assert!(user.embedding("persona").unwrap().is_some());
    assert!(user.embedding("bio").unwrap().is_none());
}

#[test_log::test]
fn test_generator_failure_leaves_value_absent() {
    let forum = Forum::new();
    let mut user = forum.user_from_dict("bob", user_dict("bob", Some("Mostly memes"), 1));

    let mut generator = MockTextGenerator::new();
    generator
        .expect_complete()
        .withf(|prompt| prompt.contains("bob"))
        .times(1)
        .returning(|_| Err(CoreError::Generation("rate limited".to_string())));

    let err = user.generate_attributes(&generator).unwrap_err();
    assert!(matches!(err, CoreError::Generation(_)));
    assert_eq!(user.value("persona"), None);
    assert!(!user.status().generated.values);
}

#[test_log::test]
fn test_mock_generator_value_is_used_verbatim() {
    let forum = Forum::new();
    let mut user = forum.user_from_dict("carol", user_dict("carol", None, 1));

    let mut generator = MockTextGenerator::new();
    generator.expect_complete().times(1).returning(|_| {
        Ok(Completion {
            text: "Asks good questions.".to_string(),
            prompt_tokens: 9,
            completion_tokens: 3,
        })
    });

    let metered = MeteredGenerator::new(generator, TokenRates::new(0.5, 1.0));
    user.generate_attributes(&metered).unwrap();
    assert_eq!(user.value("persona"), Some(&AttributeValue::from("Asks good questions.")));

    let usage = metered.reset();
    assert!((usage.cost - 7.5).abs() < 1e-9);
    assert_eq!(metered.usage().calls, 0);
}
