use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use thicket_kb::test_utils::{comment_dict, seed, store_factory};
use thicket_kb::tree::CREATED_UTC;
use thicket_kb::{AttributeValue, EntityId, Resolver, SerializedNode, SubmissionForest, SubmissionForestError};

use super::test_utils::Forum;

fn ids(raw: &[&str]) -> Vec<EntityId> {
    raw.iter().map(|id| EntityId::from(*id)).collect()
}

fn random_tree(rng: &mut StdRng, next: &mut usize, depth: usize) -> SerializedNode {
    let id = format!("t{}", *next);
    *next += 1;
    let kids = if depth == 0 { 0 } else { rng.gen_range(0..4) };
    SerializedNode {
        id: EntityId::from(id),
        kids: (0..kids).map(|_| random_tree(rng, next, depth - 1)).collect(),
    }
}

/// Seeds one comment per `(id, body, created_utc)`.
fn seed_thread(forum: &Forum, comments: &[(&str, &str, i64)]) {
    for (id, body, created) in comments {
        seed(
            &forum.comments,
            &forum.backends.sources,
            comment_dict(id, "alice", body, *created),
        )
        .unwrap();
    }
}

#[test_log::test]
fn test_serialization_round_trips_random_shapes() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut next = 0;
    for _ in 0..20 {
        let roots: Vec<SerializedNode> = (0..rng.gen_range(1..4))
            .map(|_| random_tree(&mut rng, &mut next, 4))
            .collect();

        let forest = SubmissionForest::from_serializable(&roots);
        assert_eq!(forest.to_serializable(), roots);
        assert_eq!(forest.validate(), Ok(()));

        let again = SubmissionForest::from_json(&forest.to_json().unwrap()).unwrap();
        assert_eq!(again, forest);
    }
}

#[test_log::test]
fn test_clean_prunes_failing_subtrees() {
    let forum = Forum::new();
    seed_thread(
        &forum,
        &[("root", "question", 1), ("a", "answer", 2), ("b", "spam", 3), ("r2", "spam", 4)],
    );
    let factory = store_factory(forum.comments.clone(), forum.backends.sources.clone());
    let mut forest = SubmissionForest::from_json(
        r#"[{"id": "root", "kids": [{"id": "a", "kids": [{"id": "b"}]}]}, {"id": "r2", "kids": [{"id": "x"}]}]"#,
    )
    .unwrap();

    let removed = forest.clean(
        |entity| entity.value("body") != Some(&AttributeValue::from("spam")),
        &Resolver::uniform(factory.as_ref()),
    );
    assert_eq!(removed, 3);
    assert_eq!(
        forest.to_serializable(),
        vec![SerializedNode {
            id: EntityId::from("root"),
            kids: vec![SerializedNode::leaf("a")],
        }]
    );
}

#[test_log::test]
fn test_clean_drops_unresolvable_nodes() {
    let forum = Forum::new();
    seed_thread(&forum, &[("root", "question", 1)]);
    let factory = store_factory(forum.comments.clone(), forum.backends.sources.clone());
    let mut forest =
        SubmissionForest::from_json(r#"[{"id": "root", "kids": [{"id": "deleted", "kids": [{"id": "c"}]}]}]"#)
            .unwrap();

    assert_eq!(forest.clean(|_| true, &Resolver::uniform(factory.as_ref())), 2);
    assert_eq!(forest.len(), 1);
}

#[test_log::test]
fn test_activation_and_active_branches() {
    let forum = Forum::new();
    seed_thread(
        &forum,
        &[("r", "post", 100), ("c1", "reply", 200), ("c3", "nested", 300), ("c2", "late", 400)],
    );
    let factory = store_factory(forum.comments.clone(), forum.backends.sources.clone());
    let resolver = Resolver::uniform(factory.as_ref());
    let mut forest = SubmissionForest::from_json(
        r#"[{"id": "r", "kids": [{"id": "c1", "kids": [{"id": "c3"}]}, {"id": "c2"}]}]"#,
    )
    .unwrap();

    let cutoff = Utc.timestamp_opt(350, 0).unwrap();
    assert_eq!(forest.activate_before_time(CREATED_UTC, cutoff, &resolver), 3);
    assert_eq!(forest.active_ids(), vec![&EntityId::from("r"), &EntityId::from("c1"), &EntityId::from("c3")]);
    assert_eq!(
        forest.collect_active_branches(),
        vec![ids(&["r"]), ids(&["r", "c1"]), ids(&["r", "c1", "c3"])]
    );

    forest.deactivate_all();
    assert!(forest.active_ids().is_empty());
    assert!(forest.collect_active_branches().is_empty());

    let early = Utc.timestamp_opt(50, 0).unwrap();
    assert_eq!(forest.activate_before_time(CREATED_UTC, early, &resolver), 0);
}

#[test_log::test]
fn test_dfs_branches_in_pre_order() {
    let forum = Forum::new();
    seed_thread(
        &forum,
        &[("r", "post", 100), ("c1", "reply", 200), ("c3", "nested", 300), ("c2", "late", 400)],
    );
    let factory = store_factory(forum.comments.clone(), forum.backends.sources.clone());
    let forest = SubmissionForest::from_json(
        r#"[{"id": "r", "kids": [{"id": "c1", "kids": [{"id": "c3"}]}, {"id": "c2"}]}]"#,
    )
    .unwrap();

    let branches: Vec<_> = forest
        .iter_dfs_branches(Resolver::uniform(factory.as_ref()))
        .collect::<Result<_, _>>()
        .unwrap();
    let paths: Vec<Vec<&EntityId>> = branches.iter().map(|branch| branch.ids()).collect();
    assert_eq!(
        paths,
        vec![
            vec![&EntityId::from("r")],
            vec![&EntityId::from("r"), &EntityId::from("c1")],
            vec![&EntityId::from("r"), &EntityId::from("c1"), &EntityId::from("c3")],
            vec![&EntityId::from("r"), &EntityId::from("c2")],
        ]
    );
    assert_eq!(branches[2].leaf().value("body"), Some(&AttributeValue::from("nested")));
    assert_eq!(branches[2].depth(), 2);

    let again = forest.iter_dfs_branches(Resolver::uniform(factory.as_ref())).count();
    assert_eq!(again, 4);
}

#[test_log::test]
fn test_dfs_branches_skip_unresolvable_subtrees() {
    let forum = Forum::new();
    seed_thread(&forum, &[("r", "post", 100), ("c3", "nested", 300), ("c2", "late", 400)]);
    let factory = store_factory(forum.comments.clone(), forum.backends.sources.clone());
    let forest = SubmissionForest::from_json(
        r#"[{"id": "r", "kids": [{"id": "gone", "kids": [{"id": "c3"}]}, {"id": "c2"}]}]"#,
    )
    .unwrap();

    let items: Vec<_> = forest.iter_dfs_branches(Resolver::uniform(factory.as_ref())).collect();
    assert_eq!(items.len(), 3);
    assert!(items[1].as_ref().is_err_and(|error| error.is_not_found()));
    let last = items[2].as_ref().unwrap();
    assert_eq!(last.ids(), vec![&EntityId::from("r"), &EntityId::from("c2")]);
}

#[test_log::test]
fn test_lookups_refuse_ambiguous_ids() {
    let mut forest = SubmissionForest::from_json(
        r#"[{"id": "r1", "kids": [{"id": "x"}]}, {"id": "r2", "kids": [{"id": "x"}]}]"#,
    )
    .unwrap();
    let x = EntityId::from("x");
    let ambiguous = SubmissionForestError::Ambiguous {
        id: x.clone(),
        roots: 2,
    };

    assert_eq!(forest.contains_descendant(&x), Err(ambiguous.clone()));
    assert_eq!(forest.get_descendant(&x).map(|node| node.is_some()), Err(ambiguous.clone()));
    assert_eq!(
        forest.get_parent_of_descendant(&x).map(|node| node.is_some()),
        Err(ambiguous.clone())
    );
    assert_eq!(forest.attach(&x, "y"), Err(ambiguous.clone()));
    assert_eq!(forest.remove_ids(&[x.clone()]), Err(ambiguous));

    assert_eq!(
        forest
            .get_parent_of_descendant(&EntityId::from("r1"))
            .map(|node| node.is_some()),
        Ok(false)
    );
}
