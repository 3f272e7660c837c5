use casebook_core::{BackendError, CasebookError, Operation, SessionConfig};
use casebook_graph::GraphFilter;
use casebook_model::DuplicateQuery;
use casebook_test_utils::fixtures::{candidate, person};
use casebook_test_utils::{sample_backend, setup_test_session, setup_test_session_with, InMemoryBackend};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn merge_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_entities([person("A", "Person A"), person("B", "Person B"), person("C", "Person C")])
        .with_candidates([candidate("A", "B", 0.8), candidate("B", "C", 0.75)])
}

#[tokio::test]
async fn test_expand_merges_neighbors_once() {
    let backend = Arc::new(sample_backend());
    let mut session = setup_test_session(Arc::clone(&backend));

    let first = session.expand("p1").await.unwrap();
    assert_eq!((first.nodes_added, first.edges_added), (3, 2));

    let again = session.expand("p1").await.unwrap();
    assert_eq!((again.nodes_added, again.edges_added), (0, 0));
    assert_eq!(session.graph().node_count(), 3);

    let next = session.expand("p2").await.unwrap();
    assert_eq!((next.nodes_added, next.edges_added), (1, 1));
    assert_eq!(session.graph().node_count(), 4);
    assert_eq!(session.graph().edge_count(), 3);
}

#[tokio::test]
async fn test_failed_expand_leaves_store_untouched() {
    let backend = Arc::new(sample_backend());
    let mut session = setup_test_session(Arc::clone(&backend));
    session.expand("p1").await.unwrap();

    backend.fail_next(Operation::Expand, BackendError::status(500, ""));
    let err = session.expand("p2").await.unwrap_err();
    assert_eq!(err.user_message(), "Could not expand entity");

    let missing = session.expand("ghost").await.unwrap_err();
    assert_eq!(missing.user_message(), "Entity not found");

    assert_eq!(session.graph().node_count(), 3);
    assert_eq!(session.graph().edge_count(), 2);
}

#[tokio::test]
async fn test_merge_removes_touching_candidates_and_refreshes_graph() {
    let backend = Arc::new(merge_backend());
    let mut session = setup_test_session(Arc::clone(&backend));
    session.load_graph().await.unwrap();
    assert_eq!(session.graph().node_count(), 3);

    let found = session.scan_duplicates(&DuplicateQuery::new(0.7, 100)).await.unwrap();
    assert_eq!(found, 2);

    let pair = session.duplicate_candidates()[0].clone();
    let outcome = session.merge_duplicate(&pair, "A").await.unwrap();

    assert_eq!(outcome.removed_candidates, 2);
    assert_eq!(outcome.response.merged_source_ids, ["B"]);
    assert!(session.duplicate_candidates().is_empty());

    assert!(!session.graph().is_stale());
    assert_eq!(backend.calls(Operation::LoadGraph), 2);
    assert!(session.graph().node("B").is_none());
    assert_eq!(session.graph().node_count(), 2);
}

#[tokio::test]
async fn test_failed_refresh_after_merge_leaves_graph_stale() {
    let backend = Arc::new(merge_backend());
    let mut session = setup_test_session(Arc::clone(&backend));
    session.load_graph().await.unwrap();
    session.scan_default_duplicates().await.unwrap();

    backend.fail_next(Operation::LoadGraph, BackendError::unreachable("connection reset"));
    let pair = session.duplicate_candidates()[0].clone();
    session.merge_duplicate(&pair, "B").await.unwrap();

    assert!(session.graph().is_stale());
    assert_eq!(session.graph().node_count(), 3);

    session.refresh_graph().await.unwrap();
    assert!(!session.graph().is_stale());
    assert_eq!(session.graph().node_count(), 2);
}

#[tokio::test]
async fn test_rejected_merge_is_reported_and_nothing_changes() {
    let backend = Arc::new(merge_backend());
    let mut session = setup_test_session(Arc::clone(&backend));
    session.scan_default_duplicates().await.unwrap();

    let pair = session.duplicate_candidates()[0].clone();
    let err = session.merge_duplicate(&pair, "C").await.unwrap_err();
    assert!(matches!(err, CasebookError::Validation(_)));
    assert_eq!(backend.calls(Operation::Merge), 0);

    backend.fail_next(Operation::Merge, BackendError::status(400, "target_id must be in source_ids"));
    let err = session.merge_duplicate(&pair, "A").await.unwrap_err();
    assert_eq!(err.user_message(), "target_id must be in source_ids");
    assert_eq!(session.duplicate_candidates().len(), 2);
    assert!(backend.entity("B").is_some());
}

#[tokio::test]
async fn test_scan_threshold_filters_candidates() {
    let backend = Arc::new(merge_backend());
    let config = SessionConfig::default().with_duplicate_scan(0.78, 10);
    let mut session = setup_test_session_with(Arc::clone(&backend), config);

    assert_eq!(session.scan_default_duplicates().await.unwrap(), 1);
    assert_eq!(session.duplicate_candidates()[0].right.id, "B");

    let err = session.scan_duplicates(&DuplicateQuery::new(0.5, 0)).await.unwrap_err();
    assert!(matches!(err, CasebookError::Validation(_)));
    assert_eq!(session.duplicate_candidates().len(), 1);
}

#[tokio::test]
async fn test_view_and_suggestions_follow_graph() {
    let backend = Arc::new(sample_backend());
    let mut session = setup_test_session(Arc::clone(&backend));
    session.load_graph().await.unwrap();

    let people = session.graph().view(&GraphFilter::all().with_schema("Person"));
    assert_eq!(people.nodes.len(), 3);
    assert_eq!(people.edges.len(), 2);

    let suggestions = session.suggest_mentions("bab");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, "p2");
    assert_eq!(suggestions[0].label, "Charles Babbage");
}
