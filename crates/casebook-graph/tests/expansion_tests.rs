use casebook_graph::{ExpansionReconciler, GraphFilter, GraphStore};
use casebook_model::{Edge, Entity, ExpandPayload, GraphNode};
use proptest::prelude::*;

fn person(id: &str) -> Entity {
    Entity::new(id, "Person")
}

#[test]
fn test_expanding_twice_is_stable() {
    let mut store = GraphStore::new();
    store.upsert_nodes([GraphNode::from_entity(&person("p1"))]);

    let payload = ExpandPayload::new(person("p1"))
        .with_neighbor(person("p2"))
        .with_edge(Edge::new("e1", "p1", "p2"));
    let reconciler = ExpansionReconciler::new();

    let first = reconciler.apply(&mut store, &payload);
    assert_eq!(first.nodes_added, 1);
    assert_eq!(first.edges_added, 1);
    assert_eq!(store.node_count(), 2);
    assert_eq!(store.edge_count(), 1);

    let snapshot = store.clone();
    let second = reconciler.apply(&mut store, &payload);
    assert_eq!(second.nodes_added, 0);
    assert_eq!(second.edges_added, 0);
    assert_eq!(store, snapshot);
}

#[test]
fn test_edge_to_unknown_node_is_kept_but_not_rendered() {
    let mut store = GraphStore::new();
    let payload = ExpandPayload::new(person("p1")).with_edge(Edge::new("e1", "p1", "p9"));
    ExpansionReconciler::new().apply(&mut store, &payload);

    assert_eq!(store.edge_count(), 1);
    assert_eq!(store.renderable_edges().count(), 0);
    assert!(store.view(&GraphFilter::all()).edges.is_empty());

    // Once the far end shows up the edge becomes drawable.
    ExpansionReconciler::new().apply(&mut store, &ExpandPayload::new(person("p9")));
    assert_eq!(store.renderable_edges().count(), 1);
}

fn arb_payload() -> impl Strategy<Value = ExpandPayload> {
    let id = "[a-e]";
    (
        id,
        prop::collection::vec(id, 0..6),
        prop::collection::vec(("[a-e]{2}", id, id), 0..6),
    )
        .prop_map(|(center, neighbors, edges)| {
            let mut payload = ExpandPayload::new(person(&center));
            for neighbor in neighbors {
                payload = payload.with_neighbor(person(&neighbor));
            }
            for (edge_id, source, target) in edges {
                payload = payload.with_edge(Edge::new(edge_id, source, target));
            }
            payload
        })
}

proptest! {
    #[test]
    fn prop_apply_is_idempotent(
        seed in prop::collection::vec(arb_payload(), 0..4),
        payload in arb_payload(),
    ) {
        let reconciler = ExpansionReconciler::new();
        let mut store = GraphStore::new();
        for earlier in &seed {
            reconciler.apply(&mut store, earlier);
        }

        reconciler.apply(&mut store, &payload);
        let once = store.clone();
        reconciler.apply(&mut store, &payload);

        prop_assert_eq!(once, store);
    }

    #[test]
    fn prop_counts_match_distinct_ids(payloads in prop::collection::vec(arb_payload(), 1..5)) {
        let reconciler = ExpansionReconciler::new();
        let mut store = GraphStore::new();
        let mut node_ids = std::collections::HashSet::new();
        let mut edge_ids = std::collections::HashSet::new();

        for payload in &payloads {
            reconciler.apply(&mut store, payload);
            node_ids.insert(payload.entity.id.clone());
            node_ids.extend(payload.neighbors.iter().map(|n| n.id.clone()));
            edge_ids.extend(payload.edges.iter().map(|e| e.id.clone()));
        }

        prop_assert_eq!(store.node_count(), node_ids.len());
        prop_assert_eq!(store.edge_count(), edge_ids.len());
    }
}
