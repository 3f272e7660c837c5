//! Neighbor expansion reconciliation
//!
//! An expansion response is turned into an [`ExpansionPatch`] first and only
//! then written into the store, so a store never observes half of a response.

use crate::store::GraphStore;
use casebook_model::{ExpandPayload, GraphEdge, GraphNode};

/// Upserts derived from one expansion response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionPatch {
    /// Center entity first, then neighbors in response order
    pub nodes: Vec<GraphNode>,
    /// Returned edges in response order
    pub edges: Vec<GraphEdge>,
}

/// What an applied expansion changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionSummary {
    /// Nodes written (new or replaced)
    pub nodes_upserted: usize,
    /// Edges written (new or replaced)
    pub edges_upserted: usize,
    /// Nodes that were not in the store before
    pub nodes_added: usize,
    /// Edges that were not in the store before
    pub edges_added: usize,
}

/// Merges "neighbors of X" responses into a [`GraphStore`]
///
/// # Characteristics
/// - Per-id upsert only; nodes and edges not named in the response are untouched
/// - Responses are applied in arrival order, last response wins per id
/// - Applying the same response twice is a no-op the second time
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpansionReconciler;

impl ExpansionReconciler {
    /// Create new reconciler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Project a response into node and edge upserts
    #[must_use]
    pub fn plan(&self, payload: &ExpandPayload) -> ExpansionPatch {
        let nodes = std::iter::once(&payload.entity)
            .chain(payload.neighbors.iter())
            .map(GraphNode::from_entity)
            .collect();
        let edges = payload.edges.iter().map(GraphEdge::from_edge).collect();
        ExpansionPatch { nodes, edges }
    }

    /// Merge a response into the store
    pub fn apply(&self, store: &mut GraphStore, payload: &ExpandPayload) -> ExpansionSummary {
        let patch = self.plan(payload);

        let summary = ExpansionSummary {
            nodes_upserted: patch.nodes.len(),
            edges_upserted: patch.edges.len(),
            nodes_added: count_new(patch.nodes.iter().map(|n| n.id.as_str()), |id| store.contains_node(id)),
            edges_added: count_new(patch.edges.iter().map(|e| e.id.as_str()), |id| store.edge(id).is_some()),
        };

        store.upsert_nodes(patch.nodes);
        store.upsert_edges(patch.edges);

        tracing::info!(
            entity = %payload.entity.id,
            nodes_added = summary.nodes_added,
            edges_added = summary.edges_added,
            total_nodes = store.node_count(),
            total_edges = store.edge_count(),
            "expansion applied"
        );

        summary
    }
}

/// Count distinct ids not yet known to the store
fn count_new<'a>(ids: impl Iterator<Item = &'a str>, known: impl Fn(&str) -> bool) -> usize {
    let mut seen = std::collections::HashSet::new();
    ids.filter(|id| seen.insert(*id) && !known(*id)).count()
}
