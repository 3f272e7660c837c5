//! Canonical graph store
//!
//! Provides [`GraphStore`], the single owner of the investigation's node and
//! edge projections. Both collections are id-keyed maps, so uniqueness holds by
//! construction and counts are always derived from the maps.

use casebook_model::{entity_label, EntityDirectory, EntitySummary, GraphEdge, GraphNode, GraphPage};
use indexmap::IndexMap;

/// Id-keyed node and edge maps for one investigation
///
/// Insertion order is kept so renderers see a stable sequence; equality
/// ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStore {
    nodes: IndexMap<String, GraphNode>,
    edges: IndexMap<String, GraphEdge>,
    /// Set when the backend graph changed underneath us (e.g. after a merge)
    stale: bool,
}

impl GraphStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace-or-insert nodes by id
    ///
    /// Idempotent: upserting the same nodes twice leaves the same map.
    pub fn upsert_nodes<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = GraphNode>,
    {
        for node in nodes {
            self.nodes.insert(node.id.clone(), node);
        }
    }

    /// Replace-or-insert edges by id
    ///
    /// Endpoints are not checked here; dangling edges are dropped by
    /// [`GraphStore::renderable_edges`] and views instead.
    pub fn upsert_edges<I>(&mut self, edges: I)
    where
        I: IntoIterator<Item = GraphEdge>,
    {
        for edge in edges {
            self.edges.insert(edge.id.clone(), edge);
        }
    }

    /// Replace the whole store with a freshly fetched page
    ///
    /// Clears the stale flag.
    pub fn replace_page(&mut self, page: GraphPage) {
        self.nodes.clear();
        self.edges.clear();
        self.upsert_nodes(page.nodes);
        self.upsert_edges(page.edges);
        self.stale = false;
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "graph store reloaded"
        );
    }

    /// Get node by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Get edge by id
    #[inline]
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.get(id)
    }

    /// Check whether a node id is known
    #[inline]
    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Iterate all edges, including dangling ones
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    /// Edges whose endpoints are both present in this store
    pub fn renderable_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges
            .values()
            .filter(|edge| self.nodes.contains_key(&edge.source) && self.nodes.contains_key(&edge.target))
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the store holds nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Flag the store as out of date with the backend
    #[inline]
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Whether a re-fetch is pending
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Summaries of every known entity, for mention lookups
    #[must_use]
    pub fn entity_directory(&self) -> EntityDirectory {
        self.nodes.values().map(summarize).collect()
    }
}

fn summarize(node: &GraphNode) -> EntitySummary {
    // Nodes from a page carry a backend label; prefer the name, then that label.
    let derived = entity_label(&node.id, &node.properties);
    let label = if derived == node.id && !node.label.trim().is_empty() {
        node.label.clone()
    } else {
        derived
    };
    EntitySummary::new(node.id.clone(), label, node.schema.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebook_model::{Edge, Entity};
    use pretty_assertions::assert_eq;

    fn node(id: &str) -> GraphNode {
        GraphNode::from_entity(&Entity::new(id, "Person"))
    }

    fn edge(id: &str, source: &str, target: &str) -> GraphEdge {
        GraphEdge::from_edge(&Edge::new(id, source, target))
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut once = GraphStore::new();
        once.upsert_nodes([node("a"), node("b")]);
        once.upsert_edges([edge("e1", "a", "b")]);

        let mut twice = once.clone();
        twice.upsert_nodes([node("a"), node("b")]);
        twice.upsert_edges([edge("e1", "a", "b")]);

        assert_eq!(once, twice);
        assert_eq!(twice.node_count(), 2);
        assert_eq!(twice.edge_count(), 1);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut store = GraphStore::new();
        store.upsert_nodes([node("a")]);

        let renamed = GraphNode::from_entity(&Entity::new("a", "Person").with_property("name", ["Alice"]));
        store.upsert_nodes([renamed]);

        assert_eq!(store.node_count(), 1);
        assert_eq!(store.node("a").map(|n| n.label.as_str()), Some("Alice"));
    }

    #[test]
    fn renderable_edges_skip_dangling() {
        let mut store = GraphStore::new();
        store.upsert_nodes([node("a"), node("b")]);
        store.upsert_edges([edge("e1", "a", "b"), edge("e2", "a", "ghost")]);

        let ids: Vec<_> = store.renderable_edges().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e1"]);
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn replace_page_clears_stale_and_old_content() {
        let mut store = GraphStore::new();
        store.upsert_nodes([node("old")]);
        store.mark_stale();

        store.replace_page(GraphPage {
            nodes: vec![node("a")],
            edges: vec![],
            total_nodes: 1,
            total_edges: 0,
        });

        assert!(!store.is_stale());
        assert!(!store.contains_node("old"));
        assert!(store.contains_node("a"));
    }

    #[test]
    fn directory_uses_backend_label_when_name_missing() {
        let mut store = GraphStore::new();
        store.upsert_nodes([GraphNode {
            id: "d1".to_string(),
            schema: "Document".to_string(),
            label: "Annual report".to_string(),
            properties: Default::default(),
        }]);
        store.upsert_nodes([GraphNode::from_entity(
            &Entity::new("p1", "Person").with_property("name", ["Bob"]),
        )]);

        let directory = store.entity_directory();
        assert_eq!(directory.get("d1").map(|s| s.label.as_str()), Some("Annual report"));
        assert_eq!(directory.get("p1").map(|s| s.label.as_str()), Some("Bob"));
    }
}
