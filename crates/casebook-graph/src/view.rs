//! Renderable projection of a graph store

use crate::store::GraphStore;
use casebook_model::{GraphEdge, GraphNode};
use std::collections::HashSet;

/// Schema and free-text filter applied before rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphFilter {
    /// Only nodes of this schema; `None` shows all
    pub schema: Option<String>,
    /// Case-insensitive substring over id, schema and label
    pub search: String,
}

impl GraphFilter {
    /// Filter that lets everything through
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// With schema restriction; `"all"` clears it
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.schema = (schema != "all" && !schema.is_empty()).then_some(schema);
        self
    }

    /// With search text
    #[inline]
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    fn matches(&self, node: &GraphNode, needle: &str) -> bool {
        if let Some(schema) = &self.schema {
            if &node.schema != schema {
                return false;
            }
        }
        if needle.is_empty() {
            return true;
        }
        format!("{} {} {}", node.id, node.schema, node.label)
            .to_lowercase()
            .contains(needle)
    }
}

/// Nodes passing a filter plus the edges between them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphView<'a> {
    /// Visible nodes in store order
    pub nodes: Vec<&'a GraphNode>,
    /// Edges with both endpoints visible
    pub edges: Vec<&'a GraphEdge>,
}

impl GraphStore {
    /// Project the store through a filter
    ///
    /// An edge is only part of the view when both endpoints are visible, so
    /// renderers never receive a dangling edge.
    #[must_use]
    pub fn view(&self, filter: &GraphFilter) -> GraphView<'_> {
        let needle = filter.search.trim().to_lowercase();
        let nodes: Vec<&GraphNode> = self.nodes().filter(|node| filter.matches(node, &needle)).collect();
        let visible: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        let edges = self
            .edges()
            .filter(|edge| visible.contains(edge.source.as_str()) && visible.contains(edge.target.as_str()))
            .collect();
        GraphView { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebook_model::{Edge, Entity};

    fn store() -> GraphStore {
        let mut store = GraphStore::new();
        store.upsert_nodes([
            GraphNode::from_entity(&Entity::new("p1", "Person").with_property("name", ["Ada"])),
            GraphNode::from_entity(&Entity::new("p2", "Person").with_property("name", ["Bob"])),
            GraphNode::from_entity(&Entity::new("o1", "Company").with_property("name", ["Acme"])),
        ]);
        store.upsert_edges([
            GraphEdge::from_edge(&Edge::new("e1", "p1", "p2")),
            GraphEdge::from_edge(&Edge::new("e2", "p1", "o1")),
            GraphEdge::from_edge(&Edge::new("e3", "p1", "missing")),
        ]);
        store
    }

    #[test]
    fn unfiltered_view_drops_only_dangling_edges() {
        let store = store();
        let view = store.view(&GraphFilter::all());
        assert_eq!(view.nodes.len(), 3);
        let ids: Vec<_> = view.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e1", "e2"]);
    }

    #[test]
    fn schema_filter_hides_edges_to_hidden_nodes() {
        let store = store();
        let view = store.view(&GraphFilter::all().with_schema("Person"));
        assert_eq!(view.nodes.len(), 2);
        let ids: Vec<_> = view.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e1"]);
    }

    #[test]
    fn search_matches_label_case_insensitively() {
        let store = store();
        let view = store.view(&GraphFilter::all().with_search("  ACME "));
        let ids: Vec<_> = view.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["o1"]);
        assert!(view.edges.is_empty());
    }

    #[test]
    fn all_schema_means_no_restriction() {
        assert_eq!(GraphFilter::all().with_schema("all").schema, None);
    }
}
