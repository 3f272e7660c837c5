//! Graph projections and graph-shaped responses

use crate::entity::{entity_label, Edge, Entity, Properties};
use serde::{Deserialize, Serialize};

/// Display projection of an [`Entity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Entity id
    pub id: String,
    /// Entity type tag
    pub schema: String,
    /// Label derived from the `name` property
    pub label: String,
    /// Entity properties
    #[serde(default)]
    pub properties: Properties,
}

impl GraphNode {
    /// Project an entity, deriving its label
    #[must_use]
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            schema: entity.schema.clone(),
            label: entity_label(&entity.id, &entity.properties),
            properties: entity.properties.clone(),
        }
    }
}

impl From<Entity> for GraphNode {
    fn from(entity: Entity) -> Self {
        let label = entity_label(&entity.id, &entity.properties);
        Self {
            id: entity.id,
            schema: entity.schema,
            label,
            properties: entity.properties,
        }
    }
}

/// Display projection of an [`Edge`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge id
    pub id: String,
    /// Id of the source node
    pub source: String,
    /// Id of the target node
    pub target: String,
    /// Relationship type
    #[serde(default)]
    pub schema: String,
    /// Label as sent by the backend
    #[serde(default)]
    pub label: String,
    /// Relationship properties
    #[serde(default)]
    pub properties: Properties,
}

impl GraphEdge {
    /// Project a relationship; its label is the relationship type
    #[must_use]
    pub fn from_edge(edge: &Edge) -> Self {
        Self {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            schema: edge.schema.clone(),
            label: edge.schema.clone(),
            properties: edge.properties.clone(),
        }
    }

    /// Label to draw on the edge
    ///
    /// Blank, `UNKNOWNLINK` and `RELATED` relationships carry no information
    /// worth drawing and render unlabeled.
    #[must_use]
    pub fn display_label(&self) -> &str {
        let schema = self.schema.trim();
        if schema.eq_ignore_ascii_case("UNKNOWNLINK") || schema.eq_ignore_ascii_case("RELATED") {
            return "";
        }
        schema
    }

    /// Whether this edge touches the given node id
    #[inline]
    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Response of "fetch neighbors of entity X"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandPayload {
    /// The expanded (center) entity
    pub entity: Entity,
    /// Entities one hop away
    #[serde(default)]
    pub neighbors: Vec<Entity>,
    /// Relationships between the center and its neighbors
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl ExpandPayload {
    /// Payload with no neighbors
    #[inline]
    #[must_use]
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            neighbors: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// With one more neighbor
    #[inline]
    #[must_use]
    pub fn with_neighbor(mut self, neighbor: Entity) -> Self {
        self.neighbors.push(neighbor);
        self
    }

    /// With one more relationship
    #[inline]
    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }
}

/// One page of the investigation graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPage {
    /// Nodes on this page
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Edges on this page
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Node count of the whole graph
    #[serde(default)]
    pub total_nodes: usize,
    /// Edge count of the whole graph
    #[serde(default)]
    pub total_edges: usize,
}
