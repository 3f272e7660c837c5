//! Persisted canvas codec
//!
//! Hydration treats stored JSON as untrusted. Each raw node and edge is parsed
//! on its own into either a typed value or a drop, so one malformed entry
//! never prevents the rest of the canvas from loading. Missing or mistyped
//! optional fields fall back to defaults instead of failing the entry.
//!
//! Persisted layout:
//!
//! ```json
//! {
//!   "nodes": [{"id": "...", "type": "note" | "entity", "position": {"x": 0, "y": 0}, "data": {}}],
//!   "edges": [{"id": "...", "source": "...", "target": "...", "type": "smoothstep"}],
//!   "viewport": {"x": 0, "y": 0, "zoom": 1}
//! }
//! ```

use crate::document::{
    CanvasEdge, CanvasNode, EdgeKind, EntityRefNode, NoteNode, NotebookDocument, Position, Viewport,
    DEFAULT_NOTE_TITLE,
};
use crate::hash::DocumentHash;
use crate::rich_text::RichText;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const DEFAULT_ENTITY_LABEL: &str = "Entity";
const DEFAULT_ENTITY_SCHEMA: &str = "Entity";

/// Result of hydrating a stored canvas
#[derive(Debug, Clone, PartialEq)]
pub struct HydrationReport {
    pub document: NotebookDocument,
    /// Nodes skipped: not an object, no string id, or a repeated id
    pub dropped_nodes: usize,
    /// Edges skipped: not an object or missing a string id/source/target
    pub dropped_edges: usize,
}

impl HydrationReport {
    /// Whether every stored entry made it into the document
    #[inline]
    #[must_use]
    pub fn is_lossless(&self) -> bool {
        self.dropped_nodes == 0 && self.dropped_edges == 0
    }
}

/// Converts between stored canvas JSON and [`NotebookDocument`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCodec;

impl DocumentCodec {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build a document from stored JSON
    ///
    /// Never fails. An absent or non-object canvas hydrates as the empty
    /// canvas; non-array `nodes`/`edges` hydrate as empty lists.
    #[must_use]
    pub fn hydrate(&self, raw: &Value, version: u64) -> HydrationReport {
        let canvas = RawCanvas::deserialize(raw).unwrap_or_default();

        let mut dropped_nodes = 0;
        let nodes: Vec<CanvasNode> = canvas
            .nodes
            .iter()
            .filter_map(|raw_node| match hydrate_node(raw_node) {
                Ok(node) => Some(node),
                Err(reason) => {
                    dropped_nodes += 1;
                    tracing::debug!(%reason, "dropping canvas node");
                    None
                }
            })
            .collect();

        let mut dropped_edges = 0;
        let edges: Vec<CanvasEdge> = canvas
            .edges
            .iter()
            .filter_map(|raw_edge| match hydrate_edge(raw_edge) {
                Ok(edge) => Some(edge),
                Err(reason) => {
                    dropped_edges += 1;
                    tracing::debug!(%reason, "dropping canvas edge");
                    None
                }
            })
            .collect();

        let viewport = Viewport::new(
            canvas.viewport.x.unwrap_or(0.0),
            canvas.viewport.y.unwrap_or(0.0),
            canvas.viewport.zoom.unwrap_or(1.0),
        );

        let (document, duplicates) = NotebookDocument::from_parts(version, nodes, edges, viewport);
        dropped_nodes += duplicates;

        if dropped_nodes > 0 || dropped_edges > 0 {
            tracing::info!(dropped_nodes, dropped_edges, "canvas hydrated with drops");
        }

        HydrationReport {
            document,
            dropped_nodes,
            dropped_edges,
        }
    }

    /// Minimal persisted shape of a document
    #[must_use]
    pub fn serialize(&self, document: &NotebookDocument) -> Value {
        let canvas = PersistedCanvas {
            nodes: document.nodes().iter().map(PersistedNode::from).collect(),
            edges: document.edges().iter().map(PersistedEdge::from).collect(),
            viewport: PersistedViewport::from(document.viewport()),
        };
        // Borrowed strings, numbers and JSON subtrees always convert.
        serde_json::to_value(canvas).unwrap_or_default()
    }

    /// Hash of the serialized document
    #[must_use]
    pub fn hash(&self, document: &NotebookDocument) -> DocumentHash {
        DocumentHash::of(&self.serialize(document))
    }
}

/// Parse a field, falling back to `T::default()` when it has the wrong shape
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
struct RawCanvas {
    #[serde(default, deserialize_with = "lenient")]
    nodes: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    edges: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    viewport: RawViewport,
}

#[derive(Debug, Default, Deserialize)]
struct RawViewport {
    #[serde(default, deserialize_with = "lenient")]
    x: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    y: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    zoom: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPosition {
    #[serde(default, deserialize_with = "lenient")]
    x: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    y: Option<f64>,
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        Self::new(raw.x.unwrap_or(0.0), raw.y.unwrap_or(0.0))
    }
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    position: RawPosition,
    #[serde(default, deserialize_with = "lenient")]
    data: RawNodeData,
}

/// Union of both variants' payload fields; the node `type` picks which apply
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNodeData {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    content: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    entity_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    schema: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    id: String,
    source: String,
    target: String,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    kind: Option<String>,
}

fn require_object(raw: &Value, what: &str) -> Result<(), serde_json::Error> {
    if raw.is_object() {
        Ok(())
    } else {
        Err(serde::de::Error::custom(format!("{what} is not an object")))
    }
}

fn hydrate_node(raw: &Value) -> Result<CanvasNode, serde_json::Error> {
    require_object(raw, "canvas node")?;
    let RawNode { id, kind, position, data } = RawNode::deserialize(raw)?;
    let position = Position::from(position);

    let node = if kind.as_deref() == Some("entity") {
        EntityRefNode {
            id,
            position,
            entity_id: data.entity_id.unwrap_or_default(),
            label: data.label.unwrap_or_else(|| DEFAULT_ENTITY_LABEL.to_string()),
            schema: data.schema.unwrap_or_else(|| DEFAULT_ENTITY_SCHEMA.to_string()),
        }
        .into()
    } else {
        NoteNode {
            id,
            position,
            title: data.title.unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string()),
            content: data.content.and_then(RichText::from_json).unwrap_or_default(),
        }
        .into()
    };
    Ok(node)
}

fn hydrate_edge(raw: &Value) -> Result<CanvasEdge, serde_json::Error> {
    require_object(raw, "canvas edge")?;
    let RawEdge { id, source, target, kind } = RawEdge::deserialize(raw)?;
    let kind = kind.as_deref().map_or_else(EdgeKind::default, EdgeKind::from_name);
    Ok(CanvasEdge::new(id, source, target).with_kind(kind))
}

#[derive(Serialize)]
struct PersistedCanvas<'a> {
    nodes: Vec<PersistedNode<'a>>,
    edges: Vec<PersistedEdge<'a>>,
    viewport: PersistedViewport,
}

#[derive(Serialize)]
struct PersistedPosition {
    x: f64,
    y: f64,
}

impl From<Position> for PersistedPosition {
    fn from(position: Position) -> Self {
        Self { x: position.x, y: position.y }
    }
}

#[derive(Serialize)]
struct PersistedViewport {
    x: f64,
    y: f64,
    zoom: f64,
}

impl From<Viewport> for PersistedViewport {
    fn from(viewport: Viewport) -> Self {
        Self {
            x: viewport.x,
            y: viewport.y,
            zoom: viewport.zoom,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PersistedNode<'a> {
    Note {
        id: &'a str,
        position: PersistedPosition,
        data: PersistedNote<'a>,
    },
    Entity {
        id: &'a str,
        position: PersistedPosition,
        data: PersistedEntity<'a>,
    },
}

#[derive(Serialize)]
struct PersistedNote<'a> {
    title: &'a str,
    content: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedEntity<'a> {
    entity_id: &'a str,
    label: &'a str,
    schema: &'a str,
}

impl<'a> From<&'a CanvasNode> for PersistedNode<'a> {
    fn from(node: &'a CanvasNode) -> Self {
        match node {
            CanvasNode::Note(note) => Self::Note {
                id: &note.id,
                position: note.position.into(),
                data: PersistedNote {
                    title: &note.title,
                    content: note.content.as_json(),
                },
            },
            CanvasNode::EntityRef(entity) => Self::Entity {
                id: &entity.id,
                position: entity.position.into(),
                data: PersistedEntity {
                    entity_id: &entity.entity_id,
                    label: &entity.label,
                    schema: &entity.schema,
                },
            },
        }
    }
}

#[derive(Serialize)]
struct PersistedEdge<'a> {
    id: &'a str,
    source: &'a str,
    target: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

impl<'a> From<&'a CanvasEdge> for PersistedEdge<'a> {
    fn from(edge: &'a CanvasEdge) -> Self {
        Self {
            id: &edge.id,
            source: &edge.source,
            target: &edge.target,
            kind: edge.kind.as_str(),
        }
    }
}
