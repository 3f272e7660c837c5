//! Canvas document model
//!
//! A [`NotebookDocument`] is an ordered list of canvas nodes (notes and entity
//! references), an ordered list of edges between them, and the viewport. Every
//! mutating method here is a structural change as far as autosave is concerned.

use crate::error::NotebookError;
use crate::rich_text::RichText;
use casebook_model::{EntityDirectory, EntitySummary};
use uuid::Uuid;

/// Title given to notes that have none
pub const DEFAULT_NOTE_TITLE: &str = "Note";

/// Subject of a [`NotebookError::InvalidPosition`] raised by
/// [`NotebookDocument::set_viewport`]
pub const VIEWPORT_SUBJECT: &str = "viewport";

/// Canvas coordinates
///
/// Documents only hold finite coordinates; the editing methods reject NaN
/// and infinities since they cannot be persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    /// Horizontal canvas coordinate
    pub x: f64,
    /// Vertical canvas coordinate
    pub y: f64,
}

impl Position {
    /// Position at `(x, y)`
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This position shifted by `(dx, dy)`
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Whether both coordinates are finite
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pan and zoom of the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Horizontal pan
    pub x: f64,
    /// Vertical pan
    pub y: f64,
    /// Zoom factor, 1 is unscaled
    pub zoom: f64,
}

impl Viewport {
    /// Viewport panned to `(x, y)` at `zoom`
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    /// Whether every component is finite
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.zoom.is_finite()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Free-form note
#[derive(Debug, Clone, PartialEq)]
pub struct NoteNode {
    /// Node id, unique within the document
    pub id: String,
    /// Canvas position
    pub position: Position,
    /// Heading shown on the card
    pub title: String,
    /// Rich-text body
    pub content: RichText,
}

impl NoteNode {
    /// Untitled note with an empty paragraph
    #[must_use]
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            title: DEFAULT_NOTE_TITLE.to_string(),
            content: RichText::empty(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: RichText) -> Self {
        self.content = content;
        self
    }
}

/// Pointer from the canvas into the entity graph
///
/// `label` and `schema` are copies taken when the node was placed. They go
/// stale if the entity is renamed or merged away; the node keeps rendering
/// with the stored values rather than failing.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRefNode {
    /// Node id, `entity-{entity_id}-{suffix}` when placed locally
    pub id: String,
    /// Canvas position
    pub position: Position,
    /// Referenced graph entity
    pub entity_id: String,
    /// Entity label captured at placement
    pub label: String,
    /// Entity type tag captured at placement
    pub schema: String,
}

impl EntityRefNode {
    /// Reference node copying an entity summary
    #[must_use]
    pub fn from_summary(id: impl Into<String>, position: Position, entity: &EntitySummary) -> Self {
        Self {
            id: id.into(),
            position,
            entity_id: entity.id.clone(),
            label: entity.label.clone(),
            schema: entity.schema.clone(),
        }
    }

    /// Current summary of the referenced entity
    ///
    /// `None` means the reference is dangling.
    #[inline]
    #[must_use]
    pub fn resolve<'a>(&self, directory: &'a EntityDirectory) -> Option<&'a EntitySummary> {
        directory.get(&self.entity_id)
    }
}

/// A node on the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasNode {
    /// Free-form note
    Note(NoteNode),
    /// Placed reference to a graph entity
    EntityRef(EntityRefNode),
}

impl CanvasNode {
    /// Node id
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Note(note) => &note.id,
            Self::EntityRef(entity) => &entity.id,
        }
    }

    /// Canvas position
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::Note(note) => note.position,
            Self::EntityRef(entity) => entity.position,
        }
    }

    fn set_position(&mut self, position: Position) {
        match self {
            Self::Note(note) => note.position = position,
            Self::EntityRef(entity) => entity.position = position,
        }
    }

    /// The note, if this is one
    #[inline]
    #[must_use]
    pub fn as_note(&self) -> Option<&NoteNode> {
        match self {
            Self::Note(note) => Some(note),
            Self::EntityRef(_) => None,
        }
    }

    /// The entity reference, if this is one
    #[inline]
    #[must_use]
    pub fn as_entity_ref(&self) -> Option<&EntityRefNode> {
        match self {
            Self::EntityRef(entity) => Some(entity),
            Self::Note(_) => None,
        }
    }
}

impl From<NoteNode> for CanvasNode {
    fn from(note: NoteNode) -> Self {
        Self::Note(note)
    }
}

impl From<EntityRefNode> for CanvasNode {
    fn from(entity: EntityRefNode) -> Self {
        Self::EntityRef(entity)
    }
}

/// How an edge is drawn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EdgeKind {
    /// Rounded orthogonal connector, the default
    #[default]
    Smoothstep,
    /// Any other renderer-specific kind, kept verbatim
    Custom(String),
}

impl EdgeKind {
    /// Parse a persisted kind name
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "smoothstep" => Self::Smoothstep,
            other => Self::Custom(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Smoothstep => "smoothstep",
            Self::Custom(name) => name,
        }
    }
}

/// Connection between two canvas nodes of any variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasEdge {
    /// Edge id
    pub id: String,
    /// Id of the source node
    pub source: String,
    /// Id of the target node
    pub target: String,
    /// How the edge is drawn
    pub kind: EdgeKind,
}

impl CanvasEdge {
    /// Edge with the default kind
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::default(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this edge starts or ends at the node
    #[inline]
    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The note/entity canvas of one investigation
///
/// Node ids are unique. Edges may dangle when loaded from storage, but edges
/// added through this API always connect existing nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotebookDocument {
    version: u64,
    nodes: Vec<CanvasNode>,
    edges: Vec<CanvasEdge>,
    viewport: Viewport,
}

impl NotebookDocument {
    /// Empty canvas at version 0
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a document, keeping the first node for each id
    ///
    /// Returns the document and how many nodes were discarded as duplicates.
    pub(crate) fn from_parts(
        version: u64,
        nodes: Vec<CanvasNode>,
        edges: Vec<CanvasEdge>,
        viewport: Viewport,
    ) -> (Self, usize) {
        let mut seen = std::collections::HashSet::new();
        let total = nodes.len();
        let nodes: Vec<CanvasNode> = nodes
            .into_iter()
            .filter(|node| seen.insert(node.id().to_string()))
            .collect();
        let duplicates = total - nodes.len();
        (Self { version, nodes, edges, viewport }, duplicates)
    }

    /// Optimistic-concurrency version this document is based on
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Adopt a version assigned by the backend
    ///
    /// Only the persistence layer calls this; local edits never bump it.
    #[inline]
    pub fn adopt_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Nodes in insertion order
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[CanvasNode] {
        &self.nodes
    }

    /// Edges in insertion order
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[CanvasEdge] {
        &self.edges
    }

    /// Current pan and zoom
    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Node by id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Note by id, `None` if absent or not a note
    #[must_use]
    pub fn note(&self, id: &str) -> Option<&NoteNode> {
        self.node(id).and_then(CanvasNode::as_note)
    }

    /// Edge by id
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&CanvasEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    /// Whether a node with this id exists
    #[inline]
    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Whether both ends of an edge exist in this document
    #[must_use]
    pub fn is_connected(&self, edge: &CanvasEdge) -> bool {
        self.contains_node(&edge.source) && self.contains_node(&edge.target)
    }

    /// Add an untitled note at `position`, returning its id
    ///
    /// # Errors
    /// `NotebookError::InvalidPosition` for a non-finite position.
    pub fn add_note(&mut self, position: Position) -> Result<String, NotebookError> {
        let id = Uuid::new_v4().to_string();
        check_position(&id, position)?;
        self.nodes.push(NoteNode::new(id.clone(), position).into());
        Ok(id)
    }

    /// Place a reference to `entity` at `position`, returning the node id
    ///
    /// Ids look like `entity-{entity_id}-{8 random hex chars}`, so the same
    /// entity can be placed any number of times.
    ///
    /// # Errors
    /// `NotebookError::InvalidPosition` for a non-finite position.
    pub fn add_entity_ref(&mut self, entity: &EntitySummary, position: Position) -> Result<String, NotebookError> {
        let mut suffix = Uuid::new_v4().simple().to_string();
        suffix.truncate(8);
        let id = format!("entity-{}-{suffix}", entity.id);
        check_position(&id, position)?;
        self.nodes
            .push(EntityRefNode::from_summary(id.clone(), position, entity).into());
        Ok(id)
    }

    /// Append a node built elsewhere
    ///
    /// # Errors
    /// `DuplicateNode` if the id is taken, `InvalidPosition` for a non-finite
    /// position.
    pub fn insert_node(&mut self, node: impl Into<CanvasNode>) -> Result<(), NotebookError> {
        let node = node.into();
        if self.contains_node(node.id()) {
            return Err(NotebookError::DuplicateNode(node.id().to_string()));
        }
        check_position(node.id(), node.position())?;
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node and every edge attached to it
    ///
    /// # Errors
    /// `NotebookError::UnknownNode` if absent.
    pub fn remove_node(&mut self, id: &str) -> Result<CanvasNode, NotebookError> {
        let index = self
            .nodes
            .iter()
            .position(|node| node.id() == id)
            .ok_or_else(|| NotebookError::UnknownNode(id.to_string()))?;
        let removed = self.nodes.remove(index);
        self.edges.retain(|edge| !edge.touches(id));
        Ok(removed)
    }

    /// # Errors
    /// `UnknownNode` if absent, `InvalidPosition` for a non-finite position.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), NotebookError> {
        let node = self.node_mut(id)?;
        check_position(id, position)?;
        node.set_position(position);
        Ok(())
    }

    /// # Errors
    /// `UnknownNode` if absent, `NotANote` for entity references.
    pub fn set_note_title(&mut self, id: &str, title: impl Into<String>) -> Result<(), NotebookError> {
        self.note_mut(id)?.title = title.into();
        Ok(())
    }

    /// # Errors
    /// `UnknownNode` if absent, `NotANote` for entity references.
    pub fn set_note_content(&mut self, id: &str, content: RichText) -> Result<(), NotebookError> {
        self.note_mut(id)?.content = content;
        Ok(())
    }

    /// Connect two existing nodes with a default-kind edge, returning its id
    ///
    /// Connecting the same ordered pair again returns the existing edge.
    ///
    /// # Errors
    /// `NotebookError::UnknownNode` if either endpoint is absent.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<String, NotebookError> {
        for endpoint in [source, target] {
            if !self.contains_node(endpoint) {
                return Err(NotebookError::UnknownNode(endpoint.to_string()));
            }
        }
        if let Some(existing) = self
            .edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
        {
            return Ok(existing.id.clone());
        }

        let mut id = format!("edge-{source}-{target}");
        if self.edge(&id).is_some() {
            // Hyphenated ids can collide across different pairs.
            id = format!("{id}-{}", Uuid::new_v4().simple());
        }
        self.edges.push(CanvasEdge::new(id.clone(), source, target));
        Ok(id)
    }

    /// Append an edge between existing nodes
    ///
    /// # Errors
    /// `UnknownNode` for a missing endpoint, `DuplicateEdge` if the id is taken.
    pub fn insert_edge(&mut self, edge: CanvasEdge) -> Result<(), NotebookError> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.contains_node(endpoint) {
                return Err(NotebookError::UnknownNode(endpoint.clone()));
            }
        }
        if self.edge(&edge.id).is_some() {
            return Err(NotebookError::DuplicateEdge(edge.id));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// # Errors
    /// `NotebookError::UnknownEdge` if absent.
    pub fn remove_edge(&mut self, id: &str) -> Result<CanvasEdge, NotebookError> {
        let index = self
            .edges
            .iter()
            .position(|edge| edge.id == id)
            .ok_or_else(|| NotebookError::UnknownEdge(id.to_string()))?;
        Ok(self.edges.remove(index))
    }

    /// # Errors
    /// `NotebookError::InvalidPosition` if any component is non-finite.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), NotebookError> {
        if !viewport.is_finite() {
            return Err(NotebookError::InvalidPosition(VIEWPORT_SUBJECT.to_string()));
        }
        self.viewport = viewport;
        Ok(())
    }

    /// Entity references whose entity is not in the directory
    pub fn dangling_refs<'a>(
        &'a self,
        directory: &'a EntityDirectory,
    ) -> impl Iterator<Item = &'a EntityRefNode> + 'a {
        self.nodes
            .iter()
            .filter_map(CanvasNode::as_entity_ref)
            .filter(move |entity| entity.resolve(directory).is_none())
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut CanvasNode, NotebookError> {
        self.nodes
            .iter_mut()
            .find(|node| node.id() == id)
            .ok_or_else(|| NotebookError::UnknownNode(id.to_string()))
    }

    fn note_mut(&mut self, id: &str) -> Result<&mut NoteNode, NotebookError> {
        match self.node_mut(id)? {
            CanvasNode::Note(note) => Ok(note),
            CanvasNode::EntityRef(_) => Err(NotebookError::NotANote(id.to_string())),
        }
    }
}

fn check_position(id: &str, position: Position) -> Result<(), NotebookError> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(NotebookError::InvalidPosition(id.to_string()))
    }
}
