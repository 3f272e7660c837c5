//! Mention linking between notes and the entity graph

use crate::document::{CanvasEdge, CanvasNode, NotebookDocument};
use casebook_model::{EntityDirectory, EntitySummary};

/// Number of suggestions offered while typing a mention
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Nodes created by one mention activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionLink {
    /// Id of the new entity reference node
    pub entity_node_id: String,
    /// Id of the edge from the note to it
    pub edge_id: String,
}

/// Places an entity reference next to the note that mentions it
///
/// # Characteristics
/// - No-op unless the source is a note and the entity is known
/// - Not idempotent: every activation adds a fresh node and edge, even when
///   the entity is already on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MentionLinker {
    offset_x: f64,
    offset_y: f64,
}

impl MentionLinker {
    /// Linker using the standard `(+360, +40)` placement
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_offset(360.0, 40.0)
    }

    /// Linker placing nodes at the given offset from the note
    #[inline]
    #[must_use]
    pub const fn with_offset(offset_x: f64, offset_y: f64) -> Self {
        Self { offset_x, offset_y }
    }

    /// Handle a click on a mention of `entity_id` inside note `source_note_id`
    ///
    /// Returns `None` and leaves the document untouched when either id does
    /// not resolve.
    pub fn link(
        &self,
        document: &mut NotebookDocument,
        directory: &EntityDirectory,
        entity_id: &str,
        source_note_id: &str,
    ) -> Option<MentionLink> {
        let Some(CanvasNode::Note(source)) = document.node(source_note_id) else {
            tracing::debug!(source_note_id, "mention source is not a note");
            return None;
        };
        let Some(entity) = directory.get(entity_id) else {
            tracing::debug!(entity_id, "mention target is not a known entity");
            return None;
        };

        let position = source.position.offset(self.offset_x, self.offset_y);
        let entity_node_id = match document.add_entity_ref(entity, position) {
            Ok(id) => id,
            Err(err) => {
                tracing::debug!(%err, "mention placement out of range");
                return None;
            }
        };
        let edge_id = format!("edge-{source_note_id}-{entity_node_id}");

        // Endpoints exist and the node id is fresh; a rejection means a corrupt document.
        if let Err(err) = document.insert_edge(CanvasEdge::new(edge_id.clone(), source_note_id, &entity_node_id)) {
            tracing::warn!(%err, "mention edge rejected");
            let _ = document.remove_node(&entity_node_id);
            return None;
        }

        tracing::debug!(entity_id, source_note_id, %entity_node_id, "mention linked");
        Some(MentionLink { entity_node_id, edge_id })
    }
}

impl Default for MentionLinker {
    fn default() -> Self {
        Self::new()
    }
}

/// Entities whose label or id contains `query`, case-insensitively
///
/// Results follow directory order and stop at `limit`. An empty query
/// matches everything.
#[must_use]
pub fn suggest_mentions<'a>(directory: &'a EntityDirectory, query: &str, limit: usize) -> Vec<&'a EntitySummary> {
    let term = query.to_lowercase();
    directory
        .iter()
        .filter(|entity| entity.label.to_lowercase().contains(&term) || entity.id.to_lowercase().contains(&term))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EdgeKind, NoteNode, Position};
    use pretty_assertions::assert_eq;

    fn directory() -> EntityDirectory {
        [
            EntitySummary::new("p1", "Ada Lovelace", "Person"),
            EntitySummary::new("o1", "Analytical Engines Ltd", "Company"),
        ]
        .into_iter()
        .collect()
    }

    fn doc_with_note() -> NotebookDocument {
        let mut doc = NotebookDocument::new();
        doc.insert_node(NoteNode::new("n1", Position::new(100.0, 50.0))).unwrap();
        doc
    }

    #[test]
    fn link_places_node_at_offset_and_connects() {
        let mut doc = doc_with_note();
        let link = MentionLinker::new().link(&mut doc, &directory(), "p1", "n1").unwrap();

        let node = doc.node(&link.entity_node_id).and_then(CanvasNode::as_entity_ref).unwrap();
        assert_eq!(node.position, Position::new(460.0, 90.0));
        assert_eq!(node.label, "Ada Lovelace");
        assert_eq!(node.schema, "Person");

        let edge = doc.edge(&link.edge_id).unwrap();
        assert_eq!(edge.source, "n1");
        assert_eq!(edge.target, link.entity_node_id);
        assert_eq!(edge.kind, EdgeKind::Smoothstep);
        assert_eq!(link.edge_id, format!("edge-n1-{}", link.entity_node_id));
    }

    #[test]
    fn unknown_entity_or_note_is_noop() {
        let mut doc = doc_with_note();
        let before = doc.clone();
        let linker = MentionLinker::new();

        assert!(linker.link(&mut doc, &directory(), "ghost", "n1").is_none());
        assert!(linker.link(&mut doc, &directory(), "p1", "missing").is_none());
        assert_eq!(doc, before);
    }

    #[test]
    fn entity_ref_source_is_noop() {
        let mut doc = doc_with_note();
        let linker = MentionLinker::new();
        let link = linker.link(&mut doc, &directory(), "p1", "n1").unwrap();
        let before = doc.clone();

        assert!(linker.link(&mut doc, &directory(), "o1", &link.entity_node_id).is_none());
        assert_eq!(doc, before);
    }

    #[test]
    fn placement_overflow_is_noop() {
        let mut doc = doc_with_note();
        doc.move_node("n1", Position::new(f64::MAX, 0.0)).unwrap();
        let before = doc.clone();

        let linker = MentionLinker::with_offset(f64::MAX, 0.0);
        assert!(linker.link(&mut doc, &directory(), "p1", "n1").is_none());
        assert_eq!(doc, before);
    }

    #[test]
    fn repeated_activation_adds_new_pair() {
        let mut doc = doc_with_note();
        let linker = MentionLinker::new();
        let first = linker.link(&mut doc, &directory(), "p1", "n1").unwrap();
        let second = linker.link(&mut doc, &directory(), "p1", "n1").unwrap();

        assert_ne!(first.entity_node_id, second.entity_node_id);
        assert_eq!(doc.nodes().len(), 3);
        assert_eq!(doc.edges().len(), 2);
    }

    #[test]
    fn suggestions_match_label_or_id() {
        let directory = directory();
        let labels = |query: &str| -> Vec<String> {
            suggest_mentions(&directory, query, DEFAULT_SUGGESTION_LIMIT)
                .into_iter()
                .map(|e| e.label.clone())
                .collect()
        };

        assert_eq!(labels("ANALYT"), ["Analytical Engines Ltd"]);
        assert_eq!(labels("p1"), ["Ada Lovelace"]);
        assert_eq!(labels("").len(), 2);
    }

    #[test]
    fn suggestions_stop_at_limit() {
        let directory: EntityDirectory = (0..20)
            .map(|i| EntitySummary::new(format!("e{i}"), format!("Entity {i}"), "Thing"))
            .collect();
        let hits = suggest_mentions(&directory, "entity", DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(hits.len(), 8);
        assert_eq!(hits[0].id, "e0");
    }
}
