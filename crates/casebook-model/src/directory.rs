//! Ordered lookup of entity summaries

use crate::entity::EntitySummary;
use indexmap::IndexMap;

/// Known entities of one investigation, keyed by id in insertion order
///
/// Built from the graph store and handed to the notebook so mentions can be
/// resolved without the notebook depending on the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDirectory {
    entries: IndexMap<String, EntitySummary>,
}

impl EntityDirectory {
    /// Empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a summary
    pub fn insert(&mut self, summary: EntitySummary) {
        self.entries.insert(summary.id.clone(), summary);
    }

    /// Summary for an entity id
    #[inline]
    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<&EntitySummary> {
        self.entries.get(entity_id)
    }

    /// Whether the entity is known
    #[inline]
    #[must_use]
    pub fn contains(&self, entity_id: &str) -> bool {
        self.entries.contains_key(entity_id)
    }

    /// Summaries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &EntitySummary> {
        self.entries.values()
    }

    /// Number of known entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entity is known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<EntitySummary> for EntityDirectory {
    fn from_iter<I: IntoIterator<Item = EntitySummary>>(iter: I) -> Self {
        let mut directory = Self::new();
        for summary in iter {
            directory.insert(summary);
        }
        directory
    }
}
