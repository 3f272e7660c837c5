//! Entities, relationships and entity summaries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Multi-valued properties keyed by property name
///
/// A `BTreeMap` keeps serialization deterministic, which the notebook
/// content hash and the test assertions both rely on.
pub type Properties = BTreeMap<String, Vec<String>>;

/// A typed record in the investigation graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique within one investigation
    pub id: String,
    /// Type tag such as `Person` or `Organization`
    pub schema: String,
    /// Multi-valued string properties keyed by name
    #[serde(default)]
    pub properties: Properties,
}

impl Entity {
    /// Create an entity without properties
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema: schema.into(),
            properties: Properties::new(),
        }
    }

    /// With a property, replacing any previous values under `name`
    #[must_use]
    pub fn with_property<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// First value of a property, if any
    #[inline]
    #[must_use]
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Display label for this entity, see [`entity_label`]
    #[inline]
    #[must_use]
    pub fn label(&self) -> String {
        entity_label(&self.id, &self.properties)
    }

    /// Summary used by mention lookups
    #[must_use]
    pub fn summary(&self) -> EntitySummary {
        EntitySummary::new(self.id.clone(), self.label(), self.schema.clone())
    }
}

/// Display label: first non-blank `name` value, falling back to the id
#[must_use]
pub fn entity_label(id: &str, properties: &Properties) -> String {
    properties
        .get("name")
        .and_then(|values| values.iter().find(|name| !name.trim().is_empty()))
        .map_or_else(|| id.to_string(), Clone::clone)
}

/// A typed relationship as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Backend id of the relationship
    pub id: String,
    /// Id of the source entity
    pub source: String,
    /// Id of the target entity
    pub target: String,
    /// Relationship type, blank when untyped
    #[serde(default)]
    pub schema: String,
    /// Relationship properties
    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    /// Create an untyped edge between two entity ids
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            schema: String::new(),
            properties: Properties::new(),
        }
    }

    /// With relationship type
    #[inline]
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }
}

/// Minimal view of an entity: what a mention needs to place a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Entity id
    pub id: String,
    /// Display label
    pub label: String,
    /// Entity type tag
    pub schema: String,
}

impl EntitySummary {
    /// Summary from its parts
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            schema: schema.into(),
        }
    }
}
