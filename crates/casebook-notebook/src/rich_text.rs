//! Rich-text note content
//!
//! Content is the editor's own JSON tree (`{"type":"doc","content":[...]}`).
//! The notebook never interprets formatting; it only needs to find mentions.

use serde_json::{json, Value};

/// Editor document stored inside a note
#[derive(Debug, Clone, PartialEq)]
pub struct RichText(Value);

impl RichText {
    /// Wrap an editor document
    ///
    /// Returns `None` unless `value` is a JSON object.
    #[must_use]
    pub fn from_json(value: Value) -> Option<Self> {
        value.is_object().then_some(Self(value))
    }

    /// Document holding a single empty paragraph
    #[must_use]
    pub fn empty() -> Self {
        Self(json!({ "type": "doc", "content": [{ "type": "paragraph" }] }))
    }

    /// Document with one paragraph of plain text
    #[must_use]
    pub fn paragraph(text: &str) -> Self {
        Self(json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": text }] }]
        }))
    }

    #[inline]
    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn into_json(self) -> Value {
        self.0
    }

    /// Entity ids of every mention in document order
    ///
    /// Repeated mentions of the same entity are all returned.
    #[must_use]
    pub fn mentions(&self) -> Vec<String> {
        let mut found = Vec::new();
        collect_mentions(&self.0, &mut found);
        found
    }
}

impl Default for RichText {
    fn default() -> Self {
        Self::empty()
    }
}

fn collect_mentions(node: &Value, found: &mut Vec<String>) {
    if node.get("type").and_then(Value::as_str) == Some("mention") {
        if let Some(id) = node.pointer("/attrs/id").and_then(Value::as_str) {
            found.push(id.to_string());
        }
    }
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_mentions(child, found);
        }
    }
}
