//! Persisted notebook envelope
//!
//! The canvas itself travels as untrusted JSON; `casebook-notebook` owns its
//! hydration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notebook as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookRecord {
    /// Optimistic-concurrency token, assigned by the backend only
    pub version: u64,
    /// Persisted canvas; may be absent or malformed
    #[serde(default)]
    pub canvas_doc: Value,
    /// Owning investigation, when echoed back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_id: Option<String>,
    /// First save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Latest save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotebookRecord {
    /// Record without metadata
    #[inline]
    #[must_use]
    pub fn new(version: u64, canvas_doc: Value) -> Self {
        Self {
            version,
            canvas_doc,
            investigation_id: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Body of a save call: the version the edits were based on plus the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookSave {
    /// Version the edits were based on
    pub version: u64,
    /// Serialized canvas
    pub canvas_doc: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tolerates_missing_canvas() {
        let record: NotebookRecord = serde_json::from_str(r#"{"version": 3}"#).unwrap();
        assert_eq!(record.version, 3);
        assert!(record.canvas_doc.is_null());
    }

    #[test]
    fn record_reads_server_timestamps() {
        let record: NotebookRecord = serde_json::from_str(
            r#"{"investigation_id":"inv-1","version":1,"canvas_doc":{},
                "created_at":"2024-05-01T10:00:00Z","updated_at":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(record.investigation_id.as_deref(), Some("inv-1"));
        assert!(record.created_at.is_some());
    }
}
