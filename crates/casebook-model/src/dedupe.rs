//! Duplicate candidates and merge requests

use crate::entity::{Entity, Properties};
use serde::{Deserialize, Serialize};

/// Two entities a scan believes describe the same thing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    /// First entity of the pair
    pub left: Entity,
    /// Second entity of the pair
    pub right: Entity,
    /// Similarity score in `[0, 1]`
    pub similarity: f64,
    /// Backend's explanation of the match
    pub reason: String,
}

impl DuplicateCandidate {
    /// Candidate from its parts
    #[must_use]
    pub fn new(left: Entity, right: Entity, similarity: f64, reason: impl Into<String>) -> Self {
        Self {
            left,
            right,
            similarity,
            reason: reason.into(),
        }
    }

    /// Whether either side of this candidate is the given entity
    #[inline]
    #[must_use]
    pub fn references(&self, entity_id: &str) -> bool {
        self.left.id == entity_id || self.right.id == entity_id
    }
}

/// Parameters of a duplicate scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateQuery {
    /// Restrict to one schema; `None` scans all
    pub schema: Option<String>,
    /// Minimum similarity in `[0, 1]`
    pub threshold: f64,
    /// Maximum number of candidates returned
    pub limit: usize,
}

impl DuplicateQuery {
    /// Scan every schema with the given threshold and limit
    #[inline]
    #[must_use]
    pub fn new(threshold: f64, limit: usize) -> Self {
        Self {
            schema: None,
            threshold,
            limit,
        }
    }

    /// With a schema filter
    ///
    /// The UI's `"all"` choice and blank input both mean no filter.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        let trimmed = schema.trim();
        self.schema = if trimmed.is_empty() || trimmed == "all" {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Check the query before it leaves the client
    ///
    /// # Errors
    /// - `QueryError::ThresholdOutOfRange` if threshold is outside `[0, 1]`
    /// - `QueryError::ZeroLimit` if limit is zero
    pub fn validate(&self) -> Result<(), QueryError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(QueryError::ThresholdOutOfRange(self.threshold));
        }
        if self.limit == 0 {
            return Err(QueryError::ZeroLimit);
        }
        Ok(())
    }
}

/// Invalid duplicate scan parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// Threshold outside `[0, 1]`
    #[error("similarity threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    /// Limit of zero
    #[error("limit must be greater than zero")]
    ZeroLimit,
}

/// Body of a merge call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Every entity taking part in the merge
    pub source_ids: Vec<String>,
    /// Entity that survives; one of `source_ids`
    pub target_id: String,
    /// Properties the survivor ends up with
    pub merged_properties: Properties,
}

/// Result of a merge call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResponse {
    /// The surviving entity with its merged properties
    pub target: Entity,
    /// Entities folded into the target and now gone
    pub merged_source_ids: Vec<String>,
}
