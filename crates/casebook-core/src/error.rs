//! Error types for Casebook Core
//!
//! Two layers:
//! - [`BackendError`]: what a backend collaborator reports
//! - [`CasebookError`]: what the session surfaces to the operator, with the
//!   request that failed attached

use casebook_model::QueryError;
use casebook_notebook::NotebookError;
use std::fmt;

/// Inline message shown when a save hit a stale version
pub const CONFLICT_MESSAGE: &str = "Notebook changed elsewhere. Reload the page to sync latest version.";

/// Failure reported by an [`InvestigationBackend`](crate::InvestigationBackend)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Submitted version is stale
    #[error("version conflict: {message}")]
    Conflict { message: String },

    /// Backend unreachable or answered with a non-conflict error
    #[error("transport error (status {status:?}): {}", .message.as_deref().unwrap_or("no message"))]
    Transport {
        /// HTTP status, `None` when no response arrived
        status: Option<u16>,
        /// Backend-provided detail, if any
        message: Option<String>,
    },
}

impl BackendError {
    /// Create conflict error
    #[inline]
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create transport error for a response with a status
    #[inline]
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: Some(message.into()),
        }
    }

    /// Create transport error for a request that got no response
    #[inline]
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: Some(message.into()),
        }
    }
}

/// Backend request a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Expanding an entity's neighborhood
    Expand,
    /// Scanning for duplicate candidates
    Scan,
    /// Merging two entities
    Merge,
    /// Fetching the graph page
    LoadGraph,
    /// Fetching the stored notebook
    LoadNotebook,
    /// Persisting the notebook
    SaveNotebook,
}

impl Operation {
    /// Message shown when the backend gave no usable detail
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::Expand => "Could not expand entity",
            Self::Scan => "Could not load duplicate candidates",
            Self::Merge => "Could not merge entities",
            Self::LoadGraph => "Could not load graph",
            Self::LoadNotebook => "Could not load notebook",
            Self::SaveNotebook => "Could not save notebook",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Scan => "scan",
            Self::Merge => "merge",
            Self::LoadGraph => "load_graph",
            Self::LoadNotebook => "load_notebook",
            Self::SaveNotebook => "save_notebook",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main session error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CasebookError {
    /// Malformed local input; never sent to the backend
    #[error("validation failed: {0}")]
    Validation(String),

    /// Save rejected because the notebook changed elsewhere
    #[error("notebook version conflict: {message}")]
    Conflict { message: String },

    /// Backend unreachable or failed
    #[error("{operation} failed (status {status:?}): {}", .message.as_deref().unwrap_or("no message"))]
    Transport {
        operation: Operation,
        status: Option<u16>,
        message: Option<String>,
    },

    /// Notebook operation before the notebook was opened
    #[error("notebook is not loaded")]
    NotebookNotLoaded,

    /// Local canvas edit could not be applied
    #[error("notebook edit failed: {0}")]
    Notebook(#[from] NotebookError),
}

impl CasebookError {
    /// Create validation error
    #[inline]
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Attach the failing operation to a backend error
    #[must_use]
    pub fn from_backend(operation: Operation, err: BackendError) -> Self {
        match err {
            BackendError::Conflict { message } => Self::Conflict { message },
            BackendError::Transport { status, message } => Self::Transport {
                operation,
                status,
                message,
            },
        }
    }

    /// Inline message for the operator
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Conflict { .. } => CONFLICT_MESSAGE.to_string(),
            Self::Transport {
                operation, message, ..
            } => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(operation.fallback_message())
                .to_string(),
            Self::Validation(message) => message.clone(),
            Self::NotebookNotLoaded => "Notebook is still loading".to_string(),
            Self::Notebook(err) => err.to_string(),
        }
    }

    /// Check if retrying the same request may succeed
    ///
    /// Only transport failures qualify; conflicts need a reload and local
    /// errors need different input.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a version conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<QueryError> for CasebookError {
    fn from(err: QueryError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_asks_for_reload() {
        let err = CasebookError::from_backend(Operation::SaveNotebook, BackendError::conflict("stale"));
        assert!(err.is_conflict());
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), CONFLICT_MESSAGE);
    }

    #[test]
    fn transport_prefers_backend_message() {
        let err = CasebookError::from_backend(Operation::Merge, BackendError::status(400, "target_id must be in source_ids"));
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "target_id must be in source_ids");
    }

    #[test]
    fn transport_falls_back_per_operation() {
        let blank = CasebookError::from_backend(Operation::Scan, BackendError::status(500, "  "));
        assert_eq!(blank.user_message(), "Could not load duplicate candidates");

        let none = CasebookError::from_backend(
            Operation::SaveNotebook,
            BackendError::Transport {
                status: None,
                message: None,
            },
        );
        assert_eq!(none.user_message(), "Could not save notebook");
    }

    #[test]
    fn query_error_is_validation() {
        let err = CasebookError::from(QueryError::ZeroLimit);
        assert!(matches!(err, CasebookError::Validation(_)));
        assert!(!err.is_retryable());
    }
}
