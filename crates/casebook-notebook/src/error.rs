//! Notebook editing errors

/// A document operation that could not be applied
///
/// The document is left unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotebookError {
    /// Node id already present
    #[error("node '{0}' already exists")]
    DuplicateNode(String),

    /// No node with this id
    #[error("node '{0}' not found")]
    UnknownNode(String),

    /// Node exists but is an entity reference, not a note
    #[error("node '{0}' is not a note")]
    NotANote(String),

    /// Edge id already present
    #[error("edge '{0}' already exists")]
    DuplicateEdge(String),

    /// No edge with this id
    #[error("edge '{0}' not found")]
    UnknownEdge(String),

    /// NaN or infinite coordinate for this node, or for the viewport
    #[error("non-finite coordinates for '{0}'")]
    InvalidPosition(String),
}

impl NotebookError {
    /// Id of the node or edge the error refers to, `"viewport"` for viewport
    /// errors
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::DuplicateNode(id)
            | Self::UnknownNode(id)
            | Self::NotANote(id)
            | Self::DuplicateEdge(id)
            | Self::UnknownEdge(id)
            | Self::InvalidPosition(id) => id,
        }
    }
}
