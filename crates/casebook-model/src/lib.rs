//! Casebook Model
//!
//! Data types exchanged with the investigation backend.
//!
//! # Core Concepts
//!
//! - [`Entity`]: typed record with multi-valued string properties
//! - [`Edge`]: typed relationship between two entity ids
//! - [`GraphNode`] / [`GraphEdge`]: display projections held by the graph store
//! - [`DuplicateCandidate`]: a pair of entities a scan believes are the same
//! - [`NotebookRecord`]: persisted notebook with its optimistic-concurrency version
//!
//! Everything here is plain data. Reconciliation lives in `casebook-graph`,
//! `casebook-notebook` and `casebook-core`.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod dedupe;
mod directory;
mod entity;
mod graph;
mod notebook;

pub use dedupe::{DuplicateCandidate, DuplicateQuery, MergeRequest, MergeResponse, QueryError};
pub use directory::EntityDirectory;
pub use entity::{entity_label, Edge, Entity, EntitySummary, Properties};
pub use graph::{ExpandPayload, GraphEdge, GraphNode, GraphPage};
pub use notebook::{NotebookRecord, NotebookSave};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
