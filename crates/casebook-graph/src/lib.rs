//! Casebook Graph
//!
//! The canonical in-memory entity graph of one investigation.
//!
//! # Core Concepts
//!
//! - [`GraphStore`]: id-keyed maps of nodes and edges with idempotent upsert
//! - [`ExpansionReconciler`]: merges a neighbor expansion into the store
//! - [`GraphFilter`] / [`GraphView`]: the renderable subset of a store
//!
//! # Example
//!
//! ```rust
//! use casebook_graph::{ExpansionReconciler, GraphStore};
//! use casebook_model::{Edge, Entity, ExpandPayload};
//!
//! let mut store = GraphStore::new();
//! let payload = ExpandPayload::new(Entity::new("p1", "Person"))
//!     .with_neighbor(Entity::new("p2", "Person"))
//!     .with_edge(Edge::new("e1", "p1", "p2"));
//!
//! ExpansionReconciler::new().apply(&mut store, &payload);
//! ExpansionReconciler::new().apply(&mut store, &payload);
//!
//! assert_eq!(store.node_count(), 2);
//! assert_eq!(store.edge_count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod expansion;
mod store;
mod view;

pub use expansion::{ExpansionPatch, ExpansionReconciler, ExpansionSummary};
pub use store::GraphStore;
pub use view::{GraphFilter, GraphView};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
