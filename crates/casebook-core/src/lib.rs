//! Casebook Core - investigation session
//!
//! The reconciliation core between an investigation backend and the local
//! models:
//! - Merges neighbor expansions into the entity graph
//! - Reviews duplicate candidates and applies merges
//! - Persists the notebook canvas with debounced, version-checked saves
//! - Surfaces every failure as an inline, operator-readable message
//!
//! # Example
//!
//! ```rust,ignore
//! use casebook_core::{InvestigationSession, RequestContext, SessionConfig};
//! use casebook_notebook::Position;
//! use std::sync::Arc;
//!
//! # async fn example(backend: Arc<dyn casebook_core::InvestigationBackend>) -> Result<(), casebook_core::CasebookError> {
//! let mut session = InvestigationSession::new(
//!     "inv-1",
//!     RequestContext::with_bearer("token"),
//!     backend,
//!     SessionConfig::default(),
//! );
//!
//! session.load_graph().await?;
//! session.expand("person-1").await?;
//!
//! session.open_notebook().await?;
//! let note = session.edit_notebook(|doc| doc.add_note(Position::new(0.0, 0.0)))?;
//! session.link_mention("person-1", &note)?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod autosave;
pub mod backend;
pub mod config;
pub mod context;
pub mod dedupe;
pub mod error;
pub mod session;
pub mod telemetry;

// Re-exports for convenience
pub use autosave::{allowed_transitions, validate_transition, AutoSaveController, SaveState, SaveStatus, TransitionError};
pub use backend::InvestigationBackend;
pub use config::{ConfigError, SessionConfig};
pub use context::RequestContext;
pub use dedupe::{build_merge_request, merged_properties, DuplicateWorkflow, MergeOutcome};
pub use error::{BackendError, CasebookError, Operation, CONFLICT_MESSAGE};
pub use session::{InvestigationSession, NotebookLoad};
pub use telemetry::{TelemetryConfig, TelemetryError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a session
    pub use crate::{
        BackendError, CasebookError, InvestigationBackend, InvestigationSession, RequestContext, SaveState,
        SessionConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
