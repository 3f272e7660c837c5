//! Testing utilities for the Casebook workspace
//!
//! Shared test backend and fixtures.

#![allow(missing_docs)]

mod backend;
pub mod fixtures;

pub use backend::InMemoryBackend;

use casebook_core::{InvestigationSession, RequestContext, SessionConfig};
use std::sync::Arc;

/// Backend preloaded with [`fixtures::sample_graph`]
#[must_use]
pub fn sample_backend() -> InMemoryBackend {
    let (entities, edges) = fixtures::sample_graph();
    InMemoryBackend::new().with_entities(entities).with_edges(edges)
}

/// Session over `backend` with default configuration
#[must_use]
pub fn setup_test_session(backend: Arc<InMemoryBackend>) -> InvestigationSession {
    setup_test_session_with(backend, SessionConfig::default())
}

#[must_use]
pub fn setup_test_session_with(backend: Arc<InMemoryBackend>, config: SessionConfig) -> InvestigationSession {
    InvestigationSession::new("inv-test", RequestContext::with_bearer("test-token"), backend, config)
}
