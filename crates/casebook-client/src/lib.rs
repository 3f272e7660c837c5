//! Casebook Client - HTTP investigation backend
//!
//! [`HttpBackend`] implements [`casebook_core::InvestigationBackend`] against
//! the investigation REST API.
//!
//! # Status mapping
//!
//! | Response | Error |
//! |---|---|
//! | 2xx | none |
//! | 409 | `BackendError::Conflict` |
//! | other | `BackendError::Transport` with status and body detail |
//! | no response | `BackendError::Transport` without status |
//!
//! # Example
//!
//! ```rust,ignore
//! use casebook_client::{HttpBackend, HttpBackendConfig};
//! use casebook_core::{InvestigationSession, RequestContext, SessionConfig};
//! use std::sync::Arc;
//!
//! let backend = HttpBackend::new(HttpBackendConfig::from_env())?;
//! let session = InvestigationSession::new(
//!     "inv-1",
//!     RequestContext::with_bearer(token),
//!     Arc::new(backend),
//!     SessionConfig::default(),
//! );
//! ```

#![warn(unreachable_pub)]

mod backend;
mod config;

pub use backend::HttpBackend;
pub use config::{ClientError, ClientResult, HttpBackendConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
