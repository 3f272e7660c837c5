//! Backend collaborator seam
//!
//! The session talks to the investigation backend only through
//! [`InvestigationBackend`]. `casebook-client` implements it over HTTP;
//! `casebook-test-utils` provides an in-memory implementation.

use crate::context::RequestContext;
use crate::error::BackendError;
use casebook_model::{
    DuplicateCandidate, DuplicateQuery, ExpandPayload, GraphPage, MergeRequest, MergeResponse, NotebookRecord,
    NotebookSave,
};

/// Operations the reconciliation core consumes
///
/// Every call carries the caller's [`RequestContext`]; implementations keep
/// no per-user state of their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InvestigationBackend: Send + Sync {
    /// Fetch an entity with its direct neighbors and connecting edges
    async fn expand_entity(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        entity_id: &str,
    ) -> Result<ExpandPayload, BackendError>;

    /// Scan for likely duplicate entity pairs
    async fn find_duplicate_candidates(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        query: &DuplicateQuery,
    ) -> Result<Vec<DuplicateCandidate>, BackendError>;

    /// Merge source entities into the target
    async fn merge_entities(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        request: &MergeRequest,
    ) -> Result<MergeResponse, BackendError>;

    /// Fetch one page of the whole graph
    async fn fetch_graph(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<GraphPage, BackendError>;

    /// Load the notebook, creating an empty one if none exists
    async fn get_notebook(&self, ctx: &RequestContext, investigation_id: &str) -> Result<NotebookRecord, BackendError>;

    /// Store the canvas if `save.version` is current
    ///
    /// # Errors
    /// `BackendError::Conflict` when the stored version moved on.
    async fn save_notebook(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        save: &NotebookSave,
    ) -> Result<NotebookRecord, BackendError>;
}
