//! One investigation's working state
//!
//! [`InvestigationSession`] ties the local models to the backend: the entity
//! graph, the duplicate review list and the open notebook with its autosave
//! controller. Every backend failure leaves the local state exactly as it was
//! before the call.

use crate::autosave::{AutoSaveController, SaveStatus};
use crate::backend::InvestigationBackend;
use crate::config::SessionConfig;
use crate::context::RequestContext;
use crate::dedupe::{DuplicateWorkflow, MergeOutcome};
use crate::error::{CasebookError, Operation};
use casebook_graph::{ExpansionReconciler, ExpansionSummary, GraphStore};
use casebook_model::{DuplicateCandidate, DuplicateQuery, EntitySummary};
use casebook_notebook::{
    suggest_mentions, DocumentCodec, MentionLink, MentionLinker, NotebookDocument, NotebookError,
    DEFAULT_SUGGESTION_LIMIT,
};
use std::sync::Arc;

/// Result of opening or reloading the notebook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotebookLoad {
    /// Version of the stored notebook
    pub version: u64,
    /// Stored nodes that could not be hydrated
    pub dropped_nodes: usize,
    /// Stored edges that could not be hydrated
    pub dropped_edges: usize,
}

struct OpenNotebook {
    document: NotebookDocument,
    autosave: AutoSaveController,
}

impl OpenNotebook {
    /// Bring the document up to the version of the last successful save
    fn sync_version(&mut self) -> &mut NotebookDocument {
        self.document.adopt_version(self.autosave.version());
        &mut self.document
    }
}

/// Session scope of one investigation view
///
/// Graph and duplicate state is owned here and discarded on drop; the
/// notebook's autosave is shut down on [`close`](Self::close) or drop.
pub struct InvestigationSession {
    investigation_id: String,
    context: RequestContext,
    backend: Arc<dyn InvestigationBackend>,
    config: SessionConfig,
    graph: GraphStore,
    duplicates: DuplicateWorkflow,
    notebook: Option<OpenNotebook>,
    codec: DocumentCodec,
    linker: MentionLinker,
}

impl InvestigationSession {
    /// Create a session; nothing is fetched until asked
    #[must_use]
    pub fn new(
        investigation_id: impl Into<String>,
        context: RequestContext,
        backend: Arc<dyn InvestigationBackend>,
        config: SessionConfig,
    ) -> Self {
        let linker = config.mention_linker();
        Self {
            investigation_id: investigation_id.into(),
            context,
            backend,
            config,
            graph: GraphStore::new(),
            duplicates: DuplicateWorkflow::new(),
            notebook: None,
            codec: DocumentCodec::new(),
            linker,
        }
    }

    /// Investigation this session works on
    #[inline]
    #[must_use]
    pub fn investigation_id(&self) -> &str {
        &self.investigation_id
    }

    /// Session settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Entity graph loaded so far
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Duplicate pairs awaiting review
    #[inline]
    #[must_use]
    pub fn duplicate_candidates(&self) -> &[DuplicateCandidate] {
        self.duplicates.candidates()
    }

    // ------------------------------------------------------------------
    // Graph
    // ------------------------------------------------------------------

    /// Fetch the first page of the graph into the store
    ///
    /// # Errors
    /// `Transport` tagged `LoadGraph`; the store is unchanged.
    pub async fn load_graph(&mut self) -> Result<(), CasebookError> {
        let page = self
            .backend
            .fetch_graph(&self.context, &self.investigation_id, 0, self.config.graph_page_limit)
            .await
            .map_err(|err| {
                tracing::error!(%err, investigation_id = %self.investigation_id, "graph load failed");
                CasebookError::from_backend(Operation::LoadGraph, err)
            })?;

        let truncated = page.total_nodes > page.nodes.len();
        self.graph.replace_page(page);
        if truncated {
            tracing::warn!(
                loaded = self.graph.node_count(),
                limit = self.config.graph_page_limit,
                "graph larger than one page; showing first page only"
            );
        }
        Ok(())
    }

    /// Re-fetch the graph, typically after a merge marked it stale
    ///
    /// # Errors
    /// Same as [`load_graph`](Self::load_graph); the store keeps its stale flag.
    pub async fn refresh_graph(&mut self) -> Result<(), CasebookError> {
        self.load_graph().await
    }

    /// Merge an entity and its direct neighbors into the graph
    ///
    /// # Errors
    /// `Validation` for a blank id (nothing is sent), `Transport` tagged
    /// `Expand` if the request fails. The store is unchanged on error.
    pub async fn expand(&mut self, entity_id: &str) -> Result<ExpansionSummary, CasebookError> {
        let entity_id = entity_id.trim();
        if entity_id.is_empty() {
            return Err(CasebookError::validation("entity id must not be empty"));
        }

        let payload = self
            .backend
            .expand_entity(&self.context, &self.investigation_id, entity_id)
            .await
            .map_err(|err| {
                tracing::error!(%err, entity_id, "expand failed");
                CasebookError::from_backend(Operation::Expand, err)
            })?;

        Ok(ExpansionReconciler::new().apply(&mut self.graph, &payload))
    }

    // ------------------------------------------------------------------
    // Duplicates
    // ------------------------------------------------------------------

    /// Replace the duplicate candidates with a fresh scan
    ///
    /// # Errors
    /// See [`DuplicateWorkflow::scan`].
    pub async fn scan_duplicates(&mut self, query: &DuplicateQuery) -> Result<usize, CasebookError> {
        self.duplicates
            .scan(self.backend.as_ref(), &self.context, &self.investigation_id, query)
            .await
    }

    /// Scan with the configured threshold and limit over all schemas
    ///
    /// # Errors
    /// See [`DuplicateWorkflow::scan`].
    pub async fn scan_default_duplicates(&mut self) -> Result<usize, CasebookError> {
        let query = self.config.duplicate_query();
        self.scan_duplicates(&query).await
    }

    /// Merge a candidate pair, then refresh the graph
    ///
    /// The graph is marked stale as soon as the merge succeeds. A failed
    /// refresh is logged and leaves it stale; the merge itself still counts.
    ///
    /// # Errors
    /// See [`DuplicateWorkflow::apply_merge`].
    pub async fn merge_duplicate(
        &mut self,
        candidate: &DuplicateCandidate,
        target_id: &str,
    ) -> Result<MergeOutcome, CasebookError> {
        let outcome = self
            .duplicates
            .apply_merge(self.backend.as_ref(), &self.context, &self.investigation_id, candidate, target_id)
            .await?;

        self.graph.mark_stale();
        if let Err(err) = self.refresh_graph().await {
            tracing::warn!(%err, "graph refresh after merge failed; graph left stale");
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Notebook
    // ------------------------------------------------------------------

    /// Load the notebook and start autosave
    ///
    /// Opening again behaves like [`reload_notebook`](Self::reload_notebook).
    ///
    /// # Errors
    /// `Transport` tagged `LoadNotebook`; an already open notebook is kept.
    pub async fn open_notebook(&mut self) -> Result<NotebookLoad, CasebookError> {
        let record = self
            .backend
            .get_notebook(&self.context, &self.investigation_id)
            .await
            .map_err(|err| {
                tracing::error!(%err, investigation_id = %self.investigation_id, "notebook load failed");
                CasebookError::from_backend(Operation::LoadNotebook, err)
            })?;

        let report = self.codec.hydrate(&record.canvas_doc, record.version);
        let load = NotebookLoad {
            version: record.version,
            dropped_nodes: report.dropped_nodes,
            dropped_edges: report.dropped_edges,
        };
        // Hash what was hydrated, so dropped entries do not count as an edit.
        let saved_hash = self.codec.hash(&report.document);

        match self.notebook.as_mut() {
            Some(open) => {
                open.autosave.reload(record.version, saved_hash);
                open.document = report.document;
            }
            None => {
                let autosave = AutoSaveController::new(
                    Arc::clone(&self.backend),
                    self.context.clone(),
                    self.investigation_id.clone(),
                    self.config.autosave_debounce(),
                    record.version,
                    saved_hash,
                );
                self.notebook = Some(OpenNotebook {
                    document: report.document,
                    autosave,
                });
            }
        }
        tracing::info!(version = load.version, "notebook opened");
        Ok(load)
    }

    /// Discard local notebook state and adopt the stored one
    ///
    /// The only way out of a save conflict.
    ///
    /// # Errors
    /// Same as [`open_notebook`](Self::open_notebook).
    pub async fn reload_notebook(&mut self) -> Result<NotebookLoad, CasebookError> {
        self.open_notebook().await
    }

    /// The open notebook, `None` before [`open_notebook`](Self::open_notebook)
    ///
    /// Saves complete in the background, so the document's version is caught
    /// up with the autosave controller on every read.
    pub fn notebook(&mut self) -> Option<&NotebookDocument> {
        self.notebook.as_mut().map(|open| &*open.sync_version())
    }

    /// Apply a structural edit and schedule a save
    ///
    /// The change is reported to autosave even when `edit` fails part-way.
    ///
    /// # Errors
    /// `NotebookNotLoaded` before [`open_notebook`](Self::open_notebook),
    /// `Notebook` for a rejected edit.
    pub fn edit_notebook<T, F>(&mut self, edit: F) -> Result<T, CasebookError>
    where
        F: FnOnce(&mut NotebookDocument) -> Result<T, NotebookError>,
    {
        let open = self.notebook.as_mut().ok_or(CasebookError::NotebookNotLoaded)?;
        let result = edit(open.sync_version());
        open.autosave.notify_change(&open.document);
        Ok(result?)
    }

    /// Place a linked entity node next to the note that mentions it
    ///
    /// `Ok(None)` when the entity is not in the graph or the note is unknown.
    ///
    /// # Errors
    /// `NotebookNotLoaded` before the notebook is open.
    pub fn link_mention(&mut self, entity_id: &str, note_id: &str) -> Result<Option<MentionLink>, CasebookError> {
        let open = self.notebook.as_mut().ok_or(CasebookError::NotebookNotLoaded)?;
        let directory = self.graph.entity_directory();
        let link = self.linker.link(open.sync_version(), &directory, entity_id, note_id);
        if link.is_some() {
            open.autosave.notify_change(&open.document);
        }
        Ok(link)
    }

    /// Entities offered while typing a mention
    #[must_use]
    pub fn suggest_mentions(&self, query: &str) -> Vec<EntitySummary> {
        let directory = self.graph.entity_directory();
        suggest_mentions(&directory, query, DEFAULT_SUGGESTION_LIMIT)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Save pending notebook edits immediately
    ///
    /// # Errors
    /// `NotebookNotLoaded`, or see [`AutoSaveController::save_now`].
    pub async fn save_notebook_now(&mut self) -> Result<(), CasebookError> {
        let open = self.notebook.as_mut().ok_or(CasebookError::NotebookNotLoaded)?;
        open.autosave.save_now().await?;
        open.sync_version();
        Ok(())
    }

    /// Autosave status, `None` while no notebook is open
    #[must_use]
    pub fn notebook_status(&self) -> Option<SaveStatus> {
        self.notebook.as_ref().map(|open| open.autosave.status())
    }

    /// Tear down: cancel the pending save and drop local state
    pub fn close(&mut self) {
        if let Some(open) = self.notebook.take() {
            let status = open.autosave.status();
            if status.has_unsaved_changes {
                tracing::warn!(state = %status.state, "closing notebook with unsaved changes");
            }
            open.autosave.shutdown();
        }
        tracing::debug!(investigation_id = %self.investigation_id, "session closed");
    }
}

impl Drop for InvestigationSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for InvestigationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvestigationSession")
            .field("investigation_id", &self.investigation_id)
            .field("context", &self.context)
            .field("nodes", &self.graph.node_count())
            .field("candidates", &self.duplicates.candidates().len())
            .field("notebook_open", &self.notebook.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::SaveState;
    use crate::backend::MockInvestigationBackend;
    use crate::error::BackendError;
    use casebook_model::{Entity, ExpandPayload, GraphPage, NotebookRecord};
    use casebook_notebook::Position;
    use serde_json::json;

    fn session(backend: MockInvestigationBackend) -> InvestigationSession {
        InvestigationSession::new("inv", RequestContext::anonymous(), Arc::new(backend), SessionConfig::default())
    }

    #[tokio::test]
    async fn blank_entity_id_is_not_sent() {
        let mut backend = MockInvestigationBackend::new();
        backend.expect_expand_entity().never();

        let err = session(backend).expand("  ").await.unwrap_err();
        assert!(matches!(err, CasebookError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_expand_leaves_graph_unchanged() {
        let mut backend = MockInvestigationBackend::new();
        backend
            .expect_expand_entity()
            .withf(|_, _, id| id == "p1")
            .times(1)
            .returning(|_, _, _| Ok(ExpandPayload::new(Entity::new("p1", "Person"))));
        backend
            .expect_expand_entity()
            .withf(|_, _, id| id == "p2")
            .returning(|_, _, _| Err(BackendError::status(500, "")));

        let mut session = session(backend);
        session.expand("p1").await.unwrap();
        let err = session.expand("p2").await.unwrap_err();

        assert_eq!(err.user_message(), "Could not expand entity");
        assert_eq!(session.graph().node_count(), 1);
    }

    #[tokio::test]
    async fn load_graph_uses_configured_page() {
        let mut backend = MockInvestigationBackend::new();
        backend
            .expect_fetch_graph()
            .withf(|_, _, skip, limit| *skip == 0 && *limit == 500)
            .returning(|_, _, _, _| {
                Ok(GraphPage {
                    nodes: vec![],
                    edges: vec![],
                    total_nodes: 0,
                    total_edges: 0,
                })
            });

        let mut session = session(backend);
        session.load_graph().await.unwrap();
        assert!(session.graph().is_empty());
        assert!(!session.graph().is_stale());
    }

    #[test]
    fn edits_require_open_notebook() {
        let mut session = session(MockInvestigationBackend::new());
        let err = session.edit_notebook(|doc| doc.add_note(Position::default())).unwrap_err();
        assert_eq!(err, CasebookError::NotebookNotLoaded);
        assert!(session.notebook_status().is_none());
    }

    #[tokio::test]
    async fn open_reports_dropped_entries() {
        let mut backend = MockInvestigationBackend::new();
        backend.expect_get_notebook().returning(|_, _| {
            Ok(NotebookRecord::new(
                4,
                json!({"nodes": [{"id": "n1", "type": "note"}, 7], "edges": [{"id": "e1"}]}),
            ))
        });

        let mut session = session(backend);
        let load = session.open_notebook().await.unwrap();

        assert_eq!(
            load,
            NotebookLoad {
                version: 4,
                dropped_nodes: 1,
                dropped_edges: 1,
            }
        );
        let status = session.notebook_status().unwrap();
        assert_eq!(status.state, SaveState::Idle);
        assert!(!status.has_unsaved_changes);
    }

    #[tokio::test]
    async fn rejected_edit_surfaces_notebook_error() {
        let mut backend = MockInvestigationBackend::new();
        backend
            .expect_get_notebook()
            .returning(|_, _| Ok(NotebookRecord::new(1, json!({}))));

        let mut session = session(backend);
        session.open_notebook().await.unwrap();
        let err = session
            .edit_notebook(|doc| doc.move_node("missing", Position::default()))
            .unwrap_err();

        assert!(matches!(err, CasebookError::Notebook(NotebookError::UnknownNode(_))));
        assert_eq!(session.notebook_status().unwrap().state, SaveState::Idle);
        session.close();
    }
}
