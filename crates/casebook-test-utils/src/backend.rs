//! In-memory investigation backend

use casebook_core::{merged_properties, BackendError, InvestigationBackend, Operation, RequestContext};
use casebook_model::{
    DuplicateCandidate, DuplicateQuery, Edge, Entity, ExpandPayload, GraphEdge, GraphNode, GraphPage, MergeRequest,
    MergeResponse, NotebookRecord, NotebookSave,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Default)]
struct State {
    entities: Vec<Entity>,
    edges: Vec<Edge>,
    candidates: Vec<DuplicateCandidate>,
    notebook: Option<NotebookRecord>,
    failures: HashMap<Operation, VecDeque<BackendError>>,
    calls: HashMap<Operation, usize>,
    saves: Vec<NotebookSave>,
}

impl State {
    fn begin(&mut self, operation: Operation) -> Result<(), BackendError> {
        *self.calls.entry(operation).or_default() += 1;
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => {
                tracing::debug!(%operation, %err, "scripted failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn notebook_mut(&mut self) -> &mut NotebookRecord {
        self.notebook.get_or_insert_with(|| {
            let mut record = NotebookRecord::new(1, json!({}));
            record.created_at = Some(Utc::now());
            record.updated_at = record.created_at;
            record
        })
    }
}

/// Backend with the server's real semantics, kept in memory
///
/// # Characteristics
/// - Notebook saves use optimistic concurrency: a save naming the stored
///   version is accepted and bumps it, anything else is a conflict
/// - Failures can be scripted per operation; each fires once
/// - Saves can be held in flight with [`hold_saves`](Self::hold_saves)
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    save_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With entities available for expansion and graph fetches
    #[must_use]
    pub fn with_entities<I>(self, entities: I) -> Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.state.lock().entities.extend(entities);
        self
    }

    #[must_use]
    pub fn with_edges<I>(self, edges: I) -> Self
    where
        I: IntoIterator<Item = Edge>,
    {
        self.state.lock().edges.extend(edges);
        self
    }

    /// With the pairs a duplicate scan can return
    #[must_use]
    pub fn with_candidates<I>(self, candidates: I) -> Self
    where
        I: IntoIterator<Item = DuplicateCandidate>,
    {
        self.state.lock().candidates.extend(candidates);
        self
    }

    /// With an existing notebook
    #[must_use]
    pub fn with_notebook(self, version: u64, canvas_doc: Value) -> Self {
        self.state.lock().notebook = Some(NotebookRecord::new(version, canvas_doc));
        self
    }

    /// Make the next call of `operation` fail with `err`
    pub fn fail_next(&self, operation: Operation, err: BackendError) {
        self.state
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    /// Number of calls of `operation` so far, including failed ones
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.state.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Every save request received, in order
    #[must_use]
    pub fn saves(&self) -> Vec<NotebookSave> {
        self.state.lock().saves.clone()
    }

    #[must_use]
    pub fn stored_notebook(&self) -> Option<NotebookRecord> {
        self.state.lock().notebook.clone()
    }

    #[must_use]
    pub fn entity(&self, id: &str) -> Option<Entity> {
        self.state.lock().entities.iter().find(|e| e.id == id).cloned()
    }

    /// Simulate a save from another session
    pub fn bump_notebook_version(&self) -> u64 {
        let mut state = self.state.lock();
        let record = state.notebook_mut();
        record.version += 1;
        record.updated_at = Some(Utc::now());
        record.version
    }

    /// Keep subsequent saves waiting until [`release_saves`](Self::release_saves)
    pub fn hold_saves(&self) {
        *self.save_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let every held save proceed
    pub fn release_saves(&self) {
        if let Some(gate) = self.save_gate.lock().take() {
            gate.close();
        }
    }
}

#[async_trait::async_trait]
impl InvestigationBackend for InMemoryBackend {
    async fn expand_entity(
        &self,
        _ctx: &RequestContext,
        _investigation_id: &str,
        entity_id: &str,
    ) -> Result<ExpandPayload, BackendError> {
        let mut state = self.state.lock();
        state.begin(Operation::Expand)?;

        let entity = state
            .entities
            .iter()
            .find(|e| e.id == entity_id)
            .cloned()
            .ok_or_else(|| BackendError::status(404, "Entity not found"))?;

        let edges: Vec<Edge> = state
            .edges
            .iter()
            .filter(|edge| edge.source == entity_id || edge.target == entity_id)
            .cloned()
            .collect();
        let neighbors = state
            .entities
            .iter()
            .filter(|e| e.id != entity_id && edges.iter().any(|edge| edge.source == e.id || edge.target == e.id))
            .cloned()
            .collect();

        Ok(ExpandPayload {
            entity,
            neighbors,
            edges,
        })
    }

    async fn find_duplicate_candidates(
        &self,
        _ctx: &RequestContext,
        _investigation_id: &str,
        query: &DuplicateQuery,
    ) -> Result<Vec<DuplicateCandidate>, BackendError> {
        let mut state = self.state.lock();
        state.begin(Operation::Scan)?;

        Ok(state
            .candidates
            .iter()
            .filter(|c| c.similarity >= query.threshold)
            .filter(|c| {
                query
                    .schema
                    .as_deref()
                    .map_or(true, |schema| c.left.schema == schema && c.right.schema == schema)
            })
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn merge_entities(
        &self,
        _ctx: &RequestContext,
        _investigation_id: &str,
        request: &MergeRequest,
    ) -> Result<MergeResponse, BackendError> {
        let mut state = self.state.lock();
        state.begin(Operation::Merge)?;

        let mut unique: Vec<&str> = Vec::new();
        for id in &request.source_ids {
            if !unique.contains(&id.as_str()) {
                unique.push(id);
            }
        }
        if unique.len() < 2 {
            return Err(BackendError::status(400, "At least two unique source_ids are required"));
        }
        if !unique.contains(&request.target_id.as_str()) {
            return Err(BackendError::status(400, "target_id must be in source_ids"));
        }
        for id in &unique {
            if !state.entities.iter().any(|e| e.id == *id) {
                return Err(BackendError::status(404, format!("Entity {id} not found")));
            }
        }

        let absorbed: Vec<String> = unique
            .iter()
            .filter(|id| **id != request.target_id)
            .map(|id| (*id).to_string())
            .collect();

        let mut target = state
            .entities
            .iter()
            .find(|e| e.id == request.target_id)
            .cloned()
            .ok_or_else(|| BackendError::status(404, "Entity not found"))?;
        for entity in state.entities.iter().filter(|e| absorbed.contains(&e.id)) {
            target.properties = merged_properties(&target, entity);
        }
        for (name, values) in &request.merged_properties {
            target.properties.insert(name.clone(), values.clone());
        }

        state.entities.retain(|e| !absorbed.contains(&e.id));
        if let Some(slot) = state.entities.iter_mut().find(|e| e.id == target.id) {
            *slot = target.clone();
        }
        for edge in &mut state.edges {
            if absorbed.contains(&edge.source) {
                edge.source.clone_from(&target.id);
            }
            if absorbed.contains(&edge.target) {
                edge.target.clone_from(&target.id);
            }
        }
        state
            .candidates
            .retain(|c| !unique.iter().any(|id| c.references(id)));

        Ok(MergeResponse {
            target,
            merged_source_ids: absorbed,
        })
    }

    async fn fetch_graph(
        &self,
        _ctx: &RequestContext,
        _investigation_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<GraphPage, BackendError> {
        let mut state = self.state.lock();
        state.begin(Operation::LoadGraph)?;

        let nodes: Vec<GraphNode> = state
            .entities
            .iter()
            .skip(skip)
            .take(limit)
            .map(GraphNode::from_entity)
            .collect();
        let edges = state
            .edges
            .iter()
            .filter(|edge| {
                nodes.iter().any(|n| n.id == edge.source) && nodes.iter().any(|n| n.id == edge.target)
            })
            .map(GraphEdge::from_edge)
            .collect();

        Ok(GraphPage {
            nodes,
            edges,
            total_nodes: state.entities.len(),
            total_edges: state.edges.len(),
        })
    }

    async fn get_notebook(&self, _ctx: &RequestContext, _investigation_id: &str) -> Result<NotebookRecord, BackendError> {
        let mut state = self.state.lock();
        state.begin(Operation::LoadNotebook)?;
        Ok(state.notebook_mut().clone())
    }

    async fn save_notebook(
        &self,
        _ctx: &RequestContext,
        _investigation_id: &str,
        save: &NotebookSave,
    ) -> Result<NotebookRecord, BackendError> {
        {
            let mut state = self.state.lock();
            state.saves.push(save.clone());
            state.begin(Operation::SaveNotebook)?;
        }

        let gate = self.save_gate.lock().clone();
        if let Some(gate) = gate {
            // Closed on release; the error is the release signal.
            let _ = gate.acquire().await;
        }

        let mut state = self.state.lock();
        let record = state.notebook_mut();
        if record.version != save.version {
            return Err(BackendError::conflict(format!(
                "Notebook version mismatch: stored {}, submitted {}",
                record.version, save.version
            )));
        }
        record.version += 1;
        record.canvas_doc = save.canvas_doc.clone();
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::anonymous()
    }

    #[tokio::test]
    async fn stale_save_conflicts() {
        let backend = InMemoryBackend::new().with_notebook(3, json!({}));

        let saved = backend
            .save_notebook(&ctx(), "inv", &NotebookSave { version: 3, canvas_doc: json!({"nodes": []}) })
            .await
            .unwrap();
        assert_eq!(saved.version, 4);

        let err = backend
            .save_notebook(&ctx(), "inv", &NotebookSave { version: 3, canvas_doc: json!({}) })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict { .. }));
        assert_eq!(backend.saves().len(), 2);
    }

    #[tokio::test]
    async fn missing_notebook_starts_at_version_one() {
        let backend = InMemoryBackend::new();
        let record = backend.get_notebook(&ctx(), "inv").await.unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.canvas_doc, json!({}));
    }

    #[tokio::test]
    async fn scripted_failure_fires_once() {
        let backend = InMemoryBackend::new().with_entities([Entity::new("a", "Person")]);
        backend.fail_next(Operation::Expand, BackendError::status(502, "bad gateway"));

        assert!(backend.expand_entity(&ctx(), "inv", "a").await.is_err());
        assert!(backend.expand_entity(&ctx(), "inv", "a").await.is_ok());
        assert_eq!(backend.calls(Operation::Expand), 2);
    }

    #[tokio::test]
    async fn merge_rejects_target_outside_sources() {
        let backend = InMemoryBackend::new().with_entities([Entity::new("a", "Person"), Entity::new("b", "Person")]);
        let request = MergeRequest {
            source_ids: vec!["a".into(), "b".into()],
            target_id: "c".into(),
            merged_properties: Default::default(),
        };
        let err = backend.merge_entities(&ctx(), "inv", &request).await.unwrap_err();
        assert_eq!(err, BackendError::status(400, "target_id must be in source_ids"));
    }

    #[tokio::test]
    async fn merge_rewires_edges_to_target() {
        let backend = InMemoryBackend::new()
            .with_entities([Entity::new("a", "Person"), Entity::new("b", "Person"), Entity::new("c", "Company")])
            .with_edges([Edge::new("e1", "b", "c")]);
        let request = MergeRequest {
            source_ids: vec!["a".into(), "b".into()],
            target_id: "a".into(),
            merged_properties: Default::default(),
        };

        let response = backend.merge_entities(&ctx(), "inv", &request).await.unwrap();
        assert_eq!(response.merged_source_ids, ["b"]);
        assert!(backend.entity("b").is_none());

        let payload = backend.expand_entity(&ctx(), "inv", "a").await.unwrap();
        assert_eq!(payload.neighbors.len(), 1);
        assert_eq!(payload.edges[0].source, "a");
    }
}
