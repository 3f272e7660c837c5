//! Duplicate-candidate review and merge application

use crate::backend::InvestigationBackend;
use crate::context::RequestContext;
use crate::error::{CasebookError, Operation};
use casebook_model::{DuplicateCandidate, DuplicateQuery, Entity, MergeRequest, MergeResponse, Properties};
use indexmap::IndexSet;

/// Union of two property maps, de-duplicating values per property
///
/// Keys from either side are kept. Within a key, values keep first-seen
/// order (left before right); callers must treat them as a set.
#[must_use]
pub fn merged_properties(left: &Entity, right: &Entity) -> Properties {
    let mut merged: indexmap::IndexMap<&str, IndexSet<&str>> = indexmap::IndexMap::new();
    for entity in [left, right] {
        for (name, values) in &entity.properties {
            merged
                .entry(name.as_str())
                .or_default()
                .extend(values.iter().map(String::as_str));
        }
    }
    merged
        .into_iter()
        .map(|(name, values)| (name.to_string(), values.into_iter().map(str::to_string).collect()))
        .collect()
}

/// Build the merge call for a candidate pair
///
/// # Errors
/// `CasebookError::Validation` if `target_id` is not one side of the pair or
/// both sides are the same entity.
pub fn build_merge_request(candidate: &DuplicateCandidate, target_id: &str) -> Result<MergeRequest, CasebookError> {
    let (left, right) = (&candidate.left, &candidate.right);
    if left.id == right.id {
        return Err(CasebookError::validation(format!(
            "candidate pairs entity '{}' with itself",
            left.id
        )));
    }
    if target_id != left.id && target_id != right.id {
        return Err(CasebookError::validation(format!(
            "merge target '{target_id}' must be '{}' or '{}'",
            left.id, right.id
        )));
    }
    Ok(MergeRequest {
        source_ids: vec![left.id.clone(), right.id.clone()],
        target_id: target_id.to_string(),
        merged_properties: merged_properties(left, right),
    })
}

/// What a successful merge changed locally
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Surviving entity and merged ids as reported by the backend
    pub response: MergeResponse,
    /// Candidates dropped because they referenced a merged entity
    pub removed_candidates: usize,
}

/// Current duplicate candidates and the operations on them
///
/// # Characteristics
/// - A scan replaces the list wholesale
/// - A merge removes every candidate touching either merged entity
/// - A failed backend call leaves the list exactly as it was
#[derive(Debug, Clone, Default)]
pub struct DuplicateWorkflow {
    candidates: Vec<DuplicateCandidate>,
}

impl DuplicateWorkflow {
    /// Workflow with no candidates
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates from the last scan, minus merged ones
    #[inline]
    #[must_use]
    pub fn candidates(&self) -> &[DuplicateCandidate] {
        &self.candidates
    }

    /// No candidates left to review
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Replace the candidate list with a fresh scan result
    ///
    /// # Errors
    /// `Validation` for a bad query (nothing is sent), `Transport` if the
    /// scan fails.
    pub async fn scan(
        &mut self,
        backend: &dyn InvestigationBackend,
        ctx: &RequestContext,
        investigation_id: &str,
        query: &DuplicateQuery,
    ) -> Result<usize, CasebookError> {
        query.validate()?;

        let candidates = backend
            .find_duplicate_candidates(ctx, investigation_id, query)
            .await
            .map_err(|err| {
                tracing::error!(%err, "duplicate scan failed");
                CasebookError::from_backend(Operation::Scan, err)
            })?;

        self.candidates = candidates;
        tracing::info!(
            candidates = self.candidates.len(),
            schema = query.schema.as_deref().unwrap_or("all"),
            threshold = query.threshold,
            "duplicate candidates replaced"
        );
        Ok(self.candidates.len())
    }

    /// Merge a candidate pair into `target_id`
    ///
    /// # Errors
    /// `Validation` for a bad target (nothing is sent), `Transport` if the
    /// merge fails. The candidate list is untouched on error.
    pub async fn apply_merge(
        &mut self,
        backend: &dyn InvestigationBackend,
        ctx: &RequestContext,
        investigation_id: &str,
        candidate: &DuplicateCandidate,
        target_id: &str,
    ) -> Result<MergeOutcome, CasebookError> {
        let request = build_merge_request(candidate, target_id)?;

        let response = backend
            .merge_entities(ctx, investigation_id, &request)
            .await
            .map_err(|err| {
                tracing::error!(%err, target_id, "merge failed");
                CasebookError::from_backend(Operation::Merge, err)
            })?;

        let removed_candidates = self.remove_referencing(&[candidate.left.id.as_str(), candidate.right.id.as_str()]);
        tracing::info!(
            target_id,
            merged = ?response.merged_source_ids,
            removed_candidates,
            remaining = self.candidates.len(),
            "merge applied"
        );
        Ok(MergeOutcome {
            response,
            removed_candidates,
        })
    }

    fn remove_referencing(&mut self, entity_ids: &[&str]) -> usize {
        let before = self.candidates.len();
        self.candidates
            .retain(|candidate| !entity_ids.iter().any(|id| candidate.references(id)));
        before - self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockInvestigationBackend;
    use crate::error::BackendError;
    use casebook_model::Entity;
    use pretty_assertions::assert_eq;

    fn entity(id: &str) -> Entity {
        Entity::new(id, "Person")
    }

    fn candidate(left: &str, right: &str, similarity: f64) -> DuplicateCandidate {
        DuplicateCandidate::new(entity(left), entity(right), similarity, "name")
    }

    fn sorted(props: &Properties, key: &str) -> Vec<String> {
        let mut values = props.get(key).cloned().unwrap_or_default();
        values.sort();
        values
    }

    #[test]
    fn merged_properties_is_union_per_key() {
        let left = entity("l").with_property("a", ["1"]);
        let right = entity("r").with_property("a", ["2"]).with_property("b", ["3"]);

        let merged = merged_properties(&left, &right);
        assert_eq!(merged.len(), 2);
        assert_eq!(sorted(&merged, "a"), ["1", "2"]);
        assert_eq!(sorted(&merged, "b"), ["3"]);
    }

    #[test]
    fn merged_properties_drops_duplicates() {
        let left = entity("l").with_property("name", ["Ann", "Ann", "Anne"]);
        let right = entity("r").with_property("name", ["Anne", "Ann"]);
        assert_eq!(sorted(&merged_properties(&left, &right), "name"), ["Ann", "Anne"]);
    }

    #[test]
    fn target_must_be_one_side() {
        let pair = candidate("a", "b", 0.8);
        assert!(build_merge_request(&pair, "a").is_ok());
        assert!(build_merge_request(&pair, "b").is_ok());
        assert!(matches!(
            build_merge_request(&pair, "c"),
            Err(CasebookError::Validation(_))
        ));
        assert!(build_merge_request(&candidate("a", "a", 1.0), "a").is_err());
    }

    #[test]
    fn request_lists_both_sources() {
        let request = build_merge_request(&candidate("a", "b", 0.8), "b").unwrap();
        assert_eq!(request.source_ids, ["a", "b"]);
        assert_eq!(request.target_id, "b");
    }

    #[tokio::test]
    async fn scan_replaces_list_wholesale() {
        let mut backend = MockInvestigationBackend::new();
        let mut calls = 0;
        backend
            .expect_find_duplicate_candidates()
            .times(2)
            .returning(move |_, _, _| {
                calls += 1;
                if calls == 1 {
                    Ok(vec![candidate("a", "b", 0.8), candidate("c", "d", 0.9)])
                } else {
                    Ok(vec![candidate("x", "y", 0.7)])
                }
            });

        let mut workflow = DuplicateWorkflow::new();
        let ctx = RequestContext::anonymous();
        let query = DuplicateQuery::new(0.7, 100);
        assert_eq!(workflow.scan(&backend, &ctx, "inv", &query).await.unwrap(), 2);
        assert_eq!(workflow.scan(&backend, &ctx, "inv", &query).await.unwrap(), 1);
        assert_eq!(workflow.candidates()[0].left.id, "x");
    }

    #[tokio::test]
    async fn invalid_query_is_not_sent() {
        let mut backend = MockInvestigationBackend::new();
        backend.expect_find_duplicate_candidates().never();

        let mut workflow = DuplicateWorkflow::new();
        let err = workflow
            .scan(&backend, &RequestContext::anonymous(), "inv", &DuplicateQuery::new(2.0, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CasebookError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_scan_keeps_previous_candidates() {
        let mut backend = MockInvestigationBackend::new();
        let mut first = true;
        backend.expect_find_duplicate_candidates().returning(move |_, _, _| {
            if std::mem::take(&mut first) {
                Ok(vec![candidate("a", "b", 0.8)])
            } else {
                Err(BackendError::status(503, ""))
            }
        });

        let mut workflow = DuplicateWorkflow::new();
        let ctx = RequestContext::anonymous();
        let query = DuplicateQuery::new(0.7, 100);
        workflow.scan(&backend, &ctx, "inv", &query).await.unwrap();

        let err = workflow.scan(&backend, &ctx, "inv", &query).await.unwrap_err();
        assert_eq!(err.user_message(), "Could not load duplicate candidates");
        assert_eq!(workflow.candidates().len(), 1);
    }

    #[tokio::test]
    async fn merge_removes_every_candidate_touching_either_side() {
        let mut backend = MockInvestigationBackend::new();
        backend
            .expect_find_duplicate_candidates()
            .returning(|_, _, _| {
                Ok(vec![
                    candidate("A", "B", 0.8),
                    candidate("B", "C", 0.75),
                    candidate("D", "A", 0.72),
                    candidate("E", "F", 0.71),
                ])
            });
        backend
            .expect_merge_entities()
            .withf(|_, inv, request| inv == "inv" && request.target_id == "A" && request.source_ids == ["A", "B"])
            .times(1)
            .returning(|_, _, request| {
                Ok(MergeResponse {
                    target: Entity::new(request.target_id.clone(), "Person"),
                    merged_source_ids: request.source_ids.clone(),
                })
            });

        let mut workflow = DuplicateWorkflow::new();
        let ctx = RequestContext::anonymous();
        workflow.scan(&backend, &ctx, "inv", &DuplicateQuery::new(0.7, 100)).await.unwrap();

        let pair = workflow.candidates()[0].clone();
        let outcome = workflow.apply_merge(&backend, &ctx, "inv", &pair, "A").await.unwrap();

        assert_eq!(outcome.removed_candidates, 3);
        let left: Vec<_> = workflow.candidates().iter().map(|c| c.left.id.as_str()).collect();
        assert_eq!(left, ["E"]);
    }

    #[tokio::test]
    async fn failed_merge_leaves_candidates() {
        let mut backend = MockInvestigationBackend::new();
        backend
            .expect_find_duplicate_candidates()
            .returning(|_, _, _| Ok(vec![candidate("A", "B", 0.8), candidate("B", "C", 0.75)]));
        backend
            .expect_merge_entities()
            .returning(|_, _, _| Err(BackendError::unreachable("connection refused")));

        let mut workflow = DuplicateWorkflow::new();
        let ctx = RequestContext::anonymous();
        workflow.scan(&backend, &ctx, "inv", &DuplicateQuery::new(0.7, 100)).await.unwrap();
        let pair = workflow.candidates()[0].clone();

        let err = workflow.apply_merge(&backend, &ctx, "inv", &pair, "A").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(workflow.candidates().len(), 2);
    }
}
