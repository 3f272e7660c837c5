//! REST implementation of [`InvestigationBackend`]

use crate::config::{ClientError, ClientResult, HttpBackendConfig};
use casebook_core::{BackendError, InvestigationBackend, RequestContext};
use casebook_model::{
    DuplicateCandidate, DuplicateQuery, ExpandPayload, GraphPage, MergeRequest, MergeResponse, NotebookRecord,
    NotebookSave,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Investigation backend over HTTP
///
/// Stateless apart from the connection pool: credentials come from the
/// [`RequestContext`] of each call.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: HttpBackendConfig,
    base: Url,
    http: Client,
}

impl HttpBackend {
    /// Create a backend with the given configuration.
    ///
    /// # Errors
    /// `ClientError::Config` for an invalid configuration.
    pub fn new(config: HttpBackendConfig) -> ClientResult<Self> {
        config.validate()?;
        let base = Url::parse(&config.base_url).map_err(|err| ClientError::Config(err.to_string()))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, base, http })
    }

    /// Create a backend from `CASEBOOK_API_*` variables.
    ///
    /// # Errors
    /// See [`HttpBackend::new`].
    pub fn from_env() -> ClientResult<Self> {
        Self::new(HttpBackendConfig::from_env())
    }

    /// Configuration this backend was built with
    #[must_use]
    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    /// `{base}/investigations/{investigation_id}/{segments...}`, each segment
    /// percent-encoded
    fn url(&self, investigation_id: &str, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("investigations")
                .push(investigation_id)
                .extend(segments);
        }
        url
    }

    fn request(&self, ctx: &RequestContext, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match ctx.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await.map_err(|err| {
            tracing::debug!(%err, "request failed before a response arrived");
            BackendError::unreachable(err.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|err| {
                BackendError::status(status.as_u16(), format!("unreadable response body: {err}"))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        tracing::debug!(status = status.as_u16(), %message, "backend returned an error");

        if status == StatusCode::CONFLICT {
            Err(BackendError::conflict(message))
        } else {
            Err(BackendError::status(status.as_u16(), message))
        }
    }
}

/// Detail of an error body: a JSON `detail` string when present, else the
/// trimmed body; `None` for a blank body
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").and_then(Value::as_str).map(str::to_string));
    Some(detail.unwrap_or_else(|| body.to_string()))
}

#[async_trait::async_trait]
impl InvestigationBackend for HttpBackend {
    async fn expand_entity(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        entity_id: &str,
    ) -> Result<ExpandPayload, BackendError> {
        let url = self.url(investigation_id, &["entities", entity_id, "expand"]);
        self.send(self.request(ctx, Method::GET, url)).await
    }

    async fn find_duplicate_candidates(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        query: &DuplicateQuery,
    ) -> Result<Vec<DuplicateCandidate>, BackendError> {
        let url = self.url(investigation_id, &["entities", "deduplicate", "candidates"]);
        let mut params = vec![
            ("threshold", query.threshold.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(schema) = &query.schema {
            params.push(("schema", schema.clone()));
        }
        self.send(self.request(ctx, Method::GET, url).query(&params)).await
    }

    async fn merge_entities(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        request: &MergeRequest,
    ) -> Result<MergeResponse, BackendError> {
        let url = self.url(investigation_id, &["entities", "merge"]);
        self.send(self.request(ctx, Method::POST, url).json(request)).await
    }

    async fn fetch_graph(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<GraphPage, BackendError> {
        let url = self.url(investigation_id, &["graph"]);
        self.send(self.request(ctx, Method::GET, url).query(&[("skip", skip), ("limit", limit)]))
            .await
    }

    async fn get_notebook(&self, ctx: &RequestContext, investigation_id: &str) -> Result<NotebookRecord, BackendError> {
        let url = self.url(investigation_id, &["notebook"]);
        self.send(self.request(ctx, Method::GET, url)).await
    }

    async fn save_notebook(
        &self,
        ctx: &RequestContext,
        investigation_id: &str,
        save: &NotebookSave,
    ) -> Result<NotebookRecord, BackendError> {
        let url = self.url(investigation_id, &["notebook"]);
        self.send(self.request(ctx, Method::PUT, url).json(save)).await
    }
}
