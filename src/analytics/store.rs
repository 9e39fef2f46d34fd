//! Analytics store client.
//!
//! # Responsibilities
//! - Idempotently create the analytics index at boot
//! - Write records keyed by doc id with merge-on-conflict semantics
//! - Serve raw queries for the read API
//!
//! # Design Decisions
//! - Writes go through `_update` with `doc_as_upsert`, so an initial search
//!   record and its follow-up events merge shallowly in either arrival order
//! - Replica count follows cluster size: max(0, nodes - 1)

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use thiserror::Error;

use crate::analytics::record::AnalyticsRecord;
use crate::http::upstream::{Upstream, UpstreamClient};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("analytics store request failed: {0}")]
    Transport(String),

    #[error("analytics store returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("analytics store returned a malformed response: {0}")]
    Malformed(String),
}

pub struct AnalyticsStore {
    client: UpstreamClient,
    upstream: Upstream,
    index: String,
}

impl AnalyticsStore {
    pub fn new(client: UpstreamClient, upstream: Upstream, index: String) -> AnalyticsStore {
        AnalyticsStore {
            client,
            upstream,
            index,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Create the analytics index unless it already exists.
    pub async fn ensure_index(&self) -> Result<(), StoreError> {
        let head = self
            .send(Method::HEAD, &format!("/{}", self.index), None)
            .await?;
        if head.status.is_success() {
            tracing::debug!(index = %self.index, "analytics index already exists");
            return Ok(());
        }
        if head.status != StatusCode::NOT_FOUND {
            return Err(StoreError::Status {
                status: head.status,
                body: String::from_utf8_lossy(&head.body).into_owned(),
            });
        }

        let nodes = self.cluster_nodes().await?;
        let replicas = nodes.saturating_sub(1);
        let settings = serde_json::json!({
            "settings": {
                "index": {
                    "number_of_replicas": replicas,
                }
            }
        });

        let resp = self
            .send(
                Method::PUT,
                &format!("/{}", self.index),
                Some(settings.to_string()),
            )
            .await?;
        if !resp.status.is_success() {
            return Err(StoreError::Status {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }
        tracing::info!(index = %self.index, replicas, "created analytics index");
        Ok(())
    }

    /// Index or merge a single record under `doc_id`. First writer provides
    /// the base document, later writers add fields.
    pub async fn write_record(
        &self,
        doc_id: &str,
        record: &AnalyticsRecord,
    ) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "doc": record,
            "doc_as_upsert": true,
        });
        let path = format!("/{}/_update/{}", self.index, urlencoding::encode(doc_id));
        let resp = self.send(Method::POST, &path, Some(body.to_string())).await?;
        if !resp.status.is_success() {
            return Err(StoreError::Status {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }
        tracing::debug!(doc_id = %doc_id, "analytics record written");
        Ok(())
    }

    /// Raw search over recorded events for the read API. `filter` selects
    /// a named slice (`clicks`, `conversions`); `indices` narrows to events
    /// whose search touched one of the given indices.
    pub async fn query_raw(
        &self,
        from: usize,
        size: usize,
        filter: Option<&str>,
        indices: &[String],
    ) -> Result<Bytes, StoreError> {
        let query = build_query(filter, indices);
        let body = serde_json::json!({
            "from": from,
            "size": size,
            "sort": [{"timestamp": {"order": "desc", "unmapped_type": "date"}}],
            "query": query,
        });

        let path = format!("/{}/_search", self.index);
        let resp = self.send(Method::POST, &path, Some(body.to_string())).await?;
        if !resp.status.is_success() {
            return Err(StoreError::Status {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }
        Ok(resp.body)
    }

    /// Number of nodes in the upstream cluster, for the replica count.
    async fn cluster_nodes(&self) -> Result<u64, StoreError> {
        let resp = self.send(Method::GET, "/_cluster/health", None).await?;
        if !resp.status.is_success() {
            return Err(StoreError::Status {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }

        #[derive(serde::Deserialize)]
        struct ClusterHealth {
            number_of_nodes: u64,
        }

        let health: ClusterHealth = serde_json::from_slice(&resp.body)
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(health.number_of_nodes)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<RawResponse, StoreError> {
        let uri = self
            .upstream
            .uri(path)
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json)),
            None => builder.body(Body::empty()),
        }
        .map_err(|e| StoreError::Transport(e.to_string()))?;

        let resp = self
            .client
            .request(request)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .to_bytes();
        Ok(RawResponse { status, body })
    }
}

struct RawResponse {
    status: StatusCode,
    body: Bytes,
}

fn build_query(filter: Option<&str>, indices: &[String]) -> serde_json::Value {
    let mut must = Vec::new();
    if !indices.is_empty() {
        must.push(serde_json::json!({"terms": {"indices": indices}}));
    }
    match filter {
        Some("clicks") => must.push(serde_json::json!({"exists": {"field": "click"}})),
        Some("conversions") => must.push(serde_json::json!({"exists": {"field": "conversion"}})),
        _ => {}
    }
    if must.is_empty() {
        serde_json::json!({"match_all": {}})
    } else {
        serde_json::json!({"bool": {"must": must}})
    }
}
