//! Search-analytics recorder middleware.
//!
//! # Responsibilities
//! - Unescape `X-Search-*` headers once on entry
//! - Buffer Search responses, hand the client an `X-Search-Id`, and enqueue
//!   the recording job
//!
//! # Design Decisions
//! - Pass-through for non-Search categories and for requests carrying
//!   neither a query nor a search id: the response is returned untouched
//! - Enqueueing is non-blocking; parsing and store I/O happen on the
//!   worker pool, so recording never adds to request latency

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};

use crate::analytics::record::{
    decode_search_headers, RecorderJob, X_SEARCH_ID, X_SEARCH_QUERY,
};
use crate::http::server::AppState;
use crate::model::Category;
use crate::pipeline::context;

pub async fn record(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Err(err) = decode_search_headers(req.headers_mut()) {
        // An undecodable header disables recording for this request only.
        tracing::warn!(error = %err, "cannot decode search headers, skipping analytics");
        return next.run(req).await;
    }

    let category = match context::category(&req) {
        Ok(category) => category,
        Err(err) => {
            tracing::error!(error = %err, "recorder ran before classification");
            return recording_error();
        }
    };

    let search_query = header_value(req.headers(), X_SEARCH_QUERY);
    let search_id = header_value(req.headers(), X_SEARCH_ID);

    if !state.inner.config.analytics.enabled
        || category != Category::Search
        || (search_query.is_empty() && search_id.is_empty())
    {
        return next.run(req).await;
    }

    let doc_id = if search_id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        search_id.clone()
    };

    let indices = match context::indices(&req) {
        Ok(indices) => indices.clone(),
        Err(err) => {
            tracing::error!(error = %err, "recorder ran before classification");
            return recording_error();
        }
    };
    let msearch = req.uri().path().contains("_msearch");
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let headers = req.headers().clone();

    // Run the inner chain to completion against a buffered body.
    let response = next.run(req).await;
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "cannot buffer upstream response for recording");
            return recording_error();
        }
    };

    // Rejections (auth, validation) and upstream failures are returned
    // untouched and never recorded.
    if !parts.status.is_success() {
        return Response::from_parts(parts, Body::from(bytes));
    }

    match HeaderValue::from_str(&doc_id) {
        Ok(value) => {
            parts.headers.insert(X_SEARCH_ID, value);
        }
        Err(err) => {
            tracing::warn!(doc_id = %doc_id, error = %err, "doc id not representable as header")
        }
    }

    let job = RecorderJob::from_request_parts(
        doc_id,
        !search_id.is_empty(),
        msearch,
        &headers,
        indices,
        peer,
        bytes.clone(),
    );
    state.inner.recorder_queue.enqueue(job);

    Response::from_parts(parts, Body::from(bytes))
}

fn header_value(headers: &axum::http::HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn recording_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "an error occurred while recording the search request",
            "code": 500,
        })),
    )
        .into_response()
}
