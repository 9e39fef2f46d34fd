//! Classification middlewares.
//!
//! # Responsibilities
//! - Populate the category, operation and indices context keys
//! - For `_msearch`, fold body header lines into the index set
//!
//! # Design Decisions
//! - Classifiers never fail; unresolved cases fall to Misc / Read / empty
//! - The `_msearch` body is buffered once and restored for the proxy
//! - Bodies of unknown or oversized length are never buffered: the payload
//!   is forwarded untouched and indices classify from the URL alone

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};

use crate::model::{Category, IndexSet, Operation};
use crate::pipeline::context::{RequestCategory, RequestIndices, RequestOperation};

/// Largest `_msearch` body the indices classifier will buffer. Larger
/// bodies skip body-level index extraction and classify from the URL only.
const MAX_CLASSIFIED_BODY_BYTES: usize = 10 * 1024 * 1024;

pub async fn category(mut req: Request, next: Next) -> Response {
    let category = Category::of(req.method(), req.uri().path());
    req.extensions_mut().insert(RequestCategory(category));
    next.run(req).await
}

pub async fn operation(mut req: Request, next: Next) -> Response {
    let operation = Operation::of(req.method(), req.uri().path());
    req.extensions_mut().insert(RequestOperation(operation));
    next.run(req).await
}

pub async fn indices(mut req: Request, next: Next) -> Response {
    let mut set = IndexSet::from_path(req.uri().path());

    if req.uri().path().contains("_msearch") && body_fits_classification(req.headers()) {
        let (parts, body) = req.into_parts();
        match to_bytes(body, MAX_CLASSIFIED_BODY_BYTES).await {
            Ok(bytes) => {
                set.union_msearch_body(&bytes);
                req = Request::from_parts(parts, Body::from(bytes));
            }
            Err(err) => {
                // The body is gone after a failed read; it cannot be
                // forwarded anymore, so the request ends here.
                tracing::warn!(error = %err, "failed to read _msearch body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "error": "unable to read request body",
                        "code": 400,
                    })),
                )
                    .into_response();
            }
        }
    }

    req.extensions_mut().insert(RequestIndices(set));
    next.run(req).await
}

/// Only bodies with a declared size within the buffering limit are read for
/// index extraction. Anything larger, or of unknown length, travels to the
/// cluster untouched.
fn body_fits_classification(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(false, |len| len <= MAX_CLASSIFIED_BODY_BYTES as u64)
}
