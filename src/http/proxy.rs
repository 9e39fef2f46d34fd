//! Terminal proxy handler.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream cluster
//! - Forward the request and stream the upstream response back verbatim
//! - Map upstream timeouts to 504 and connect failures to 502
//!
//! # Design Decisions
//! - Upstream statuses (including 5xx) and bodies propagate unchanged
//! - Hop-by-hop headers are stripped before forwarding
//! - Nothing is retried

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use crate::http::server::AppState;
use crate::routing::{Plugin, RouteSpec};

/// Connection-scoped headers that must not be forwarded.
const HOP_BY_HOP_HEADERS: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

/// Registers the transparent catch-all proxy routes.
pub struct ProxyPlugin;

impl Plugin for ProxyPlugin {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![
            RouteSpec::new(Method::GET, "/", axum::routing::any(proxy_handler)),
            RouteSpec::new(Method::GET, "/{*path}", axum::routing::any(proxy_handler)),
        ]
    }
}

/// Forward a classified, validated request to the search cluster.
pub async fn proxy_handler(State(state): State<AppState>, mut request: Request) -> Response {
    let uri = match state.inner.upstream.rewrite(request.uri()) {
        Ok(uri) => uri,
        Err(err) => {
            tracing::error!(error = %err, "upstream URI rewrite failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "URI rewrite failed");
        }
    };
    *request.uri_mut() = uri;

    for name in HOP_BY_HOP_HEADERS {
        request.headers_mut().remove(name);
    }

    let timeout = state.inner.upstream.request_timeout;
    match tokio::time::timeout(timeout, state.inner.client.request(request)).await {
        Ok(Ok(response)) => {
            let status = response.status();
            if status.is_server_error() {
                tracing::warn!(%status, "upstream returned a server error");
            }
            response.map(Body::new)
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "upstream request failed");
            error_response(StatusCode::BAD_GATEWAY, "upstream request failed")
        }
        Err(_) => {
            tracing::error!(timeout_secs = timeout.as_secs(), "upstream request timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, "upstream request timed out")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": message,
            "code": status.as_u16(),
        })),
    )
        .into_response()
}
