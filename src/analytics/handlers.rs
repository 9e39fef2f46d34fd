//! Analytics read API.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub from: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub filter: Option<String>,
    /// Comma-separated index names to narrow on.
    #[serde(default)]
    pub indices: Option<String>,
}

/// `GET /_analytics` — read back recorded events.
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsQuery>,
) -> Response {
    let indices: Vec<String> = params
        .indices
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let result = state
        .inner
        .analytics
        .query_raw(
            params.from.unwrap_or(0),
            params.size.unwrap_or(100),
            params.filter.as_deref(),
            &indices,
        )
        .await;

    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "analytics query failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "unable to query analytics records",
                    "code": 502,
                })),
            )
                .into_response()
        }
    }
}
