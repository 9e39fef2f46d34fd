//! Pipeline failure modes and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::model::{Category, Operation};

/// Everything that can stop a request inside the pipeline. Authentication
/// and authorization failures all map to 401; a missing context key is an
/// internal invariant breach and maps to 500.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid auth")]
    InvalidAuth,

    #[error("unknown credentials")]
    UnknownCredentials,

    #[error("credentials expired")]
    CredentialsExpired,

    #[error("index '{0}' is not permitted")]
    IndexNotPermitted(String),

    #[error("cluster-wide access is not permitted")]
    ClusterAccessNotPermitted,

    #[error("operation '{0}' is not permitted")]
    OperationNotPermitted(Operation),

    #[error("category '{0}' is not permitted")]
    CategoryNotPermitted(Category),

    #[error("request context is missing '{0}'")]
    MissingContext(&'static str),

    #[error("credential store unavailable")]
    StoreUnavailable,
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::MissingContext(_) | PipelineError::StoreUnavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        }));
        (status, body).into_response()
    }
}
