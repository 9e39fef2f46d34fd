//! Policy validators.
//!
//! Each validator reads the credential plus one classifier output and either
//! passes the request inward or short-circuits with 401. Validators never
//! write to the request context.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::pipeline::{context, PipelineError};

pub async fn indices(req: Request, next: Next) -> Response {
    match check_indices(&req) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

pub async fn operation(req: Request, next: Next) -> Response {
    match check_operation(&req) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

pub async fn category(req: Request, next: Next) -> Response {
    match check_category(&req) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

fn check_indices(req: &Request) -> Result<(), PipelineError> {
    let credential = context::credential(req)?;
    let indices = context::indices(req)?;

    if credential.allows_indices(indices) {
        return Ok(());
    }
    if indices.is_all() {
        tracing::debug!(
            username = credential.username(),
            "cluster-wide request denied"
        );
        return Err(PipelineError::ClusterAccessNotPermitted);
    }
    let denied = credential
        .first_denied_index(indices)
        .unwrap_or_default();
    tracing::debug!(username = credential.username(), index = %denied, "index denied");
    Err(PipelineError::IndexNotPermitted(denied))
}

fn check_operation(req: &Request) -> Result<(), PipelineError> {
    let credential = context::credential(req)?;
    let operation = context::operation(req)?;

    if credential.allows_operation(operation) {
        Ok(())
    } else {
        tracing::debug!(username = credential.username(), %operation, "operation denied");
        Err(PipelineError::OperationNotPermitted(operation))
    }
}

fn check_category(req: &Request) -> Result<(), PipelineError> {
    let credential = context::credential(req)?;
    let category = context::category(req)?;

    if credential.allows_category(category) {
        Ok(())
    } else {
        tracing::debug!(username = credential.username(), %category, "category denied");
        Err(PipelineError::CategoryNotPermitted(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Credential, IndexSet, Operation, PermissionRecord};
    use crate::pipeline::context::{RequestCategory, RequestIndices, RequestOperation};
    use axum::body::Body;

    fn classified_request(cred_indices: &[&str], req_indices: &[&str]) -> Request {
        let mut req = axum::http::Request::builder()
            .uri("/x/_search")
            .body(Body::empty())
            .unwrap();
        let mut set = IndexSet::new();
        for i in req_indices {
            set.insert(i);
        }
        req.extensions_mut().insert(RequestCategory(Category::Search));
        req.extensions_mut().insert(RequestOperation(Operation::Read));
        req.extensions_mut().insert(RequestIndices(set));
        req.extensions_mut()
            .insert(Credential::Permission(PermissionRecord {
                username: "p".into(),
                password: "tok".into(),
                categories: [Category::Search].into_iter().collect(),
                ops: [Operation::Read].into_iter().collect(),
                indices: cred_indices.iter().map(|s| s.to_string()).collect(),
                ttl_secs: 0,
                created_at: 0,
            }));
        req
    }

    #[test]
    fn test_index_validator() {
        assert!(check_indices(&classified_request(&["twitter"], &["twitter"])).is_ok());
        assert!(check_indices(&classified_request(&["logs-*"], &["logs-2024"])).is_ok());

        let err = check_indices(&classified_request(&["products"], &["twitter"])).unwrap_err();
        assert!(matches!(err, PipelineError::IndexNotPermitted(ref i) if i == "twitter"));

        // cluster-wide requires the unrestricted grant
        assert!(check_indices(&classified_request(&["twitter"], &[])).is_err());
        assert!(check_indices(&classified_request(&["*"], &[])).is_ok());
    }

    #[test]
    fn test_operation_and_category_validators() {
        let req = classified_request(&["*"], &[]);
        assert!(check_operation(&req).is_ok());
        assert!(check_category(&req).is_ok());
    }

    #[test]
    fn test_missing_credential_is_internal() {
        let mut req = axum::http::Request::builder()
            .uri("/x/_search")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(RequestCategory(Category::Search));
        let err = check_category(&req).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
