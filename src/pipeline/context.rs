//! Request-scoped context carried in axum request extensions.
//!
//! Classification and authentication each write exactly one typed key;
//! later stages read through the accessors below. A missing key means a
//! middleware ran out of order, which is an internal error, not a caller
//! error.

use axum::extract::Request;

use crate::model::{Category, Credential, IndexSet, Operation};
use crate::pipeline::PipelineError;

/// Context key: the classified category.
#[derive(Debug, Clone, Copy)]
pub struct RequestCategory(pub Category);

/// Context key: the classified operation.
#[derive(Debug, Clone, Copy)]
pub struct RequestOperation(pub Operation);

/// Context key: the set of indices the request touches.
#[derive(Debug, Clone)]
pub struct RequestIndices(pub IndexSet);

pub fn category(req: &Request) -> Result<Category, PipelineError> {
    req.extensions()
        .get::<RequestCategory>()
        .map(|c| c.0)
        .ok_or(PipelineError::MissingContext("category"))
}

pub fn operation(req: &Request) -> Result<Operation, PipelineError> {
    req.extensions()
        .get::<RequestOperation>()
        .map(|o| o.0)
        .ok_or(PipelineError::MissingContext("operation"))
}

pub fn indices(req: &Request) -> Result<&IndexSet, PipelineError> {
    req.extensions()
        .get::<RequestIndices>()
        .map(|i| &i.0)
        .ok_or(PipelineError::MissingContext("indices"))
}

pub fn credential(req: &Request) -> Result<&Credential, PipelineError> {
    req.extensions()
        .get::<Credential>()
        .ok_or(PipelineError::MissingContext("credential"))
}
