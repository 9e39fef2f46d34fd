//! Abstract operation classification.

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// Path segments that make a POST behave as a read. Search-style endpoints
/// take their query in the request body.
const READ_POST_ENDPOINTS: &[&str] = &[
    "_search",
    "_msearch",
    "_count",
    "_validate",
    "_explain",
    "_field_caps",
];

/// The abstract action a request performs, derived from the HTTP method and
/// the path shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl Operation {
    /// Classify a request. `GET`/`HEAD` read, `PUT`/`PATCH`/`POST` write,
    /// `DELETE` deletes; a `POST` to a search-style endpoint is a read.
    pub fn of(method: &Method, path: &str) -> Operation {
        match *method {
            Method::GET | Method::HEAD => Operation::Read,
            Method::DELETE => Operation::Delete,
            Method::POST if is_read_post(path) => Operation::Read,
            Method::PUT | Method::PATCH | Method::POST => Operation::Write,
            // Unrecognized methods are proxied but treated as reads.
            _ => Operation::Read,
        }
    }
}

/// A POST reads when one of its two trailing segments names a search-style
/// endpoint. Checking two segments covers `/idx/_validate/query` and
/// `/idx/_explain/{id}` shapes.
fn is_read_post(path: &str) -> bool {
    path.split('/')
        .filter(|s| !s.is_empty())
        .rev()
        .take(2)
        .any(|segment| READ_POST_ENDPOINTS.contains(&segment))
}
