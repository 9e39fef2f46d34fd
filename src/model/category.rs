//! Request category classification.
//!
//! # Responsibilities
//! - Map (method, URL path) to the functional class of the request
//! - First matching rule wins; unknown routes fall to Misc
//!
//! # Design Decisions
//! - The first `_`-prefixed path segment decides the category
//! - `_all` is an index token, not an endpoint, and is skipped
//! - Bare-index paths map to Indices or Docs by segment arity

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// High-level functional class of a request, distinct from the HTTP
/// operation. Credentials grant access per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Docs,
    Search,
    Indices,
    Cat,
    Clusters,
    Misc,
    User,
    Permission,
    Analytics,
    Logs,
    Streams,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Docs => "docs",
            Category::Search => "search",
            Category::Indices => "indices",
            Category::Cat => "cat",
            Category::Clusters => "clusters",
            Category::Misc => "misc",
            Category::User => "user",
            Category::Permission => "permission",
            Category::Analytics => "analytics",
            Category::Logs => "logs",
            Category::Streams => "streams",
        };
        f.write_str(name)
    }
}

impl Category {
    /// Classify a request by its method and URL path.
    ///
    /// The static route table keys off the first `_`-prefixed path segment
    /// (`_all` excepted, which names the all-indices token). Paths without
    /// an endpoint segment are index or document CRUD by shape.
    pub fn of(method: &Method, path: &str) -> Category {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        for segment in &segments {
            if segment.starts_with('_') && *segment != "_all" {
                return Self::of_endpoint(segment);
            }
        }

        // No endpoint segment: plain index / document routes.
        match segments.len() {
            0 => Category::Misc,
            1 => match *method {
                Method::GET | Method::HEAD | Method::PUT | Method::DELETE => Category::Indices,
                _ => Category::Misc,
            },
            // /{index}/{type} and /{index}/{type}/{id} document shapes
            _ => Category::Docs,
        }
    }

    fn of_endpoint(endpoint: &str) -> Category {
        match endpoint {
            "_search" | "_msearch" | "_count" | "_validate" | "_explain" | "_field_caps"
            | "_suggest" | "_search_shards" | "_scroll" | "_rank_eval" => Category::Search,

            "_doc" | "_create" | "_update" | "_bulk" | "_mget" | "_source" | "_termvectors"
            | "_mtermvectors" | "_update_by_query" | "_delete_by_query" | "_reindex" => {
                Category::Docs
            }

            "_cat" => Category::Cat,

            "_cluster" | "_nodes" | "_tasks" | "_remote" | "_ingest" | "_scripts"
            | "_snapshot" => Category::Clusters,

            "_analytics" => Category::Analytics,
            "_logs" => Category::Logs,
            "_streams" => Category::Streams,
            "_user" | "_users" => Category::User,
            "_permission" | "_permissions" => Category::Permission,

            "_mapping" | "_mappings" | "_settings" | "_alias" | "_aliases" | "_open"
            | "_close" | "_refresh" | "_flush" | "_forcemerge" | "_rollover" | "_shrink"
            | "_split" | "_stats" | "_segments" | "_recovery" | "_cache" | "_template"
            | "_templates" => Category::Indices,

            _ => Category::Misc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_routes() {
        assert_eq!(Category::of(&Method::GET, "/_search"), Category::Search);
        assert_eq!(Category::of(&Method::POST, "/_msearch"), Category::Search);
        assert_eq!(Category::of(&Method::GET, "/twitter/_search"), Category::Search);
        assert_eq!(Category::of(&Method::POST, "/a,b/_count"), Category::Search);
        assert_eq!(Category::of(&Method::GET, "/_all/_search"), Category::Search);
    }

    #[test]
    fn test_doc_routes() {
        assert_eq!(Category::of(&Method::POST, "/twitter/_doc"), Category::Docs);
        assert_eq!(Category::of(&Method::PUT, "/twitter/_doc/1"), Category::Docs);
        assert_eq!(Category::of(&Method::POST, "/_bulk"), Category::Docs);
        assert_eq!(Category::of(&Method::GET, "/twitter/tweet/1"), Category::Docs);
    }

    #[test]
    fn test_admin_routes() {
        assert_eq!(Category::of(&Method::GET, "/_cat/indices"), Category::Cat);
        assert_eq!(Category::of(&Method::GET, "/_cluster/health"), Category::Clusters);
        assert_eq!(Category::of(&Method::PUT, "/twitter/_settings"), Category::Indices);
        assert_eq!(Category::of(&Method::PUT, "/twitter"), Category::Indices);
        assert_eq!(Category::of(&Method::DELETE, "/twitter"), Category::Indices);
    }

    #[test]
    fn test_gateway_routes() {
        assert_eq!(Category::of(&Method::GET, "/_analytics"), Category::Analytics);
        assert_eq!(Category::of(&Method::GET, "/_logs"), Category::Logs);
        assert_eq!(Category::of(&Method::GET, "/_users/foo"), Category::User);
    }

    #[test]
    fn test_unknown_falls_to_misc() {
        assert_eq!(Category::of(&Method::GET, "/"), Category::Misc);
        assert_eq!(Category::of(&Method::GET, "/_whatever"), Category::Misc);
        assert_eq!(Category::of(&Method::POST, "/justanindex"), Category::Misc);
    }
}
