//! Shared upstream-cluster addressing.
//!
//! One pooled hyper client serves the proxy hot path and both store
//! clients; this type carries the validated scheme/authority they all
//! rewrite requests against.

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::Uri;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::schema::UpstreamConfig;

pub type UpstreamClient = Client<HttpConnector, Body>;

pub fn build_client() -> UpstreamClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// The upstream search cluster's address, parsed and validated at boot.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
    /// Per-call timeout for forwarded requests.
    pub request_timeout: Duration,
}

impl Upstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Upstream, String> {
        let uri: Uri = config
            .url
            .parse()
            .map_err(|e| format!("invalid upstream url '{}': {}", config.url, e))?;
        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| format!("upstream url '{}' is missing a scheme", config.url))?;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| format!("upstream url '{}' is missing an authority", config.url))?;

        Ok(Upstream {
            scheme,
            authority,
            request_timeout: Duration::from_secs(config.request_secs),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Build an absolute URI for a path (with optional query) on the cluster.
    pub fn uri(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }

    /// Rewrite an incoming request URI onto the cluster, keeping its path
    /// and query untouched.
    pub fn rewrite(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        self.uri(path_and_query)
    }
}
