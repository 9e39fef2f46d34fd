//! Analytics record model and search-header parsing.
//!
//! # Responsibilities
//! - Define the stored analytics document and the recording job
//! - Decode `X-Search-*` headers (one URL-unescape on entry)
//! - Parse the narrow typed surface of search responses
//!
//! # Design Decisions
//! - Optional record fields are omitted from the stored JSON entirely
//! - `_source` stays an opaque JSON value re-serialized verbatim; the
//!   underscore rename happens via serde field renames, not on the bytes
//! - `hits.total` accepts both the bare-int and `{value}` response shapes

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::iplookup::Coordinates;
use crate::model::IndexSet;

// Custom headers consumed by the recorder.
pub const X_SEARCH_QUERY: &str = "X-Search-Query";
pub const X_SEARCH_ID: &str = "X-Search-Id";
pub const X_SEARCH_FILTERS: &str = "X-Search-Filters";
pub const X_SEARCH_CLICK: &str = "X-Search-Click";
pub const X_SEARCH_CLICK_POSITION: &str = "X-Search-Click-Position";
pub const X_SEARCH_CONVERSION: &str = "X-Search-Conversion";
pub const X_SEARCH_CUSTOM_EVENT: &str = "X-Search-Custom-Event";

const SEARCH_HEADER_PREFIX: &str = "x-search-";

/// The first ten hits of a search are stored with the record.
pub const MAX_RECORDED_HITS: usize = 10;

/// URL-unescape every `X-Search-*` header once, writing the unescaped value
/// back so downstream handling and recording both see the decoded form.
pub fn decode_search_headers(headers: &mut HeaderMap) -> Result<(), String> {
    let names: Vec<_> = headers
        .keys()
        .filter(|name| name.as_str().starts_with(SEARCH_HEADER_PREFIX))
        .cloned()
        .collect();

    for name in names {
        let raw = match headers.get(&name).and_then(|v| v.to_str().ok()) {
            Some(v) => v.to_string(),
            None => continue,
        };
        let decoded = urlencoding::decode(&raw)
            .map_err(|e| format!("header {}: {}", name, e))?
            .into_owned();
        match HeaderValue::from_str(&decoded) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(e) => return Err(format!("header {}: {}", name, e)),
        }
    }
    Ok(())
}

/// Parse a comma-separated `k:v` list (filters, custom events).
pub fn parse_key_values(raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in raw.split(',') {
        if let Some((key, value)) = pair.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                map.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    map
}

/// One hit as stored in the analytics document. `source` is the hit's
/// `_source` serialized back to a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HitSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub source: String,
}

/// The stored analytics document. A new search fills the search fields; a
/// follow-up event (click/conversion) only fills the event fields, and the
/// store merges it into the existing document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_in_response: Option<Vec<HitSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hits: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_filters: Option<HashMap<String, String>>,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_events: Option<HashMap<String, String>>,
}

/// Everything the recorder snapshots at response time for the background
/// build. Bodies are shared `Bytes`, so the clone into the queue is cheap.
#[derive(Debug, Clone)]
pub struct RecorderJob {
    pub doc_id: String,
    /// True when the caller supplied `X-Search-Id` (click/conversion event
    /// attached to a prior search rather than a new search).
    pub follow_up: bool,
    pub msearch: bool,
    pub body: Bytes,
    pub indices: IndexSet,
    pub search_query: Option<String>,
    pub filters: Option<String>,
    pub click: Option<String>,
    pub click_position: Option<String>,
    pub conversion: Option<String>,
    pub custom_events: Option<String>,
    pub ip: String,
}

impl RecorderJob {
    /// Snapshot the analytics-relevant headers (already unescaped).
    pub fn from_request_parts(
        doc_id: String,
        follow_up: bool,
        msearch: bool,
        headers: &HeaderMap,
        indices: IndexSet,
        peer: Option<SocketAddr>,
        body: Bytes,
    ) -> RecorderJob {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        RecorderJob {
            doc_id,
            follow_up,
            msearch,
            ip: crate::iplookup::client_ip(headers, peer),
            indices,
            search_query: header(X_SEARCH_QUERY),
            filters: header(X_SEARCH_FILTERS),
            click: header(X_SEARCH_CLICK),
            click_position: header(X_SEARCH_CLICK_POSITION),
            conversion: header(X_SEARCH_CONVERSION),
            custom_events: header(X_SEARCH_CUSTOM_EVENT),
            body,
        }
    }
}

// Narrow typed surface over search responses. `_source` is opaque.

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: f64,
    #[serde(default)]
    pub hits: HitsEnvelope,
}

#[derive(Debug, Default, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(i64),
    Object { value: i64 },
}

impl Default for TotalHits {
    fn default() -> Self {
        TotalHits::Count(0)
    }
}

impl TotalHits {
    pub fn value(&self) -> i64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Object { value } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_type", default)]
    pub doc_type: String,
    #[serde(rename = "_source", default)]
    pub source: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct MultiSearchResponse {
    #[serde(default)]
    pub responses: Vec<SearchResponse>,
}
