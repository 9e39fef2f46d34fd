//! Search-analytics subsystem.
//!
//! # Data Flow
//! ```text
//! Search request (classified, X-Search-* headers decoded)
//!     → recorder.rs (buffer response, mint doc id, enqueue job)
//!     → client gets the response with X-Search-Id
//!     → worker.rs  (bounded queue + pool, builds the record)
//!     → store.rs   (upsert-merge into the analytics index)
//!
//! GET /_analytics
//!     → handlers.rs → store.rs (raw query)
//! ```
//!
//! # Design Decisions
//! - One search and its follow-up clicks/conversions share one doc id;
//!   the store merges whichever write lands first
//! - Recording failures never reach the client

use axum::http::Method;
use axum::routing::get;

use crate::routing::{Plugin, RouteSpec};

pub mod handlers;
pub mod record;
pub mod recorder;
pub mod store;
pub mod worker;

pub use record::{AnalyticsRecord, RecorderJob};
pub use store::{AnalyticsStore, StoreError};
pub use worker::{spawn_workers, RecorderQueue};

/// Registers the analytics read API.
pub struct AnalyticsPlugin;

impl Plugin for AnalyticsPlugin {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![RouteSpec::new(
            Method::GET,
            "/_analytics",
            get(handlers::get_analytics),
        )]
    }
}
