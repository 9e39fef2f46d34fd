//! Search Gateway Library
//!
//! A reverse proxy in front of a search cluster. Incoming requests are
//! classified (category, operation, indices), authenticated against a
//! user/permission store, validated against the credential's policy and
//! forwarded upstream. Search responses are additionally recorded as
//! analytics events on a background worker pool.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod http;
pub mod iplookup;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
