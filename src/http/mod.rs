//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, pipeline layering, graceful shutdown)
//!     → [pipeline classifies, authenticates, validates]
//!     → proxy.rs (URI rewrite, forward, stream response back)
//!     → upstream.rs (shared cluster addressing + pooled client)
//! ```

pub mod proxy;
pub mod server;
pub mod upstream;

pub use server::{AppState, GatewayInner, HttpServer};
pub use upstream::{build_client, Upstream, UpstreamClient};
