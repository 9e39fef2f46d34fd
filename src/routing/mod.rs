//! Route declaration and resolution.
//!
//! # Data Flow
//! ```text
//! Plugins declare (method, path template, handler)
//!     → resolver.rs (duplicate detection, method-router merging)
//!     → axum Router (exact matches beat {name} / {*rest} wildcards)
//!     → canonical pipeline layered on top by the server
//! ```
//!
//! # Design Decisions
//! - Duplicate (method, template) pairs are a fatal boot error
//! - Plugin routes register before the catch-all proxy pair
//! - Per-route extra middleware is layered by the plugin onto its handler

pub mod resolver;

pub use resolver::{Plugin, RouteError, RouteResolver, RouteSpec};
