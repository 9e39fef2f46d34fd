//! The request pipeline: the composable middleware chain that turns an
//! incoming HTTP request into (category, operation, indices, credential)
//! and gates it against the credential's policy.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → classify.rs  (category, operation, indices into context)
//!     → analytics recorder (wraps the rest; see analytics::recorder)
//!     → auth.rs      (Basic auth → Credential into context)
//!     → validate.rs  (indices, operation, category against policy)
//!     → terminal handler (upstream proxy or plugin route)
//! ```
//!
//! # Design Decisions
//! - Middlewares are applied FIFO: listed order is wrap order
//! - Each middleware writes at most one context key, validators write none
//! - Classification precedes auth (policy is stated in its terms);
//!   validators follow auth; the recorder sits inside classification so it
//!   can read category and indices
//! - Failures short-circuit with a JSON error and never call inward

pub mod auth;
pub mod classify;
pub mod context;
pub mod error;
pub mod validate;

pub use error::PipelineError;
