//! Core request-classification domain types.
//!
//! # Data Flow
//! ```text
//! Incoming (method, path, body)
//!     → category.rs  (functional class: Search, Docs, Cat, ...)
//!     → operation.rs (abstract action: Read, Write, Delete)
//!     → index.rs     (set of index names touched)
//!
//! Credential policy (credential.rs) is stated in terms of the same three
//! types; the pipeline validators compare one against the other.
//! ```
//!
//! # Design Decisions
//! - Classification is total: unresolved inputs fall to Misc / Read / empty
//! - All three outputs are set exactly once per request, never mutated
//! - Policy sets serialize as lowercase strings for config and store docs

pub mod category;
pub mod credential;
pub mod index;
pub mod operation;

pub use category::Category;
pub use credential::{Credential, PermissionRecord, UserRecord};
pub use index::IndexSet;
pub use operation::Operation;
