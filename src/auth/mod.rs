//! Credential storage subsystem.
//!
//! # Data Flow
//! ```text
//! Authenticator middleware
//!     → cache.rs  (TTL cache over usernames, dashmap)
//!     → store.rs  (CredentialStore trait)
//!         → ClusterCredentialStore (user/permission indices upstream)
//!         → MemoryCredentialStore  (config-seeded, tests and bootstrap)
//! ```
//!
//! # Design Decisions
//! - The store is a trait seam; the pipeline never sees which impl runs
//! - The cache stores raw records; precedence and expiry are re-evaluated
//!   on every request so a cached permission still expires on time

pub mod cache;
pub mod store;

pub use cache::CredentialCache;
pub use store::{AuthStoreError, ClusterCredentialStore, CredentialStore, MemoryCredentialStore};
