//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Ensure analytics index → Resolve routes
//!     → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast → server stops accepting,
//!     analytics workers drain their queue, tasks exit
//! ```

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
