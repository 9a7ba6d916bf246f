//! # sqlite-path-coordinator
//!
//! Cross-process mutual exclusion scoped to a filesystem path, used to serialize
//! the moment a shared SQLite database is created and configured.
//!
//! ## Core Types
//!
//! - **[`PathCoordinator`]**: The coordination seam; `acquire` a guard or run a
//!   closure under [`PathCoordinator::with_exclusive_access`]
//! - **[`LockFileCoordinator`]**: Sibling lock file (`<path>.lock`) plus an OS advisory
//!   lock, released automatically if the holding process dies
//! - **[`LockFileGuard`]**: RAII guard; dropping it releases the path
//! - **[`Error`]**: Error type for coordination failures
//!
//! ## Usage
//!
//! ```no_run
//! use sqlite_path_coordinator::{LockFileCoordinator, PathCoordinator};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> sqlite_path_coordinator::Result<()> {
//!     let coordinator = LockFileCoordinator::new();
//!
//!     // Blocks other coordinated callers (in any process) until dropped
//!     let guard = coordinator
//!         .acquire(Path::new("shared.db"), Duration::from_secs(5))
//!         .await?;
//!
//!     // ... create or configure shared.db ...
//!
//!     drop(guard);
//!     Ok(())
//! }
//! ```
//!
mod coordinator;
mod error;
mod lock_file;

pub use coordinator::PathCoordinator;
pub use error::Error;
pub use lock_file::{DEFAULT_LOCK_SUFFIX, DEFAULT_POLL_INTERVAL, LockFileCoordinator, LockFileGuard};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
