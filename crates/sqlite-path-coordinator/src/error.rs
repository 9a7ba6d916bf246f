//! Error types for sqlite-path-coordinator

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that may occur while coordinating access to a database path
#[derive(Error, Debug)]
pub enum Error {
   /// Another holder kept the path locked for the whole wait
   #[error("Timed out after {timeout:?} waiting for exclusive access to {}", path.display())]
   Timeout { path: PathBuf, timeout: Duration },

   /// The lock file could not be opened or created (missing directory,
   /// permission denied, read-only filesystem, ...)
   #[error("Failed to open lock file {}: {source}", path.display())]
   LockFile {
      path: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// The platform locking facility reported something other than contention
   #[error("Failed to lock {}: {source}", path.display())]
   Lock {
      path: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// An empty lock suffix would make the database file its own lock file
   #[error("Lock file suffix must not be empty")]
   EmptySuffix,

   /// The path cannot name a coordinated resource
   #[error("Invalid coordination path '{}'", .0.display())]
   InvalidPath(PathBuf),
}

impl Error {
   /// Returns `true` when the failure was a bounded wait running out.
   pub fn is_timeout(&self) -> bool {
      matches!(self, Error::Timeout { .. })
   }
}
