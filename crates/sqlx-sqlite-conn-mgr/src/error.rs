//! Error types for sqlx-sqlite-conn-mgr

use sqlx::error::BoxDynError;
use thiserror::Error;

/// Errors that may occur when working with sqlx-sqlite-conn-mgr
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library while using an already open database.
   /// Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// SQLite could not open the database file (bad path, permissions,
   /// corruption, or a read-only open of a file that does not exist)
   #[error("Failed to open database: {0}")]
   EngineOpenFailed(#[source] sqlx::Error),

   /// SQLite rejected `SQLITE_FCNTL_PERSIST_WAL` on a writable connection
   #[error("Failed to enable persistent WAL (SQLite status code {status_code})")]
   PersistenceConfigurationFailed { status_code: i32 },

   /// SQLite refused to report the `SQLITE_FCNTL_PERSIST_WAL` flag
   #[error("Failed to query persistent WAL (SQLite status code {status_code})")]
   PersistenceQueryFailed { status_code: i32 },

   /// A connection initialization step returned an error
   #[error("Connection initialization step '{step}' failed: {source}")]
   HookFailed {
      step: String,
      #[source]
      source: BoxDynError,
   },

   /// The path cannot name a shareable database file
   #[error("Invalid database path '{0}'")]
   InvalidPath(String),

   /// The configuration cannot produce a usable database handle
   #[error("Invalid configuration: {0}")]
   InvalidConfig(String),

   /// Write access was requested from a database opened read-only
   #[error("Database was opened read-only")]
   ReadOnly,

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,
}
