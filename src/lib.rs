//! # sqlite-shared-db
//!
//! Safe multi-process access to one SQLite database file, for example a host
//! application sharing a database with extensions or background agents.
//!
//! Opening goes through two stages:
//!
//! 1. **Coordination**: exclusive access to the database path is taken across
//!    processes ([`sqlite_path_coordinator`], a `<path>.lock` file with an OS
//!    advisory lock that dies with its process), so only one process at a time
//!    creates or configures the file.
//! 2. **Persistent WAL**: the database is opened in WAL mode and every writer
//!    connection sets `SQLITE_FCNTL_PERSIST_WAL` ([`sqlx_sqlite_conn_mgr`]), so
//!    read-only processes can open the file and see committed writes without
//!    exclusive locks, even after the writer has disconnected.
//!
//! Access is released as soon as the open completes; steady-state concurrency is
//! SQLite's single writer, many readers.
//!
//! ## Usage
//!
//! ```no_run
//! use sqlite_shared_db::{CoordinatedOpener, SqliteDatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Host application: writable, creates the file on first use
//!     let db = sqlite_shared_db::open_shared("group/shared.db").await?;
//!
//!     // Extension process: read-only
//!     let config = SqliteDatabaseConfig {
//!         read_only: true,
//!         ..Default::default()
//!     };
//!     let reader = CoordinatedOpener::new()
//!         .open_shared_with("group/shared.db", config)
//!         .await?;
//!
//!     let rows = sqlx::query("SELECT * FROM notes")
//!         .fetch_all(reader.read_pool()?)
//!         .await?;
//!
//!     reader.close().await?;
//!     db.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! Every cooperating process must pass the identical path string; coordination
//! does not resolve symlinks or relative paths.

mod config;
mod error;
mod opener;

pub use config::SharedDatabaseConfig;
pub use error::{Error, Result};
pub use opener::{CoordinatedOpener, open_shared};

pub use sqlite_path_coordinator::{LockFileCoordinator, LockFileGuard, PathCoordinator};
pub use sqlx_sqlite_conn_mgr::{
   ConnectionInitializer, DatabaseOpener, SqliteDatabase, SqliteDatabaseConfig, WriteGuard,
};

// Crate re-exports for callers that implement their own coordinator or file control
pub use sqlite_path_coordinator;
pub use sqlx_sqlite_conn_mgr;
