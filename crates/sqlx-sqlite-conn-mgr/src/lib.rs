//! # sqlx-sqlite-conn-mgr
//!
//! A minimal wrapper around SQLx that opens SQLite database files so they can be
//! shared with other processes.
//!
//! ## Core Types
//!
//! - **[`DatabaseOpener`]**: Opens a database file and prepares every connection it uses
//! - **[`SqliteDatabase`]**: Open database with separate read and write connection pools
//! - **[`SqliteDatabaseConfig`]**: Read-only flag, pool settings and connection initializer
//! - **[`ConnectionInitializer`]**: Ordered steps run on each new physical connection
//! - **[`FileControl`]**: Seam over `sqlite3_file_control` for `SQLITE_FCNTL_PERSIST_WAL`
//! - **[`WriteGuard`]**: RAII guard ensuring exclusive write access
//! - **[`Error`]**: Error type for database operations
//!
//! ## Architecture
//!
//! - **Connection pooling**: Separate read-only pool and write pool with a max of 1 connection
//! - **Eager WAL mode**: Writable opens switch the file to Write-Ahead Logging immediately
//! - **Persistent WAL**: Every writer connection sets `SQLITE_FCNTL_PERSIST_WAL`, so the
//!   `-wal` file is kept when connections close and read-only processes can still open
//!   the database; if SQLite rejects the flag the open fails
//! - **Concurrent reads**: Multiple readers can query simultaneously via the read pool
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx_sqlite_conn_mgr::{SqliteDatabase, SqliteDatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_conn_mgr::Result<()> {
//!     // Writer process
//!     let db = SqliteDatabase::connect("example.db", None).await?;
//!
//!     let mut writer = db.acquire_writer().await?;
//!     sqlx::query("INSERT INTO users (name) VALUES (?)")
//!         .bind("Alice")
//!         .execute(&mut *writer)
//!         .await?;
//!     drop(writer);
//!
//!     // Reader process
//!     let config = SqliteDatabaseConfig {
//!         read_only: true,
//!         ..Default::default()
//!     };
//!     let reader = SqliteDatabase::connect("example.db", Some(config)).await?;
//!     let rows = sqlx::query("SELECT * FROM users")
//!         .fetch_all(reader.read_pool()?)
//!         .await?;
//!
//!     reader.close().await?;
//!     db.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! Opening is not coordinated across processes here; callers that may race to
//! create the same file should serialize their opens.
//!
mod config;
mod database;
mod error;
mod initializer;
mod opener;
mod persist_wal;
mod write_guard;

// Re-export public types
pub use config::SqliteDatabaseConfig;
pub use database::{SqliteDatabase, sidecar_path};
pub use error::Error;
pub use initializer::{ConnectionInitializer, InitStep};
pub use opener::DatabaseOpener;
pub use persist_wal::{FileControl, RawConnection, SqliteFileControl};
pub use write_guard::WriteGuard;

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
