//! SQLite database with connection pooling and optional write access

use crate::Result;
use crate::config::SqliteDatabaseConfig;
use crate::error::Error;
use crate::opener::DatabaseOpener;
use crate::persist_wal::{FileControl, persistent_wal_enabled};
use crate::write_guard::WriteGuard;
use sqlx::{Pool, Sqlite};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// SQLite database with connection pooling for concurrent reads and optional exclusive writes.
///
/// Read queries go through `read_pool()`. Writable handles also own a single writer
/// connection, available through `acquire_writer()`, which runs in WAL mode with
/// persistent WAL enabled from the moment the database is opened.
///
/// Closing the handle is the caller's responsibility.
///
/// # Example
///
/// ```no_run
/// use sqlx_sqlite_conn_mgr::SqliteDatabase;
///
/// # async fn example() -> Result<(), sqlx_sqlite_conn_mgr::Error> {
/// let db = SqliteDatabase::connect("test.db", None).await?;
///
/// // Use read_pool for SELECT queries (concurrent reads)
/// let rows = sqlx::query("SELECT * FROM users")
///     .fetch_all(db.read_pool()?)
///     .await?;
///
/// // Acquire the writer for INSERT/UPDATE/DELETE (exclusive)
/// let mut writer = db.acquire_writer().await?;
/// sqlx::query("INSERT INTO users (name) VALUES (?)")
///     .bind("Alice")
///     .execute(&mut *writer)
///     .await?;
///
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteDatabase {
   /// Pool of read-only connections (defaults to max_connections=6) for concurrent reads
   read_pool: Pool<Sqlite>,

   /// Single read-write connection pool (max_connections=1) for serialized writes.
   /// `None` for read-only handles.
   write_conn: Option<Pool<Sqlite>>,

   /// Used to query the persistent WAL flag on the writer
   file_control: Arc<dyn FileControl>,

   /// Marks database as closed to prevent further operations
   closed: AtomicBool,

   /// Path to database file (used for cleanup)
   path: PathBuf,
}

impl SqliteDatabase {
   pub(crate) fn new(
      read_pool: Pool<Sqlite>,
      write_conn: Option<Pool<Sqlite>>,
      file_control: Arc<dyn FileControl>,
      path: PathBuf,
   ) -> Self {
      Self {
         read_pool,
         write_conn,
         file_control,
         closed: AtomicBool::new(false),
         path,
      }
   }

   /// Connect to a SQLite database
   ///
   /// Shorthand for [`DatabaseOpener::open`] with the default opener. Every call
   /// opens new pools; nothing is cached between calls.
   ///
   /// # Arguments
   ///
   /// * `path` - Path to the SQLite database file (created if missing unless read-only)
   /// * `custom_config` - Optional custom configuration. Pass `None` for a writable
   ///   handle with 6 max read connections and a 30 second idle timeout.
   ///
   /// # Examples
   ///
   /// ```no_run
   /// use sqlx_sqlite_conn_mgr::{SqliteDatabase, SqliteDatabaseConfig};
   ///
   /// # async fn example() -> Result<(), sqlx_sqlite_conn_mgr::Error> {
   /// let custom_config = SqliteDatabaseConfig {
   ///    max_read_connections: 10,
   ///    idle_timeout_secs: 60,
   ///    ..Default::default()
   /// };
   /// let db = SqliteDatabase::connect("test.db", Some(custom_config)).await?;
   /// # Ok(())
   /// # }
   /// ```
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<SqliteDatabaseConfig>,
   ) -> Result<Arc<Self>> {
      DatabaseOpener::new()
         .open(path, custom_config.unwrap_or_default())
         .await
   }

   /// Path this database was opened with
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Whether this handle was opened without write access
   pub fn is_read_only(&self) -> bool {
      self.write_conn.is_none()
   }

   /// Get a reference to the connection pool for executing read queries
   ///
   /// Use this for concurrent read operations. Multiple readers can access
   /// the pool simultaneously.
   pub fn read_pool(&self) -> Result<&Pool<Sqlite>> {
      if self.closed.load(Ordering::SeqCst) {
         return Err(Error::DatabaseClosed);
      }
      Ok(&self.read_pool)
   }

   /// Acquire exclusive write access to the database
   ///
   /// This method returns a `WriteGuard` that provides exclusive access to
   /// the single write connection. Only one writer can exist at a time.
   ///
   /// Returns [`Error::ReadOnly`] for read-only handles.
   pub async fn acquire_writer(&self) -> Result<WriteGuard> {
      if self.closed.load(Ordering::SeqCst) {
         return Err(Error::DatabaseClosed);
      }

      let write_conn = self.write_conn.as_ref().ok_or(Error::ReadOnly)?;

      // Acquire connection from pool (max=1 ensures exclusive access)
      let conn = write_conn.acquire().await?;

      Ok(WriteGuard::new(conn))
   }

   /// Whether the writer connection has persistent WAL enabled
   ///
   /// Always `false` for read-only handles, which never touch the flag.
   pub async fn persist_wal_enabled(&self) -> Result<bool> {
      if self.is_read_only() {
         return Ok(false);
      }

      let mut writer = self.acquire_writer().await?;
      persistent_wal_enabled(&mut writer, self.file_control.as_ref()).await
   }

   /// Close the database and clean up resources
   ///
   /// This closes all connections in the pools. After calling close, any operations
   /// on this database will return `Error::DatabaseClosed`.
   ///
   /// The WAL is checkpointed and truncated, but the `-wal` file itself stays on
   /// disk because persistent WAL is enabled.
   ///
   /// Note: Takes `Arc<Self>` to consume ownership, preventing use-after-close at compile time.
   pub async fn close(self: Arc<Self>) -> Result<()> {
      // Mark as closed
      self.closed.store(true, Ordering::SeqCst);

      // This will await all readers to be returned
      self.read_pool.close().await;

      if let Some(write_conn) = &self.write_conn {
         // Flush the WAL into the database and truncate it before closing the writer
         if let Ok(mut conn) = write_conn.acquire().await {
            let _ = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
               .execute(&mut *conn)
               .await;
         }

         write_conn.close().await;
      }

      Ok(())
   }

   /// Close the database and delete all database files
   ///
   /// This closes all connections and then deletes the database file,
   /// WAL file, and SHM file from disk. Use with caution!
   ///
   /// Other processes with the file open keep their own handles; removing a
   /// shared database out from under them is the caller's decision.
   pub async fn remove(self: Arc<Self>) -> Result<()> {
      // Clone path before closing (since close consumes self)
      let path = self.path.clone();

      // Close all connections and clean up
      self.close().await?;

      // Remove main database file - propagate errors (file should exist)
      std::fs::remove_file(&path).map_err(Error::Io)?;

      // Remove WAL and SHM files - ignore "not found" but propagate other errors
      for suffix in ["-wal", "-shm"] {
         if let Err(e) = std::fs::remove_file(sidecar_path(&path, suffix))
            && e.kind() != std::io::ErrorKind::NotFound
         {
            return Err(Error::Io(e));
         }
      }

      Ok(())
   }
}

/// Path of a file SQLite keeps next to the database (`-wal`, `-shm`)
pub fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
   let mut sidecar = OsString::from(path.as_os_str());
   sidecar.push(suffix);
   PathBuf::from(sidecar)
}
