//! Opening a database file with per-connection preparation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{
   SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{ConnectOptions, Connection, Pool, Sqlite};
use tracing::{debug, error, warn};

use crate::Result;
use crate::config::SqliteDatabaseConfig;
use crate::database::SqliteDatabase;
use crate::error::Error;
use crate::initializer::ConnectionInitializer;
use crate::persist_wal::{FileControl, SqliteFileControl, enable_persistent_wal};

/// Opens SQLite database files and prepares every connection they use.
///
/// For writable opens, each writer connection gets `SQLITE_FCNTL_PERSIST_WAL`
/// before anything else runs on it, so the `-wal` file outlives this process's
/// connections and read-only processes can keep opening the database. If SQLite
/// refuses the flag the open fails; no handle without persistent WAL is returned.
///
/// # Example
///
/// ```no_run
/// use sqlx_sqlite_conn_mgr::{DatabaseOpener, SqliteDatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx_sqlite_conn_mgr::Error> {
/// let db = DatabaseOpener::new()
///     .open("shared.db", SqliteDatabaseConfig::default())
///     .await?;
/// assert!(db.persist_wal_enabled().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseOpener {
   file_control: Arc<dyn FileControl>,
}

impl Default for DatabaseOpener {
   fn default() -> Self {
      Self::with_file_control(SqliteFileControl)
   }
}

impl DatabaseOpener {
   /// Create an opener that talks to SQLite directly
   pub fn new() -> Self {
      Self::default()
   }

   /// Create an opener that issues file-control commands through `file_control`
   pub fn with_file_control(file_control: impl FileControl + 'static) -> Self {
      Self {
         file_control: Arc::new(file_control),
      }
   }

   /// Check `path` and `config` without touching the filesystem
   ///
   /// Returns the path [`open`](Self::open) would use. Callers that do work before
   /// opening (taking a lock, creating directories) can reject bad input first.
   pub fn validate(path: impl AsRef<Path>, config: &SqliteDatabaseConfig) -> Result<PathBuf> {
      let path = validate_path(path.as_ref())?;

      if config.max_read_connections == 0 {
         return Err(Error::InvalidConfig(
            "max_read_connections must be at least 1".to_string(),
         ));
      }

      Ok(path)
   }

   /// Open the database at `path`
   ///
   /// Writable opens create the file if it is missing, switch it to WAL and enable
   /// persistent WAL on every writer connection. Read-only opens require an
   /// existing file and never issue the persistent WAL command.
   ///
   /// The first connection is established and prepared before any pool exists, so
   /// failures come back as [`Error::EngineOpenFailed`],
   /// [`Error::PersistenceConfigurationFailed`] or [`Error::HookFailed`]. Anything
   /// opened before a failure is closed again. Invalid input is rejected with
   /// [`Error::InvalidPath`] or [`Error::InvalidConfig`] before any connection is made.
   pub async fn open(
      &self,
      path: impl AsRef<Path>,
      config: SqliteDatabaseConfig,
   ) -> Result<Arc<SqliteDatabase>> {
      let path = Self::validate(path, &config)?;
      let idle_timeout = Duration::from_secs(config.idle_timeout_secs);

      debug!(path = %path.display(), read_only = config.read_only, "Opening database");

      let write_conn = if config.read_only {
         None
      } else {
         let hook = Arc::new(PrepareHook {
            read_only: false,
            file_control: Arc::clone(&self.file_control),
            initializer: config.initializer.clone(),
         });

         let write_options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .read_only(false)
            .journal_mode(SqliteJournalMode::Wal)
            // https://www.sqlite.org/wal.html#performance_considerations
            .synchronous(SqliteSynchronous::Normal);

         Some(open_pool(&hook, write_options, 1, idle_timeout).await?)
      };

      let read_hook = Arc::new(PrepareHook {
         read_only: true,
         file_control: Arc::clone(&self.file_control),
         initializer: config.initializer,
      });

      let read_options = SqliteConnectOptions::new().filename(&path).read_only(true);

      let max_readers = config.max_read_connections;
      let read_pool = match open_pool(&read_hook, read_options, max_readers, idle_timeout).await {
         Ok(pool) => pool,
         Err(e) => {
            if let Some(write_conn) = write_conn {
               write_conn.close().await;
            }
            return Err(e);
         }
      };

      debug!(path = %path.display(), "Database opened");

      Ok(Arc::new(SqliteDatabase::new(
         read_pool,
         write_conn,
         Arc::clone(&self.file_control),
         path,
      )))
   }
}

/// The work done on each new physical connection before it is handed out
#[derive(Debug)]
struct PrepareHook {
   read_only: bool,
   file_control: Arc<dyn FileControl>,
   initializer: ConnectionInitializer,
}

impl PrepareHook {
   async fn prepare(&self, conn: &mut SqliteConnection) -> Result<()> {
      if !self.read_only {
         enable_persistent_wal(conn, self.file_control.as_ref()).await?;
      }
      self.initializer.run(conn).await
   }
}

/// Open a pool whose connections all pass through `hook`
///
/// A first connection is established and prepared by hand, then kept open until
/// the pool has its own. The pool's `after_connect` retries failed connections
/// until its acquire timeout and loses the original error, so preparing the first
/// connection directly is what surfaces a typed error to the caller.
async fn open_pool(
   hook: &Arc<PrepareHook>,
   options: SqliteConnectOptions,
   max_connections: u32,
   idle_timeout: Duration,
) -> Result<Pool<Sqlite>> {
   let mut first = options.connect().await.map_err(Error::EngineOpenFailed)?;

   if let Err(e) = hook.prepare(&mut first).await {
      close_quietly(first).await;
      return Err(e);
   }

   let pool_hook = Arc::clone(hook);
   let pool = SqlitePoolOptions::new()
      .max_connections(max_connections)
      .min_connections(0)
      .idle_timeout(Some(idle_timeout))
      .after_connect(move |conn, _meta| {
         let hook = Arc::clone(&pool_hook);
         Box::pin(async move {
            hook.prepare(conn).await.map_err(|e| {
               error!("Failed to prepare pooled connection: {}", e);
               sqlx::Error::Configuration(Box::new(e))
            })
         })
      })
      .connect_with(options)
      .await
      .map_err(Error::EngineOpenFailed);

   close_quietly(first).await;
   pool
}

async fn close_quietly(conn: SqliteConnection) {
   if let Err(e) = conn.close().await {
      warn!("Failed to close setup connection: {}", e);
   }
}

fn validate_path(path: &Path) -> Result<PathBuf> {
   if path.as_os_str().is_empty() {
      return Err(Error::InvalidPath(String::new()));
   }

   // Each in-memory connection is its own private database
   if path == Path::new(":memory:") {
      return Err(Error::InvalidPath(":memory:".to_string()));
   }

   Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_validate_path() {
      assert!(matches!(validate_path(Path::new("")), Err(Error::InvalidPath(_))));
      assert!(matches!(
         validate_path(Path::new(":memory:")),
         Err(Error::InvalidPath(_))
      ));
      assert_eq!(
         validate_path(Path::new("data/app.db")).unwrap(),
         PathBuf::from("data/app.db")
      );
   }

   #[test]
   fn test_validate_rejects_empty_read_pool() {
      let config = SqliteDatabaseConfig {
         max_read_connections: 0,
         ..Default::default()
      };

      assert!(matches!(
         DatabaseOpener::validate("data/app.db", &config),
         Err(Error::InvalidConfig(_))
      ));
      assert!(matches!(
         DatabaseOpener::validate(":memory:", &SqliteDatabaseConfig::default()),
         Err(Error::InvalidPath(_))
      ));
   }
}
