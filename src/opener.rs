use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sqlite_path_coordinator::{LockFileCoordinator, PathCoordinator};
use sqlx_sqlite_conn_mgr::{DatabaseOpener, SqliteDatabase, SqliteDatabaseConfig};
use tracing::{debug, warn};

use crate::config::SharedDatabaseConfig;
use crate::error::{Error, Result};

/// Opens a shared database while holding exclusive, cross-process access to its path.
///
/// Concurrent opens of the same path, from this process or any other that uses the
/// same coordinator and lock suffix, run one at a time. The first one creates the file,
/// switches it to WAL and enables persistent WAL; the others find it ready. Access is
/// released as soon as the open finishes, so normal query traffic is governed only by
/// SQLite's own locking.
///
/// # Example
///
/// ```no_run
/// use sqlite_shared_db::CoordinatedOpener;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = CoordinatedOpener::new().open_shared("group/shared.db").await?;
///
/// let mut writer = db.acquire_writer().await?;
/// sqlx::query("CREATE TABLE IF NOT EXISTS notes (body TEXT)")
///     .execute(&mut *writer)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CoordinatedOpener<C = LockFileCoordinator> {
   coordinator: C,
   opener: DatabaseOpener,
   timeout: Duration,
   database: SqliteDatabaseConfig,
}

impl Default for CoordinatedOpener<LockFileCoordinator> {
   fn default() -> Self {
      Self::from_config(SharedDatabaseConfig::default())
   }
}

impl CoordinatedOpener<LockFileCoordinator> {
   /// Create an opener coordinating through `<path>.lock` files with a 10 second timeout.
   pub fn new() -> Self {
      Self::default()
   }

   /// Create a lock-file based opener from configuration.
   pub fn from_config(config: SharedDatabaseConfig) -> Self {
      let coordinator = LockFileCoordinator::new()
         .with_suffix(config.lock_suffix.clone())
         .with_poll_interval(config.poll_interval());

      Self {
         coordinator,
         opener: DatabaseOpener::new(),
         timeout: config.coordination_timeout(),
         database: config.database,
      }
   }
}

impl<C: PathCoordinator> CoordinatedOpener<C> {
   /// Create an opener using a custom coordinator and default settings.
   pub fn with_coordinator(coordinator: C) -> Self {
      let defaults = SharedDatabaseConfig::default();
      Self {
         coordinator,
         opener: DatabaseOpener::new(),
         timeout: defaults.coordination_timeout(),
         database: defaults.database,
      }
   }

   /// Replace the database opener (for example one with a custom file control).
   pub fn with_opener(mut self, opener: DatabaseOpener) -> Self {
      self.opener = opener;
      self
   }

   /// Change how long to wait for exclusive access.
   pub fn with_timeout(mut self, timeout: Duration) -> Self {
      self.timeout = timeout;
      self
   }

   /// The coordinator guarding each open
   pub fn coordinator(&self) -> &C {
      &self.coordinator
   }

   /// Open `path` for writing with persistent WAL under exclusive access.
   ///
   /// Uses the configured pool settings, always with write access.
   pub async fn open_shared(&self, path: impl AsRef<Path>) -> Result<Arc<SqliteDatabase>> {
      let config = SqliteDatabaseConfig {
         read_only: false,
         ..self.database.clone()
      };
      self.open_shared_with(path, config).await
   }

   /// Open `path` with `config` under exclusive access.
   ///
   /// Read-only opens are coordinated too, so they never observe a file that another
   /// process is still initializing.
   ///
   /// The path and configuration are checked before coordination starts; rejected
   /// input comes back as [`Error::OpenFailed`] and leaves no lock file behind.
   pub async fn open_shared_with(
      &self,
      path: impl AsRef<Path>,
      config: SqliteDatabaseConfig,
   ) -> Result<Arc<SqliteDatabase>> {
      let path = path.as_ref();
      let opener = self.opener.clone();

      DatabaseOpener::validate(path, &config).map_err(|source| Error::OpenFailed {
         path: path.to_path_buf(),
         source,
      })?;

      debug!(path = %path.display(), read_only = config.read_only, "Opening shared database");

      let opened = self
         .coordinator
         .with_exclusive_access(path, self.timeout, |locked_path| async move {
            opener.open(&locked_path, config).await
         })
         .await
         .map_err(|source| {
            warn!(path = %path.display(), "Could not coordinate database open: {}", source);
            Error::CoordinationFailed {
               path: path.to_path_buf(),
               source,
            }
         })?;

      opened.map_err(|source| Error::OpenFailed {
         path: path.to_path_buf(),
         source,
      })
   }
}

/// Open `path` for writing with a default [`CoordinatedOpener`].
pub async fn open_shared(path: impl AsRef<Path>) -> Result<Arc<SqliteDatabase>> {
   CoordinatedOpener::new().open_shared(path).await
}
