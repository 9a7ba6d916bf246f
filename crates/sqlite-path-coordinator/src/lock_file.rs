//! Sibling lock file coordination backed by OS advisory locks

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::Result;
use crate::coordinator::PathCoordinator;
use crate::error::Error;

/// Default suffix appended to the database path to name its lock file
pub const DEFAULT_LOCK_SUFFIX: &str = ".lock";

/// Default delay between lock attempts while another holder owns the path
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Coordinates access through an exclusive advisory lock on `<path>.lock`.
///
/// The lock is taken with `flock(2)` on Unix and `LockFileEx` on Windows. Both are
/// released by the operating system when the owning process exits for any reason,
/// so a crashed holder never blocks later callers past its own lifetime.
///
/// Every acquisition opens its own file handle, so two acquirers in the same
/// process exclude each other exactly like two processes do.
///
/// The lock file itself is left on disk after release. Deleting it would let a
/// waiter lock an unlinked inode while a newcomer locks a fresh file.
#[derive(Debug, Clone)]
pub struct LockFileCoordinator {
   suffix: OsString,
   poll_interval: Duration,
}

impl Default for LockFileCoordinator {
   fn default() -> Self {
      Self {
         suffix: OsString::from(DEFAULT_LOCK_SUFFIX),
         poll_interval: DEFAULT_POLL_INTERVAL,
      }
   }
}

impl LockFileCoordinator {
   /// Create a coordinator using `.lock` files and a 10ms poll interval
   pub fn new() -> Self {
      Self::default()
   }

   /// Use a different suffix for lock files
   ///
   /// The suffix must not be empty; acquiring with an empty suffix fails with
   /// [`Error::EmptySuffix`].
   pub fn with_suffix(mut self, suffix: impl Into<OsString>) -> Self {
      self.suffix = suffix.into();
      self
   }

   /// Change how often a contended lock is retried
   pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
      self.poll_interval = poll_interval;
      self
   }

   /// Path of the lock file guarding `path`
   ///
   /// The suffix is appended textually, so `data/app.db` maps to `data/app.db.lock`.
   pub fn lock_path(&self, path: &Path) -> Result<PathBuf> {
      if self.suffix.is_empty() {
         return Err(Error::EmptySuffix);
      }

      if path.file_name().is_none() {
         return Err(Error::InvalidPath(path.to_path_buf()));
      }

      let mut lock_path = path.as_os_str().to_owned();
      lock_path.push(&self.suffix);
      Ok(PathBuf::from(lock_path))
   }
}

impl PathCoordinator for LockFileCoordinator {
   type Guard = LockFileGuard;

   async fn acquire(&self, path: &Path, timeout: Duration) -> Result<LockFileGuard> {
      let lock_path = self.lock_path(path)?;

      let file = OpenOptions::new()
         .create(true)
         .truncate(false)
         .read(true)
         .write(true)
         .open(&lock_path)
         .map_err(|source| Error::LockFile {
            path: lock_path.clone(),
            source,
         })?;

      let started = Instant::now();
      let deadline = started + timeout;

      loop {
         match fs2::FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
               debug!(
                  lock_path = %lock_path.display(),
                  waited_ms = started.elapsed().as_millis() as u64,
                  "Acquired exclusive access"
               );
               return Ok(LockFileGuard { file, lock_path });
            }
            Err(e) if is_contended(&e) => {}
            Err(source) => {
               return Err(Error::Lock {
                  path: lock_path,
                  source,
               });
            }
         }

         let now = Instant::now();
         if now >= deadline {
            warn!(
               lock_path = %lock_path.display(),
               timeout_ms = timeout.as_millis() as u64,
               "Gave up waiting for exclusive access"
            );
            return Err(Error::Timeout {
               path: path.to_path_buf(),
               timeout,
            });
         }

         trace!(lock_path = %lock_path.display(), "Lock is held elsewhere, retrying");
         tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
      }
   }
}

fn is_contended(error: &std::io::Error) -> bool {
   error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Exclusive ownership of a lock file, released on drop
#[derive(Debug)]
pub struct LockFileGuard {
   file: File,
   lock_path: PathBuf,
}

impl LockFileGuard {
   /// Path of the locked file
   pub fn lock_path(&self) -> &Path {
      &self.lock_path
   }
}

impl Drop for LockFileGuard {
   fn drop(&mut self) {
      // Closing the handle releases the lock as well; unlocking first makes the
      // release visible to waiters before the close completes
      if let Err(e) = fs2::FileExt::unlock(&self.file) {
         warn!(lock_path = %self.lock_path.display(), "Failed to unlock: {}", e);
      }
      trace!(lock_path = %self.lock_path.display(), "Released exclusive access");
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use tempfile::TempDir;

   #[test]
   fn test_lock_path_appends_suffix() {
      let coordinator = LockFileCoordinator::new();
      let lock_path = coordinator.lock_path(Path::new("data/app.db")).unwrap();
      assert_eq!(lock_path, PathBuf::from("data/app.db.lock"));

      let coordinator = LockFileCoordinator::new().with_suffix(".coord");
      let lock_path = coordinator.lock_path(Path::new("app.db")).unwrap();
      assert_eq!(lock_path, PathBuf::from("app.db.coord"));
   }

   #[test]
   fn test_lock_path_rejects_paths_without_file_name() {
      let coordinator = LockFileCoordinator::new();

      for path in ["", "/", ".."] {
         let result = coordinator.lock_path(Path::new(path));
         assert!(
            matches!(result, Err(Error::InvalidPath(_))),
            "'{}' should be rejected",
            path
         );
      }
   }

   #[tokio::test]
   async fn test_empty_suffix_is_rejected_without_touching_the_database() {
      let dir = TempDir::new().unwrap();
      let db_path = dir.path().join("app.db");
      let coordinator = LockFileCoordinator::new().with_suffix("");

      assert!(matches!(coordinator.lock_path(&db_path), Err(Error::EmptySuffix)));

      let err = coordinator
         .acquire(&db_path, Duration::from_millis(10))
         .await
         .unwrap_err();
      assert!(matches!(err, Error::EmptySuffix), "got {err:?}");
      assert!(!db_path.exists(), "the database file must not be created as a lock file");
   }

   #[tokio::test]
   async fn test_zero_timeout_still_tries_once() {
      let dir = TempDir::new().unwrap();
      let db_path = dir.path().join("instant.db");
      let coordinator = LockFileCoordinator::new();

      let guard = coordinator
         .acquire(&db_path, Duration::ZERO)
         .await
         .expect("a free path is taken on the first attempt");

      let err = coordinator
         .acquire(&db_path, Duration::ZERO)
         .await
         .unwrap_err();
      assert!(err.is_timeout(), "got {err:?}");

      drop(guard);
   }

   #[tokio::test]
   async fn test_second_acquire_times_out_while_held() {
      let dir = TempDir::new().unwrap();
      let db_path = dir.path().join("held.db");
      let coordinator = LockFileCoordinator::new();

      let guard = coordinator
         .acquire(&db_path, Duration::from_millis(100))
         .await
         .unwrap();
      assert!(guard.lock_path().exists());

      let started = Instant::now();
      let err = coordinator
         .acquire(&db_path, Duration::from_millis(50))
         .await
         .unwrap_err();

      assert!(err.is_timeout(), "expected timeout, got {err:?}");
      assert!(started.elapsed() >= Duration::from_millis(50));

      drop(guard);

      coordinator
         .acquire(&db_path, Duration::from_millis(50))
         .await
         .expect("lock should be free after the guard is dropped");
   }

   #[tokio::test]
   async fn test_lock_file_survives_release() {
      let dir = TempDir::new().unwrap();
      let db_path = dir.path().join("kept.db");
      let coordinator = LockFileCoordinator::new();

      let guard = coordinator
         .acquire(&db_path, Duration::from_secs(1))
         .await
         .unwrap();
      let lock_path = guard.lock_path().to_path_buf();
      drop(guard);

      assert!(lock_path.exists(), "lock file must not be deleted on release");
   }

   #[tokio::test]
   async fn test_missing_directory_reports_lock_file_error() {
      let dir = TempDir::new().unwrap();
      let db_path = dir.path().join("missing").join("app.db");

      let err = LockFileCoordinator::new()
         .acquire(&db_path, Duration::from_millis(10))
         .await
         .unwrap_err();

      assert!(matches!(err, Error::LockFile { .. }), "got {err:?}");
   }
}
