//! The path coordination seam

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Result;

/// Grants exclusive, short-lived ownership of a filesystem path across processes.
///
/// Implementations must release ownership when the guard is dropped and must not
/// leave state behind that outlives a crashed holder. An in-process mutex does not
/// satisfy this contract; an OS-level lock tied to the process does.
///
/// Coordination is keyed on the path exactly as given. Two processes using
/// different spellings of the same file are not serialized against each other.
pub trait PathCoordinator: Send + Sync {
   /// Token representing ownership; ownership ends when it is dropped
   type Guard: Send;

   /// Wait up to `timeout` for exclusive access to `path`.
   fn acquire(
      &self,
      path: &Path,
      timeout: Duration,
   ) -> impl Future<Output = Result<Self::Guard>> + Send;

   /// Run `body` while holding exclusive access to `path`.
   ///
   /// The guard is dropped as soon as `body` completes, and also when `body`
   /// panics or its future is dropped before completion.
   ///
   /// # Example
   ///
   /// ```no_run
   /// use sqlite_path_coordinator::{LockFileCoordinator, PathCoordinator};
   /// use std::path::Path;
   /// use std::time::Duration;
   ///
   /// # async fn example() -> sqlite_path_coordinator::Result<()> {
   /// let coordinator = LockFileCoordinator::new();
   /// let created = coordinator
   ///    .with_exclusive_access(Path::new("shared.db"), Duration::from_secs(5), |path| async move {
   ///       !path.exists()
   ///    })
   ///    .await?;
   /// # Ok(())
   /// # }
   /// ```
   fn with_exclusive_access<F, Fut, T>(
      &self,
      path: &Path,
      timeout: Duration,
      body: F,
   ) -> impl Future<Output = Result<T>> + Send
   where
      F: FnOnce(PathBuf) -> Fut + Send,
      Fut: Future<Output = T> + Send,
      T: Send,
   {
      async move {
         let guard = self.acquire(path, timeout).await?;
         let output = body(path.to_path_buf()).await;
         drop(guard);
         Ok(output)
      }
   }
}
