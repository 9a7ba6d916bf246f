//! Per-connection initialization steps

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::error::BoxDynError;
use sqlx::sqlite::SqliteConnection;
use tracing::trace;

use crate::Result;
use crate::error::Error;

/// One unit of connection setup, run on every new physical connection
pub trait InitStep: Send + Sync {
   /// Name reported in [`Error::HookFailed`] and in logs
   fn name(&self) -> &str;

   /// Apply the step to a freshly established connection
   fn apply<'c>(
      &'c self,
      conn: &'c mut SqliteConnection,
   ) -> BoxFuture<'c, std::result::Result<(), BoxDynError>>;
}

/// An ordered list of [`InitStep`]s run on every new physical connection before
/// the pool hands it out.
///
/// Steps run in insertion order. The first failing step aborts the connection and
/// is reported as [`Error::HookFailed`]. Steps must tolerate running many times
/// against the same database file, once per connection.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_conn_mgr::ConnectionInitializer;
///
/// let initializer = ConnectionInitializer::new()
///    .sql("PRAGMA foreign_keys = ON")
///    .step("busy_timeout", |conn| {
///       Box::pin(async move {
///          sqlx::query("PRAGMA busy_timeout = 5000").execute(conn).await?;
///          Ok(())
///       })
///    });
///
/// assert_eq!(initializer.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ConnectionInitializer {
   steps: Vec<Arc<dyn InitStep>>,
}

impl ConnectionInitializer {
   /// Create an initializer with no steps
   pub fn new() -> Self {
      Self::default()
   }

   /// Append a step that executes a SQL statement
   pub fn sql(self, sql: impl Into<String>) -> Self {
      self.with_step(SqlStep { sql: sql.into() })
   }

   /// Append a step backed by an async function
   pub fn step<F>(self, name: impl Into<String>, f: F) -> Self
   where
      F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, std::result::Result<(), BoxDynError>>
         + Send
         + Sync
         + 'static,
   {
      self.with_step(FnStep {
         name: name.into(),
         f,
      })
   }

   /// Append a custom [`InitStep`]
   pub fn with_step(mut self, step: impl InitStep + 'static) -> Self {
      self.steps.push(Arc::new(step));
      self
   }

   /// Number of steps
   pub fn len(&self) -> usize {
      self.steps.len()
   }

   /// Whether connections are handed out without extra setup
   pub fn is_empty(&self) -> bool {
      self.steps.is_empty()
   }

   /// Step names in execution order
   pub fn step_names(&self) -> impl Iterator<Item = &str> {
      self.steps.iter().map(|step| step.name())
   }

   pub(crate) async fn run(&self, conn: &mut SqliteConnection) -> Result<()> {
      for step in &self.steps {
         trace!(step = step.name(), "Running connection initialization step");
         step
            .apply(conn)
            .await
            .map_err(|source| Error::HookFailed {
               step: step.name().to_string(),
               source,
            })?;
      }
      Ok(())
   }
}

impl fmt::Debug for ConnectionInitializer {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_list().entries(self.step_names()).finish()
   }
}

struct SqlStep {
   sql: String,
}

impl InitStep for SqlStep {
   fn name(&self) -> &str {
      &self.sql
   }

   fn apply<'c>(
      &'c self,
      conn: &'c mut SqliteConnection,
   ) -> BoxFuture<'c, std::result::Result<(), BoxDynError>> {
      Box::pin(async move {
         sqlx::query(&self.sql).execute(conn).await?;
         Ok(())
      })
   }
}

struct FnStep<F> {
   name: String,
   f: F,
}

impl<F> InitStep for FnStep<F>
where
   F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, std::result::Result<(), BoxDynError>>
      + Send
      + Sync
      + 'static,
{
   fn name(&self) -> &str {
      &self.name
   }

   fn apply<'c>(
      &'c self,
      conn: &'c mut SqliteConnection,
   ) -> BoxFuture<'c, std::result::Result<(), BoxDynError>> {
      (self.f)(conn)
   }
}
