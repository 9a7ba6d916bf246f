use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx_sqlite_conn_mgr::SqliteDatabaseConfig;

use crate::Result;

/// Configuration for coordinated opens of a shared database.
///
/// Hosts usually ship this as JSON next to the application; every field is
/// optional.
///
/// ```
/// use sqlite_shared_db::SharedDatabaseConfig;
///
/// let config = SharedDatabaseConfig::from_json(
///    r#"{ "coordination_timeout_ms": 2000, "database": { "max_read_connections": 2 } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.coordination_timeout_ms, 2000);
/// assert_eq!(config.lock_suffix, ".lock");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedDatabaseConfig {
   /// How long to wait for another process to finish opening the database.
   ///
   /// Default: 10000
   pub coordination_timeout_ms: u64,

   /// Delay between lock attempts while the path is held elsewhere.
   ///
   /// Default: 10
   pub poll_interval_ms: u64,

   /// Suffix of the lock file created next to the database.
   ///
   /// Every cooperating process must use the same suffix.
   ///
   /// Default: ".lock"
   pub lock_suffix: String,

   /// Pool settings for the opened database.
   pub database: SqliteDatabaseConfig,
}

impl Default for SharedDatabaseConfig {
   fn default() -> Self {
      Self {
         coordination_timeout_ms: 10_000,
         poll_interval_ms: 10,
         lock_suffix: sqlite_path_coordinator::DEFAULT_LOCK_SUFFIX.to_string(),
         database: SqliteDatabaseConfig::default(),
      }
   }
}

impl SharedDatabaseConfig {
   /// Parse configuration from JSON.
   pub fn from_json(json: &str) -> Result<Self> {
      Ok(serde_json::from_str(json)?)
   }

   /// How long an open waits for exclusive access.
   ///
   /// Zero still makes one attempt, so an uncontended open succeeds.
   pub fn coordination_timeout(&self) -> Duration {
      Duration::from_millis(self.coordination_timeout_ms)
   }

   /// Delay between lock attempts.
   pub fn poll_interval(&self) -> Duration {
      Duration::from_millis(self.poll_interval_ms)
   }
}
