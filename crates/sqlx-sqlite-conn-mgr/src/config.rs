//! Configuration for opening a SQLite database

use serde::{Deserialize, Serialize};

use crate::initializer::ConnectionInitializer;

/// Configuration for opening a [`SqliteDatabase`](crate::SqliteDatabase)
///
/// Built fresh for every open; nothing here is persisted.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_conn_mgr::{ConnectionInitializer, SqliteDatabaseConfig};
///
/// // Use defaults (writable, persistent WAL)
/// let config = SqliteDatabaseConfig::default();
///
/// // Read-only access from a satellite process
/// let config = SqliteDatabaseConfig {
///     read_only: true,
///     ..Default::default()
/// };
///
/// // Run extra setup on every connection
/// let config = SqliteDatabaseConfig::default()
///     .with_initializer(ConnectionInitializer::new().sql("PRAGMA foreign_keys = ON"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteDatabaseConfig {
   /// Open without write access
   ///
   /// Read-only handles have no writer connection and never touch the persistent
   /// WAL flag. The database file must already exist.
   ///
   /// Default: false
   pub read_only: bool,

   /// Maximum number of concurrent read connections
   ///
   /// This controls the size of the read-only connection pool.
   /// Higher values allow more concurrent read queries but consume more resources.
   ///
   /// Default: 6
   pub max_read_connections: u32,

   /// Idle timeout for both read and write connections (in seconds)
   ///
   /// Connections that remain idle for this duration will be closed automatically.
   /// This helps prevent resource exhaustion from idle threads.
   ///
   /// Default: 30
   pub idle_timeout_secs: u64,

   /// Steps run on every new physical connection before it is used
   ///
   /// Not serialized; always empty after deserialization.
   #[serde(skip)]
   pub initializer: ConnectionInitializer,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         read_only: false,
         max_read_connections: 6,
         idle_timeout_secs: 30,
         initializer: ConnectionInitializer::default(),
      }
   }
}

impl SqliteDatabaseConfig {
   /// Replace the connection initializer
   pub fn with_initializer(mut self, initializer: ConnectionInitializer) -> Self {
      self.initializer = initializer;
      self
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_partial_json_uses_defaults() {
      let config: SqliteDatabaseConfig =
         serde_json::from_str(r#"{ "read_only": true }"#).unwrap();

      assert!(config.read_only);
      assert_eq!(config.max_read_connections, 6);
      assert_eq!(config.idle_timeout_secs, 30);
      assert!(config.initializer.is_empty());
   }

   #[test]
   fn test_initializer_is_not_serialized() {
      let config = SqliteDatabaseConfig::default()
         .with_initializer(ConnectionInitializer::new().sql("PRAGMA foreign_keys = ON"));

      let json = serde_json::to_value(&config).unwrap();
      assert!(json.get("initializer").is_none());
      assert_eq!(json["max_read_connections"], 6);
   }
}
