use std::path::PathBuf;

use serde::{Serialize, Serializer};
use sqlx_sqlite_conn_mgr::Error as OpenError;
use sqlite_path_coordinator::Error as CoordinationError;

/// Result type alias for shared database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for hosts that forward errors over IPC.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   message: String,
}

/// Error types for opening a shared database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Exclusive access to the path could not be obtained; the database was
   /// never touched.
   #[error("could not coordinate access to {}: {source}", path.display())]
   CoordinationFailed {
      path: PathBuf,
      #[source]
      source: CoordinationError,
   },

   /// The open ran under coordination and failed.
   #[error("failed to open shared database {}: {source}", path.display())]
   OpenFailed {
      path: PathBuf,
      #[source]
      source: OpenError,
   },

   /// Shared database configuration could not be parsed.
   #[error("invalid configuration: {0}")]
   Config(#[from] serde_json::Error),
}

impl Error {
   /// `true` when the open was never attempted.
   pub fn is_coordination_failure(&self) -> bool {
      matches!(self, Error::CoordinationFailed { .. })
   }

   /// The connection manager error, when the open was attempted and failed.
   pub fn open_error(&self) -> Option<&OpenError> {
      match self {
         Error::OpenFailed { source, .. } => Some(source),
         _ => None,
      }
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for hosts relaying failures.
   pub fn error_code(&self) -> String {
      match self {
         Error::CoordinationFailed { source, .. } => {
            let code = match source {
               CoordinationError::Timeout { .. } => "COORDINATION_TIMEOUT",
               CoordinationError::LockFile { .. } => "COORDINATION_LOCK_FILE",
               CoordinationError::Lock { .. } => "COORDINATION_UNAVAILABLE",
               CoordinationError::InvalidPath(_) => "INVALID_PATH",
               CoordinationError::EmptySuffix => "INVALID_CONFIG",
            };
            code.to_string()
         }
         Error::OpenFailed { source, .. } => match source {
            OpenError::EngineOpenFailed(e) => {
               // Extract SQLite error codes from sqlx errors
               if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
                  return format!("SQLITE_{}", code);
               }
               "ENGINE_OPEN_FAILED".to_string()
            }
            OpenError::PersistenceConfigurationFailed { .. } => {
               "PERSISTENCE_CONFIGURATION_FAILED".to_string()
            }
            OpenError::HookFailed { .. } => "HOOK_FAILED".to_string(),
            OpenError::InvalidPath(_) => "INVALID_PATH".to_string(),
            OpenError::InvalidConfig(_) => "INVALID_CONFIG".to_string(),
            _ => "CONNECTION_ERROR".to_string(),
         },
         Error::Config(_) => "INVALID_CONFIG".to_string(),
      }
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      let response = ErrorResponse {
         code: self.error_code(),
         message: self.to_string(),
      };
      response.serialize(serializer)
   }
}
