//! Persistent WAL control through `sqlite3_file_control`
//!
//! SQLite deletes the `-wal` file when the last connection to a database closes.
//! A process that can only open the database read-only cannot recreate it, so once
//! the writer goes away such readers fail to open the file at all. Setting
//! `SQLITE_FCNTL_PERSIST_WAL` on the writer keeps the `-wal` file on disk.
//!
//! See <https://www.sqlite.org/c3ref/c_fcntl_begin_atomic_write.html#sqlitefcntlpersistwal>
//! and <https://www.sqlite.org/walformat.html#operations_that_require_locks_and_which_locks_those_operations_use>

use std::ffi::{c_int, c_void};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use libsqlite3_sys::{SQLITE_FCNTL_PERSIST_WAL, SQLITE_OK, sqlite3, sqlite3_file_control};
use sqlx::sqlite::{LockedSqliteHandle, SqliteConnection};
use tracing::{error, trace};

use crate::Result;
use crate::error::Error;

/// A raw `sqlite3` handle borrowed from a locked sqlx connection.
///
/// Can only be created inside this crate, from a handle that stays locked for the
/// borrow, so the pointer is always valid while a `RawConnection` exists.
pub struct RawConnection<'h> {
   db: NonNull<sqlite3>,
   _handle: PhantomData<&'h mut ()>,
}

impl<'h> RawConnection<'h> {
   pub(crate) fn new(handle: &'h mut LockedSqliteHandle<'_>) -> Self {
      Self {
         db: handle.as_raw_handle(),
         _handle: PhantomData,
      }
   }

   /// The underlying `sqlite3*`, valid for the lifetime of this value
   pub fn as_ptr(&self) -> *mut sqlite3 {
      self.db.as_ptr()
   }
}

/// Issues the persistent WAL file-control command against a connection.
///
/// [`SqliteFileControl`] calls into SQLite. Other implementations exist so tests can
/// observe or fail the call without a misbehaving SQLite build.
pub trait FileControl: Send + Sync + fmt::Debug {
   /// Run `SQLITE_FCNTL_PERSIST_WAL` on the main database file of `conn`.
   ///
   /// `flag` follows SQLite's in/out convention: `1` or `0` sets the flag, `-1`
   /// only queries it. On success SQLite writes the current value back into `flag`.
   /// Returns the SQLite result code.
   fn persist_wal(&self, conn: RawConnection<'_>, flag: &mut c_int) -> c_int;
}

/// The real [`FileControl`], backed by `sqlite3_file_control`
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteFileControl;

impl FileControl for SqliteFileControl {
   fn persist_wal(&self, conn: RawConnection<'_>, flag: &mut c_int) -> c_int {
      // SAFETY: conn holds a pointer from a locked sqlx handle, valid for this call.
      // A null schema name targets "main". flag is a live c_int for the whole call.
      unsafe {
         sqlite3_file_control(
            conn.as_ptr(),
            ptr::null(),
            SQLITE_FCNTL_PERSIST_WAL,
            flag as *mut c_int as *mut c_void,
         )
      }
   }
}

/// Turn on persistent WAL for `conn`. Setting it again is a no-op that succeeds.
pub(crate) async fn enable_persistent_wal(
   conn: &mut SqliteConnection,
   control: &dyn FileControl,
) -> Result<()> {
   let mut flag: c_int = 1;
   let status = {
      let mut handle = conn.lock_handle().await?;
      control.persist_wal(RawConnection::new(&mut handle), &mut flag)
   };

   if status != SQLITE_OK {
      error!(status_code = status, "SQLite rejected SQLITE_FCNTL_PERSIST_WAL");
      return Err(Error::PersistenceConfigurationFailed {
         status_code: status,
      });
   }

   trace!("Persistent WAL enabled");
   Ok(())
}

/// Read the current persistent WAL flag of `conn` without changing it
pub(crate) async fn persistent_wal_enabled(
   conn: &mut SqliteConnection,
   control: &dyn FileControl,
) -> Result<bool> {
   let mut flag: c_int = -1;
   let status = {
      let mut handle = conn.lock_handle().await?;
      control.persist_wal(RawConnection::new(&mut handle), &mut flag)
   };

   if status != SQLITE_OK {
      return Err(Error::PersistenceQueryFailed {
         status_code: status,
      });
   }

   Ok(flag == 1)
}
