//! WriteGuard for exclusive write access to the database

use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnection;
use std::ops::{Deref, DerefMut};

/// RAII guard for exclusive write access to a database connection
///
/// Wraps the single writer connection of a writable
/// [`SqliteDatabase`](crate::SqliteDatabase) and returns it to the pool on drop.
/// Only one `WriteGuard` exists at a time within a process; across processes,
/// SQLite's WAL write lock serializes writers.
///
/// The wrapped connection already has persistent WAL enabled. It derefs to
/// `SqliteConnection` for direct use with sqlx queries.
#[derive(Debug)]
pub struct WriteGuard {
   conn: PoolConnection<Sqlite>,
}

impl WriteGuard {
   pub(crate) fn new(conn: PoolConnection<Sqlite>) -> Self {
      Self { conn }
   }
}

impl Deref for WriteGuard {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      &self.conn
   }
}

impl DerefMut for WriteGuard {
   fn deref_mut(&mut self) -> &mut Self::Target {
      &mut self.conn
   }
}
