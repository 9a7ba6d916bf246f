use sqlite_shared_db::sqlx_sqlite_conn_mgr::{self, FileControl, RawConnection};
use sqlite_shared_db::{
   ConnectionInitializer, CoordinatedOpener, DatabaseOpener, Error, LockFileCoordinator,
   PathCoordinator, SharedDatabaseConfig, SqliteDatabaseConfig,
};
use std::ffi::c_int;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// A file control that always fails with SQLITE_IOERR
#[derive(Debug)]
struct BrokenFileControl;

impl FileControl for BrokenFileControl {
   fn persist_wal(&self, _conn: RawConnection<'_>, _flag: &mut c_int) -> c_int {
      10
   }
}

#[tokio::test]
async fn test_open_shared_creates_database_with_persistent_wal() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("shared.db");

   let db = sqlite_shared_db::open_shared(&path).await.unwrap();

   assert!(path.exists());
   assert!(dir.path().join("shared.db.lock").exists());
   assert!(!db.is_read_only());
   assert!(db.persist_wal_enabled().await.unwrap());

   db.close().await.unwrap();
}

#[tokio::test]
async fn test_coordination_is_released_after_open() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("released.db");

   let db = CoordinatedOpener::new().open_shared(&path).await.unwrap();

   // The handle stays open, but the path is free for the next opener
   LockFileCoordinator::new()
      .acquire(&path, Duration::from_millis(100))
      .await
      .expect("coordination must not outlive the open");

   db.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_are_serialized() {
   let dir = TempDir::new().unwrap();
   let path = Arc::new(dir.path().join("serialized.db"));
   let (inside, max_seen) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));

   let handles: Vec<_> = (0..6)
      .map(|_| {
         let (path, inside, max_seen) =
            (Arc::clone(&path), Arc::clone(&inside), Arc::clone(&max_seen));

         tokio::spawn(async move {
            // Runs on every connection the open creates, all inside the coordinated region
            let initializer = ConnectionInitializer::new().step("instrumented", move |_conn| {
               let (inside, max_seen) = (Arc::clone(&inside), Arc::clone(&max_seen));
               Box::pin(async move {
                  max_seen.fetch_max(inside.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
                  tokio::time::sleep(Duration::from_millis(5)).await;
                  inside.fetch_sub(1, Ordering::SeqCst);
                  Ok(())
               })
            });

            // Separate openers, separate lock file handles, like separate processes
            let db = CoordinatedOpener::new()
               .open_shared_with(
                  path.as_path(),
                  SqliteDatabaseConfig::default().with_initializer(initializer),
               )
               .await
               .unwrap();

            db.close().await.unwrap();
         })
      })
      .collect();

   for handle in handles {
      handle.await.unwrap();
   }

   assert_eq!(
      max_seen.load(Ordering::SeqCst),
      1,
      "Opens overlapped ({} at once)",
      max_seen.load(Ordering::SeqCst)
   );
}

#[tokio::test]
async fn test_timeout_is_a_coordination_failure() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("busy.db");

   let _holder = LockFileCoordinator::new()
      .acquire(&path, Duration::from_secs(1))
      .await
      .unwrap();

   let err = CoordinatedOpener::new()
      .with_timeout(Duration::from_millis(50))
      .open_shared(&path)
      .await
      .unwrap_err();

   assert!(err.is_coordination_failure(), "got {err:?}");
   assert_eq!(err.error_code(), "COORDINATION_TIMEOUT");
   assert!(!path.exists(), "the database must not be touched without coordination");
}

#[tokio::test]
async fn test_engine_failure_is_an_open_failure() {
   let dir = TempDir::new().unwrap();

   // The lock file can be created next to it, but SQLite cannot open a directory
   let path = dir.path().join("a_directory");
   std::fs::create_dir(&path).unwrap();

   let err = CoordinatedOpener::new().open_shared(&path).await.unwrap_err();

   assert!(!err.is_coordination_failure());
   assert!(
      matches!(err.open_error(), Some(sqlx_sqlite_conn_mgr::Error::EngineOpenFailed(_))),
      "got {err:?}"
   );
}

#[tokio::test]
async fn test_unshareable_path_is_rejected_before_coordination() {
   let err = CoordinatedOpener::new().open_shared(":memory:").await.unwrap_err();

   assert!(
      matches!(err.open_error(), Some(sqlx_sqlite_conn_mgr::Error::InvalidPath(_))),
      "got {err:?}"
   );
   assert!(
      !std::path::Path::new(":memory:.lock").exists(),
      "a rejected path must not leave a lock file behind"
   );
}

#[tokio::test]
async fn test_persistence_failure_is_an_open_failure_and_releases_the_path() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("broken.db");

   let err = CoordinatedOpener::new()
      .with_opener(DatabaseOpener::with_file_control(BrokenFileControl))
      .open_shared(&path)
      .await
      .unwrap_err();

   match &err {
      Error::OpenFailed {
         source: sqlx_sqlite_conn_mgr::Error::PersistenceConfigurationFailed { status_code },
         ..
      } => assert_eq!(*status_code, 10),
      other => panic!("expected PersistenceConfigurationFailed, got {other:?}"),
   }

   // A failed open still hands the path back
   let db = CoordinatedOpener::new()
      .with_timeout(Duration::from_millis(200))
      .open_shared(&path)
      .await
      .unwrap();
   db.close().await.unwrap();
}

#[tokio::test]
async fn test_read_only_shared_open_after_writer() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("readers.db");

   let writer_db = sqlite_shared_db::open_shared(&path).await.unwrap();
   let mut writer = writer_db.acquire_writer().await.unwrap();
   sqlx::query("CREATE TABLE notes (body TEXT NOT NULL)")
      .execute(&mut *writer)
      .await
      .unwrap();
   sqlx::query("INSERT INTO notes (body) VALUES ('hello')")
      .execute(&mut *writer)
      .await
      .unwrap();
   drop(writer);

   let reader = CoordinatedOpener::new()
      .open_shared_with(
         &path,
         SqliteDatabaseConfig {
            read_only: true,
            ..Default::default()
         },
      )
      .await
      .unwrap();

   let body: String = sqlx::query_scalar("SELECT body FROM notes")
      .fetch_one(reader.read_pool().unwrap())
      .await
      .unwrap();
   assert_eq!(body, "hello");

   reader.close().await.unwrap();
   writer_db.close().await.unwrap();
}

#[tokio::test]
async fn test_configured_lock_suffix_is_used() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("configured.db");

   let config = SharedDatabaseConfig::from_json(
      r#"{
         "lock_suffix": ".open-lock",
         "coordination_timeout_ms": 500,
         "database": { "max_read_connections": 2 }
      }"#,
   )
   .unwrap();

   let opener = CoordinatedOpener::from_config(config);
   let db = opener.open_shared(&path).await.unwrap();

   assert!(dir.path().join("configured.db.open-lock").exists());
   assert!(!dir.path().join("configured.db.lock").exists());

   db.close().await.unwrap();
}
