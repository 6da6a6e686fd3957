use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use crate::adapters::db::{open_connection, run_migrations};

static TEST_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opens a fresh migrated sqlite database in a temp directory, unique per
/// test so tests can run in parallel.
pub fn open_test_connection(test_name: &str) -> Connection {
    let test_db_path = unique_test_db_path(test_name);

    if let Some(parent) = test_db_path.parent() {
        std::fs::create_dir_all(parent).expect("test db dir should be creatable");
    }

    let mut connection = open_connection(test_db_path.to_string_lossy().as_ref())
        .expect("test db should open");
    run_migrations(&mut connection).expect("test db migrations should succeed");
    connection
}

fn unique_test_db_path(test_name: &str) -> PathBuf {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = dir
        .path()
        .join(format!("{test_name}-{now}-{counter}.sqlite"));
    std::mem::forget(dir);
    path
}
