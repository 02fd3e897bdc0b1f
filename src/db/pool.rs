use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use crate::types::error::{ConversationError, Result};

/// Database connection pool type
pub type DbPool = Pool<SqliteConnectionManager>;

/// Open (or create) the conversations database at the given path.
pub fn create_pool(db_path: &Path) -> Result<DbPool> {
    // foreign_keys is per-connection in SQLite, so it belongs in the
    // connection init rather than the one-off tuning batch below.
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = Pool::builder().max_size(8).build(manager).map_err(|e| {
        ConversationError::Database(format!("Failed to create database pool: {}", e))
    })?;

    let conn = pool.get()?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;",
    )?;

    super::schema::initialize_schema(&conn)?;
    Ok(pool)
}

/// In-memory database for tests: a single pooled connection so every
/// handle sees the same data.
pub fn in_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = Pool::builder().max_size(1).build(manager).map_err(|e| {
        ConversationError::Database(format!("Failed to create database pool: {}", e))
    })?;

    let conn = pool.get()?;
    super::schema::initialize_schema(&conn)?;
    Ok(pool)
}
