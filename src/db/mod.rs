//! SQLite persistence for the conversations core.
//!
//! Stores are plain functions over a connection so the mailbox protocol
//! can compose them inside a single transaction.

pub mod conversations;
pub mod messages;
pub mod pool;
pub mod schema;
pub mod users;

// Re-export the pool type so callers can do `use crate::db::DbPool`
// instead of `use crate::db::pool::DbPool`
pub use pool::{create_pool, in_memory_pool, DbPool};
