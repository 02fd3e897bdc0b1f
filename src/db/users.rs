//! Minimal mirror of the forum's user directory.
//!
//! The forum owns user accounts; this table is a reference kept only so
//! the conversation tables' foreign keys (owner cascade, nullable
//! from/to/author references) can fire locally. The embedding application
//! is expected to call `ensure_user` when a user first touches messaging
//! and `remove_user` when an account is deleted.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::types::error::Result;
use crate::types::UserRef;

/// Display-name sentinel for references whose account no longer exists.
pub const UNKNOWN_USER: &str = "unknown";

/// Upsert a user row. Usernames can change on the forum side, so an
/// existing row is refreshed rather than ignored.
pub fn ensure_user(conn: &Connection, user_id: &str, username: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET username = excluded.username",
        params![user_id, username, chrono::Utc::now().timestamp_millis()],
    )?;
    debug!(user_id = %user_id, "Ensured user row in conversations DB");
    Ok(())
}

pub fn find_user(conn: &Connection, user_id: &str) -> Result<Option<UserRef>> {
    let user = conn
        .query_row(
            "SELECT id, username FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(UserRef {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Remove a user from the mirror. Their own mailbox rows cascade away;
/// references from other users' mailboxes fall back to NULL.
pub fn remove_user(conn: &Connection, user_id: &str) -> Result<()> {
    conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    debug!(user_id = %user_id, "Removed user row from conversations DB");
    Ok(())
}

/// Resolve a nullable user reference to a display name. Deleted accounts
/// show up as the "unknown" sentinel rather than erroring.
pub fn display_name(conn: &Connection, user_id: Option<&str>) -> Result<String> {
    let Some(id) = user_id else {
        return Ok(UNKNOWN_USER.to_string());
    };
    Ok(find_user(conn, id)?
        .map(|u| u.username)
        .unwrap_or_else(|| UNKNOWN_USER.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::in_memory_pool;

    #[test]
    fn test_ensure_and_find_user() {
        let pool = in_memory_pool().expect("Failed to create in-memory database");
        let conn = pool.get().expect("Failed to get connection");

        ensure_user(&conn, "u1", "alice").expect("Failed to ensure user");
        let user = find_user(&conn, "u1")
            .expect("Failed to find user")
            .expect("User not found");
        assert_eq!(user.username, "alice");

        // Re-ensuring with a new username refreshes the row
        ensure_user(&conn, "u1", "alice_renamed").expect("Failed to ensure user");
        let user = find_user(&conn, "u1")
            .expect("Failed to find user")
            .expect("User not found");
        assert_eq!(user.username, "alice_renamed");
    }

    #[test]
    fn test_display_name_falls_back_to_unknown() {
        let pool = in_memory_pool().expect("Failed to create in-memory database");
        let conn = pool.get().expect("Failed to get connection");

        ensure_user(&conn, "u1", "alice").expect("Failed to ensure user");
        assert_eq!(
            display_name(&conn, Some("u1")).expect("Failed to resolve"),
            "alice"
        );
        assert_eq!(
            display_name(&conn, None).expect("Failed to resolve"),
            UNKNOWN_USER
        );
        assert_eq!(
            display_name(&conn, Some("missing")).expect("Failed to resolve"),
            UNKNOWN_USER
        );
    }
}
