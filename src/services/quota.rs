//! Message-volume quota checks.
//!
//! Quota reads go straight to storage on every call; any caching sits
//! outside the core and is refreshed through the mailbox event channel.
//! All functions here are read-only.

use rusqlite::Connection;
use tracing::debug;

use crate::config::{PmConfig, QuotaScope};
use crate::db::messages;
use crate::types::error::{ConversationError, Result};

/// Live messages counting against the user's quota, per the configured
/// scope.
pub fn message_count(conn: &Connection, config: &PmConfig, user_id: &str) -> Result<u64> {
    match config.quota_scope {
        QuotaScope::Stored => messages::count_stored(conn, user_id),
        QuotaScope::Authored => messages::count_authored(conn, user_id),
    }
}

/// True when the user has no room left. A zero quota disables the check.
pub fn is_over_quota(conn: &Connection, config: &PmConfig, user_id: &str) -> Result<bool> {
    if config.message_quota == 0 {
        return Ok(false);
    }
    let count = message_count(conn, config, user_id)?;
    debug!(
        user_id = %user_id,
        count,
        quota = config.message_quota,
        "Checked message quota"
    );
    Ok(count >= config.message_quota)
}

/// Enforcing variant: errors with the current count when the user is out
/// of room.
pub fn check(conn: &Connection, config: &PmConfig, user_id: &str) -> Result<()> {
    if config.message_quota == 0 {
        return Ok(());
    }
    let count = message_count(conn, config, user_id)?;
    if count >= config.message_quota {
        return Err(ConversationError::QuotaExceeded(count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::conversations::{self, NewConversation};
    use crate::db::{in_memory_pool, messages, users};

    fn pool_with_stored_messages(count: usize) -> crate::db::DbPool {
        let pool = in_memory_pool().expect("Failed to create in-memory database");
        let conn = pool.get().expect("Failed to get connection");
        users::ensure_user(&conn, "alice", "Alice").expect("Failed to create user");
        users::ensure_user(&conn, "bob", "Bob").expect("Failed to create user");
        let conv = conversations::insert(
            &conn,
            &NewConversation {
                owner_id: "alice",
                from_user_id: "alice",
                to_user_id: "bob",
                shared_id: "s1",
                subject: None,
                now: 1_000,
            },
        )
        .expect("Failed to insert conversation");
        for i in 0..count {
            messages::append(&conn, conv.id, Some("alice"), "msg", 1_000 + i as i64)
                .expect("Failed to append");
        }
        pool
    }

    #[test]
    fn test_quota_boundary() {
        let pool = pool_with_stored_messages(5);
        let conn = pool.get().expect("Failed to get connection");

        let at_limit = PmConfig {
            message_quota: 5,
            ..PmConfig::default()
        };
        assert!(is_over_quota(&conn, &at_limit, "alice").expect("Failed to check"));

        let with_room = PmConfig {
            message_quota: 6,
            ..PmConfig::default()
        };
        assert!(!is_over_quota(&conn, &with_room, "alice").expect("Failed to check"));
    }

    #[test]
    fn test_zero_quota_disables_check() {
        let pool = pool_with_stored_messages(5);
        let conn = pool.get().expect("Failed to get connection");

        let unlimited = PmConfig {
            message_quota: 0,
            ..PmConfig::default()
        };
        assert!(!is_over_quota(&conn, &unlimited, "alice").expect("Failed to check"));
        assert!(check(&conn, &unlimited, "alice").is_ok());
    }

    #[test]
    fn test_check_reports_offending_count() {
        let pool = pool_with_stored_messages(7);
        let conn = pool.get().expect("Failed to get connection");

        let config = PmConfig {
            message_quota: 5,
            ..PmConfig::default()
        };
        match check(&conn, &config, "alice") {
            Err(ConversationError::QuotaExceeded(n)) => assert_eq!(n, 7),
            other => panic!("Expected QuotaExceeded, got {:?}", other),
        }
    }
}
