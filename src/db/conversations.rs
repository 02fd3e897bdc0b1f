//! Conversation rows: one per mailbox per logical thread.
//!
//! Ownership scoping is enforced here: every owner-facing lookup filters
//! by `owner_id`, and a row that exists but belongs to someone else is
//! reported exactly like a missing one.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::types::error::{ConversationError, Result};
use crate::types::{Conversation, MailboxEntry, Message, Page};

/// Fields for a new mailbox row. The row starts read and untrashed; the
/// message append that always follows creation flips the flags.
pub struct NewConversation<'a> {
    pub owner_id: &'a str,
    pub from_user_id: &'a str,
    pub to_user_id: &'a str,
    pub shared_id: &'a str,
    pub subject: Option<&'a str>,
    /// Unix epoch ms used for both created_at and modified_at.
    pub now: i64,
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        from_user_id: row.get(2)?,
        to_user_id: row.get(3)?,
        shared_id: row.get(4)?,
        subject: row.get(5)?,
        created_at: row.get(6)?,
        modified_at: row.get(7)?,
        trashed: row.get::<_, i64>(8)? != 0,
        unread: row.get::<_, i64>(9)? != 0,
    })
}

const CONVERSATION_COLUMNS: &str = "id, owner_id, from_user_id, to_user_id, shared_id, subject,
                                    created_at, modified_at, trashed, unread";

pub fn insert(conn: &Connection, new: &NewConversation) -> Result<Conversation> {
    conn.execute(
        "INSERT INTO conversations (
            owner_id, from_user_id, to_user_id, shared_id, subject,
            created_at, modified_at, trashed, unread
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 0, 0)",
        params![
            new.owner_id,
            new.from_user_id,
            new.to_user_id,
            new.shared_id,
            new.subject,
            new.now
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(conversation_id = id, owner = %new.owner_id, "Created conversation row");
    get(conn, id)
}

/// Unscoped lookup for crate-internal use after an insert or append.
pub(crate) fn get(conn: &Connection, id: i64) -> Result<Conversation> {
    let query = format!(
        "SELECT {} FROM conversations WHERE id = ?1",
        CONVERSATION_COLUMNS
    );
    conn.query_row(&query, params![id], conversation_from_row)
        .optional()?
        .ok_or_else(|| ConversationError::NotFound(format!("conversation {}", id)))
}

/// Owner-scoped lookup. A row owned by someone else is NotFound, same as
/// a missing id.
pub fn find_by_owner(conn: &Connection, owner_id: &str, id: i64) -> Result<Conversation> {
    let query = format!(
        "SELECT {} FROM conversations WHERE id = ?1 AND owner_id = ?2",
        CONVERSATION_COLUMNS
    );
    conn.query_row(&query, params![id, owner_id], conversation_from_row)
        .optional()?
        .ok_or_else(|| ConversationError::NotFound(format!("conversation {}", id)))
}

/// Locate the mirror row a given mailbox holds for a logical thread.
pub fn find_by_shared_id(
    conn: &Connection,
    owner_id: &str,
    shared_id: &str,
) -> Result<Option<Conversation>> {
    let query = format!(
        "SELECT {} FROM conversations WHERE owner_id = ?1 AND shared_id = ?2",
        CONVERSATION_COLUMNS
    );
    let conversation = conn
        .query_row(&query, params![owner_id, shared_id], conversation_from_row)
        .optional()?;
    Ok(conversation)
}

fn list_mailbox(
    conn: &Connection,
    owner_id: &str,
    trashed: bool,
    page: u32,
    per_page: u32,
) -> Result<Page<MailboxEntry>> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM conversations WHERE owner_id = ?1 AND trashed = ?2",
        params![owner_id, trashed as i64],
        |row| row.get(0),
    )?;

    let page = page.max(1);
    let offset = (page as i64 - 1) * per_page as i64;

    let mut stmt = conn.prepare(
        "SELECT c.id, c.owner_id, c.from_user_id, c.to_user_id, c.shared_id, c.subject,
                c.created_at, c.modified_at, c.trashed, c.unread,
                m.id, m.conversation_id, m.author_id, m.body, m.created_at
         FROM conversations c
         JOIN messages m ON m.id = (
             SELECT MAX(id) FROM messages WHERE conversation_id = c.id
         )
         WHERE c.owner_id = ?1 AND c.trashed = ?2
         ORDER BY c.modified_at DESC, c.id DESC
         LIMIT ?3 OFFSET ?4",
    )?;

    let rows = stmt.query_map(
        params![owner_id, trashed as i64, per_page as i64, offset],
        |row| {
            Ok(MailboxEntry {
                conversation: conversation_from_row(row)?,
                last_message: Message {
                    id: row.get(10)?,
                    conversation_id: row.get(11)?,
                    author_id: row.get(12)?,
                    body: row.get(13)?,
                    created_at: row.get(14)?,
                },
            })
        },
    )?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }

    Ok(Page {
        items,
        page,
        per_page,
        total: total as u64,
    })
}

/// Active (non-archived) conversations, most recently active first.
pub fn inbox(
    conn: &Connection,
    owner_id: &str,
    page: u32,
    per_page: u32,
) -> Result<Page<MailboxEntry>> {
    list_mailbox(conn, owner_id, false, page, per_page)
}

/// Archived conversations, same ordering as the inbox.
pub fn archived(
    conn: &Connection,
    owner_id: &str,
    page: u32,
    per_page: u32,
) -> Result<Page<MailboxEntry>> {
    list_mailbox(conn, owner_id, true, page, per_page)
}

pub fn archived_count(conn: &Connection, owner_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM conversations WHERE owner_id = ?1 AND trashed = 1",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Flag writes deliberately leave modified_at alone; only appends count
/// as activity.
pub fn set_trashed(conn: &Connection, id: i64, trashed: bool) -> Result<()> {
    conn.execute(
        "UPDATE conversations SET trashed = ?1 WHERE id = ?2",
        params![trashed as i64, id],
    )?;
    Ok(())
}

pub fn set_unread(conn: &Connection, id: i64, unread: bool) -> Result<()> {
    conn.execute(
        "UPDATE conversations SET unread = ?1 WHERE id = ?2",
        params![unread as i64, id],
    )?;
    Ok(())
}

/// Permanent removal; SQLite cascades to the messages. The counterpart's
/// mirror row is a separate aggregate and is never touched.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
    debug!(conversation_id = id, "Deleted conversation row");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{in_memory_pool, messages, users};

    fn setup() -> crate::db::DbPool {
        let pool = in_memory_pool().expect("Failed to create in-memory database");
        let conn = pool.get().expect("Failed to get connection");
        users::ensure_user(&conn, "alice", "Alice").expect("Failed to create user");
        users::ensure_user(&conn, "bob", "Bob").expect("Failed to create user");
        pool
    }

    fn seed_thread(conn: &Connection, owner: &str, shared_id: &str, now: i64) -> Conversation {
        let conv = insert(
            conn,
            &NewConversation {
                owner_id: owner,
                from_user_id: "alice",
                to_user_id: "bob",
                shared_id,
                subject: Some("hi"),
                now,
            },
        )
        .expect("Failed to insert conversation");
        messages::append(conn, conv.id, Some("alice"), "hello", now).expect("Failed to append");
        conv
    }

    #[test]
    fn test_find_by_owner_hides_foreign_rows() {
        let pool = setup();
        let conn = pool.get().expect("Failed to get connection");
        let conv = seed_thread(&conn, "alice", "s1", 1_000);

        assert!(find_by_owner(&conn, "alice", conv.id).is_ok());
        match find_by_owner(&conn, "bob", conv.id) {
            Err(ConversationError::NotFound(_)) => {}
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_inbox_excludes_trashed_and_orders_by_activity() {
        let pool = setup();
        let conn = pool.get().expect("Failed to get connection");
        let older = seed_thread(&conn, "alice", "s1", 1_000);
        let newer = seed_thread(&conn, "alice", "s2", 2_000);
        let trashed = seed_thread(&conn, "alice", "s3", 3_000);
        set_trashed(&conn, trashed.id, true).expect("Failed to trash");

        let page = inbox(&conn, "alice", 1, 10).expect("Failed to list inbox");
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].conversation.id, newer.id);
        assert_eq!(page.items[1].conversation.id, older.id);
        assert_eq!(page.items[0].last_message.body, "hello");

        let archived_page = archived(&conn, "alice", 1, 10).expect("Failed to list archive");
        assert_eq!(archived_page.total, 1);
        assert_eq!(archived_page.items[0].conversation.id, trashed.id);
        assert_eq!(archived_count(&conn, "alice").expect("Failed to count"), 1);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let pool = setup();
        let conn = pool.get().expect("Failed to get connection");
        seed_thread(&conn, "alice", "s1", 1_000);

        let page = inbox(&conn, "alice", 99, 10).expect("Failed to list inbox");
        assert!(page.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.page, 99);
    }

    #[test]
    fn test_pagination_slices_by_page_size() {
        let pool = setup();
        let conn = pool.get().expect("Failed to get connection");
        for i in 0..5i64 {
            seed_thread(&conn, "alice", &format!("s{}", i), 1_000 + i);
        }

        let first = inbox(&conn, "alice", 1, 2).expect("Failed to list inbox");
        let second = inbox(&conn, "alice", 2, 2).expect("Failed to list inbox");
        let third = inbox(&conn, "alice", 3, 2).expect("Failed to list inbox");
        assert_eq!(first.items.len(), 2);
        assert_eq!(second.items.len(), 2);
        assert_eq!(third.items.len(), 1);
        assert_eq!(first.page_count(), 3);
    }

    #[test]
    fn test_flag_writes_do_not_bump_modified_at() {
        let pool = setup();
        let conn = pool.get().expect("Failed to get connection");
        let conv = seed_thread(&conn, "alice", "s1", 1_000);

        set_trashed(&conn, conv.id, true).expect("Failed to trash");
        set_unread(&conn, conv.id, true).expect("Failed to mark unread");

        let reloaded = get(&conn, conv.id).expect("Failed to reload");
        assert_eq!(reloaded.modified_at, 1_000);
        assert!(reloaded.trashed);
        assert!(reloaded.unread);
    }

    #[test]
    fn test_delete_cascades_to_messages() {
        let pool = setup();
        let conn = pool.get().expect("Failed to get connection");
        let conv = seed_thread(&conn, "alice", "s1", 1_000);

        delete(&conn, conv.id).expect("Failed to delete");

        let remaining: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conv.id],
                |row| row.get(0),
            )
            .expect("Failed to count messages");
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_owner_and_shared_id_unique() {
        let pool = setup();
        let conn = pool.get().expect("Failed to get connection");
        seed_thread(&conn, "alice", "s1", 1_000);

        let duplicate = insert(
            &conn,
            &NewConversation {
                owner_id: "alice",
                from_user_id: "alice",
                to_user_id: "bob",
                shared_id: "s1",
                subject: None,
                now: 2_000,
            },
        );
        assert!(matches!(duplicate, Err(ConversationError::Database(_))));
    }
}
