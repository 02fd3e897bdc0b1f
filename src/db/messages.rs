//! Message rows: append-only text within a conversation.
//!
//! There is no update statement in this module on purpose — messages are
//! immutable once created and only disappear via the conversation cascade.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::types::error::{ConversationError, Result};
use crate::types::Message;

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        author_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, author_id, body, created_at";

/// Insert a message and stamp the owning conversation in the same breath:
/// modified_at takes the message timestamp and the mailbox flips to
/// unread. There is no silent-append entry point; the protocol layer
/// re-asserts the own-mailbox flag where a copy must stay read.
pub fn append(
    conn: &Connection,
    conversation_id: i64,
    author_id: Option<&str>,
    body: &str,
    now: i64,
) -> Result<Message> {
    conn.execute(
        "INSERT INTO messages (conversation_id, author_id, body, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![conversation_id, author_id, body, now],
    )?;
    let id = conn.last_insert_rowid();

    conn.execute(
        "UPDATE conversations SET modified_at = ?1, unread = 1 WHERE id = ?2",
        params![now, conversation_id],
    )?;

    Ok(Message {
        id,
        conversation_id,
        author_id: author_id.map(str::to_string),
        body: body.to_string(),
        created_at: now,
    })
}

/// The oldest message of a conversation.
pub fn first(conn: &Connection, conversation_id: i64) -> Result<Message> {
    let query = format!(
        "SELECT {} FROM messages WHERE conversation_id = ?1 ORDER BY id ASC LIMIT 1",
        MESSAGE_COLUMNS
    );
    conn.query_row(&query, params![conversation_id], message_from_row)
        .optional()?
        .ok_or(ConversationError::EmptyConversation(conversation_id))
}

/// The latest message of a conversation.
pub fn last(conn: &Connection, conversation_id: i64) -> Result<Message> {
    let query = format!(
        "SELECT {} FROM messages WHERE conversation_id = ?1 ORDER BY id DESC LIMIT 1",
        MESSAGE_COLUMNS
    );
    conn.query_row(&query, params![conversation_id], message_from_row)
        .optional()?
        .ok_or(ConversationError::EmptyConversation(conversation_id))
}

/// All messages of a conversation in creation order.
pub fn list(conn: &Connection, conversation_id: i64) -> Result<Vec<Message>> {
    let query = format!(
        "SELECT {} FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params![conversation_id], message_from_row)?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

/// Fetch a single message, visible only to the two participants of its
/// conversation. Anyone else gets NotFound, same as a missing id.
pub fn find_for_user(conn: &Connection, message_id: i64, user_id: &str) -> Result<Message> {
    conn.query_row(
        "SELECT m.id, m.conversation_id, m.author_id, m.body, m.created_at
         FROM messages m
         JOIN conversations c ON c.id = m.conversation_id
         WHERE m.id = ?1 AND (c.from_user_id = ?2 OR c.to_user_id = ?2)",
        params![message_id, user_id],
        message_from_row,
    )
    .optional()?
    .ok_or_else(|| ConversationError::NotFound(format!("message {}", message_id)))
}

/// Messages sitting in conversations the user owns (their mailbox
/// footprint).
pub fn count_stored(conn: &Connection, user_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages m
         JOIN conversations c ON c.id = m.conversation_id
         WHERE c.owner_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Messages the user authored, across all mailboxes.
pub fn count_authored(conn: &Connection, user_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE author_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}
