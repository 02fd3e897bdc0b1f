use rusqlite::Connection;

use crate::types::error::Result;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Minimal user reference for FK integrity.
        -- Full user data lives in the forum's user directory; this mirror
        -- exists so ON DELETE SET NULL / CASCADE fire locally.
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,   -- opaque forum user id
            username    TEXT NOT NULL,
            created_at  INTEGER NOT NULL    -- unix epoch ms
        );

        -- One row per mailbox per logical thread. The two mirrored rows of
        -- a thread share shared_id and nothing else; deleting one side
        -- never touches the other.
        CREATE TABLE IF NOT EXISTS conversations (
            id            INTEGER PRIMARY KEY,
            owner_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            from_user_id  TEXT REFERENCES users(id) ON DELETE SET NULL,
            to_user_id    TEXT REFERENCES users(id) ON DELETE SET NULL,
            shared_id     TEXT NOT NULL,      -- UUID linking the mirrored rows
            subject       TEXT,
            created_at    INTEGER NOT NULL,   -- unix epoch ms
            modified_at   INTEGER NOT NULL,   -- bumped on message append only
            trashed       INTEGER NOT NULL DEFAULT 0,
            unread        INTEGER NOT NULL DEFAULT 0,

            UNIQUE(owner_id, shared_id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_mailbox
            ON conversations(owner_id, trashed, modified_at DESC);
        CREATE INDEX IF NOT EXISTS idx_conversations_shared
            ON conversations(shared_id);

        -- Messages are append-only and immutable; ascending id is the
        -- in-conversation order.
        CREATE TABLE IF NOT EXISTS messages (
            id               INTEGER PRIMARY KEY,
            conversation_id  INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            author_id        TEXT REFERENCES users(id) ON DELETE SET NULL,
            body             TEXT NOT NULL,
            created_at       INTEGER NOT NULL    -- unix epoch ms
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id);
        CREATE INDEX IF NOT EXISTS idx_messages_author       ON messages(author_id);
    ",
    )?;

    Ok(())
}
