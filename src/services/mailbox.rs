//! Mailbox synchronization for private conversations.
//!
//! A logical thread between two users is stored as two independent
//! conversation rows — one per mailbox — linked only by a shared id.
//! Sending and replying always write both copies inside one transaction;
//! archiving, reading and deleting touch exactly one. After the counterpart
//! deletes their copy, a reply resurrects the thread for them as a fresh
//! mailbox entry under the same shared id.

use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PmConfig;
use crate::db::conversations::NewConversation;
use crate::db::{self, DbPool};
use crate::services::quota;
use crate::types::error::{ConversationError, Result};
use crate::types::{Conversation, ConversationView, MailboxEntry, Message, Page};

/// Notification that a user's mailbox changed in a way external caches
/// (unread badges, inbox snippets) must pick up. The core never talks to
/// a cache itself; wiring the receiver is the embedding application's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInvalidation {
    pub user_id: String,
}

pub struct MailboxService {
    pool: DbPool,
    config: PmConfig,
    invalidations: Option<Sender<CacheInvalidation>>,
}

impl MailboxService {
    pub fn new(pool: DbPool, config: PmConfig) -> Self {
        Self {
            pool,
            config,
            invalidations: None,
        }
    }

    /// Subscribe to cache-invalidation events. Events are emitted after a
    /// mutation commits; without a subscriber nothing is buffered.
    pub fn invalidation_events(&mut self) -> Receiver<CacheInvalidation> {
        let (tx, rx) = flume::unbounded();
        self.invalidations = Some(tx);
        rx
    }

    fn invalidate(&self, user_id: &str) {
        if let Some(tx) = &self.invalidations {
            let _ = tx.send(CacheInvalidation {
                user_id: user_id.to_string(),
            });
        }
    }

    /// Start a new thread: one row in the sender's mailbox, one mirrored
    /// row (and a fully duplicated message) in the recipient's. Both rows
    /// are created atomically — a half-created thread must never be
    /// observable.
    pub fn start_thread(
        &self,
        sender_id: &str,
        recipient_id: &str,
        subject: Option<&str>,
        body: &str,
    ) -> Result<(Conversation, Conversation)> {
        let body = validated_body(body)?;
        if sender_id == recipient_id {
            return Err(ConversationError::InvalidInput(
                "cannot start a conversation with yourself".to_string(),
            ));
        }

        let conn = self.pool.get()?;
        if db::users::find_user(&conn, recipient_id)?.is_none() {
            return Err(ConversationError::InvalidInput(format!(
                "recipient {} does not exist",
                recipient_id
            )));
        }

        // The compose form is expected to have checked the quota already;
        // a sender over the limit gets through here, but loudly.
        if quota::is_over_quota(&conn, &self.config, sender_id)? {
            warn!(user_id = %sender_id, "Sending while over message quota");
        }

        let shared_id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        let tx = conn.unchecked_transaction()?;

        let sender_conv = db::conversations::insert(
            &tx,
            &NewConversation {
                owner_id: sender_id,
                from_user_id: sender_id,
                to_user_id: recipient_id,
                shared_id: &shared_id,
                subject,
                now,
            },
        )?;
        db::messages::append(&tx, sender_conv.id, Some(sender_id), body, now)?;
        // The sender's own copy starts read; the append flipped it.
        db::conversations::set_unread(&tx, sender_conv.id, false)?;

        let recipient_conv = db::conversations::insert(
            &tx,
            &NewConversation {
                owner_id: recipient_id,
                from_user_id: sender_id,
                to_user_id: recipient_id,
                shared_id: &shared_id,
                subject,
                now,
            },
        )?;
        db::messages::append(&tx, recipient_conv.id, Some(sender_id), body, now)?;

        let sender_conv = db::conversations::get(&tx, sender_conv.id)?;
        let recipient_conv = db::conversations::get(&tx, recipient_conv.id)?;
        tx.commit()?;

        info!(
            from = %sender_id,
            to = %recipient_id,
            shared_id = %shared_id,
            "Started conversation"
        );
        self.invalidate(sender_id);
        self.invalidate(recipient_id);
        Ok((sender_conv, recipient_conv))
    }

    /// Append a reply to the owner's copy and mirror it into the
    /// counterpart's mailbox. Blocks with `QuotaExceeded` before anything
    /// is written.
    pub fn reply(&self, owner_id: &str, conversation_id: i64, body: &str) -> Result<Message> {
        let body = validated_body(body)?;

        let conn = self.pool.get()?;
        quota::check(&conn, &self.config, owner_id)?;

        let tx = conn.unchecked_transaction()?;
        let conv = db::conversations::find_by_owner(&tx, owner_id, conversation_id)?;
        let counterpart = conv.counterpart_id().map(str::to_string);
        let now = chrono::Utc::now().timestamp_millis();

        // Own copy first; a reply never changes the replier's read state.
        let was_unread = conv.unread;
        let message = db::messages::append(&tx, conv.id, Some(owner_id), body, now)?;
        db::conversations::set_unread(&tx, conv.id, was_unread)?;

        match counterpart.as_deref() {
            None => {
                // Counterpart account is gone; there is no mirror to write.
                debug!(
                    conversation_id = conv.id,
                    "Reply stored one-sided, counterpart account deleted"
                );
            }
            Some(counterpart_id) => {
                let mirror =
                    db::conversations::find_by_shared_id(&tx, counterpart_id, &conv.shared_id)?;
                let mirror = match mirror {
                    Some(mirror) => mirror,
                    None => {
                        // The counterpart deleted their copy; give them a
                        // fresh row under the same shared id.
                        info!(
                            shared_id = %conv.shared_id,
                            owner = %counterpart_id,
                            "Resurrecting deleted conversation copy"
                        );
                        db::conversations::insert(
                            &tx,
                            &NewConversation {
                                owner_id: counterpart_id,
                                from_user_id: owner_id,
                                to_user_id: counterpart_id,
                                shared_id: &conv.shared_id,
                                subject: conv.subject.as_deref(),
                                now,
                            },
                        )?
                    }
                };
                // The counterpart's append leaves their copy unread.
                db::messages::append(&tx, mirror.id, Some(owner_id), body, now)?;
            }
        }

        tx.commit()?;
        debug!(conversation_id, owner = %owner_id, "Stored reply");

        self.invalidate(owner_id);
        if let Some(counterpart_id) = &counterpart {
            self.invalidate(counterpart_id);
        }
        Ok(message)
    }

    /// Fetch a conversation with its ordered messages. The first read of
    /// an unread conversation flips it to read; reading never flips it
    /// back.
    pub fn view(&self, owner_id: &str, conversation_id: i64) -> Result<ConversationView> {
        let conn = self.pool.get()?;
        let mut conversation = db::conversations::find_by_owner(&conn, owner_id, conversation_id)?;

        if conversation.unread {
            db::conversations::set_unread(&conn, conversation.id, false)?;
            conversation.unread = false;
            self.invalidate(owner_id);
        }

        let messages = db::messages::list(&conn, conversation.id)?;
        Ok(ConversationView {
            conversation,
            messages,
        })
    }

    /// Move the owner's copy to the archive. Idempotent: re-archiving an
    /// archived conversation is a no-op, not an error.
    pub fn archive(&self, owner_id: &str, conversation_id: i64) -> Result<Conversation> {
        self.set_trashed(owner_id, conversation_id, true)
    }

    /// Move the owner's copy back to the inbox. Idempotent like archive.
    pub fn unarchive(&self, owner_id: &str, conversation_id: i64) -> Result<Conversation> {
        self.set_trashed(owner_id, conversation_id, false)
    }

    fn set_trashed(
        &self,
        owner_id: &str,
        conversation_id: i64,
        trashed: bool,
    ) -> Result<Conversation> {
        let conn = self.pool.get()?;
        let mut conversation = db::conversations::find_by_owner(&conn, owner_id, conversation_id)?;

        if conversation.trashed != trashed {
            db::conversations::set_trashed(&conn, conversation.id, trashed)?;
            conversation.trashed = trashed;
            self.invalidate(owner_id);
        }
        Ok(conversation)
    }

    /// Permanently drop the owner's copy and its messages, from either
    /// flag state. The counterpart's mirror row lives on untouched.
    pub fn delete(&self, owner_id: &str, conversation_id: i64) -> Result<()> {
        let conn = self.pool.get()?;
        let conversation = db::conversations::find_by_owner(&conn, owner_id, conversation_id)?;
        db::conversations::delete(&conn, conversation.id)?;

        info!(owner = %owner_id, conversation_id, "Deleted conversation copy");
        self.invalidate(owner_id);
        Ok(())
    }

    /// Active conversations, most recently active first.
    pub fn inbox(&self, owner_id: &str, page: u32) -> Result<Page<MailboxEntry>> {
        let conn = self.pool.get()?;
        db::conversations::inbox(&conn, owner_id, page, self.config.conversations_per_page)
    }

    /// Archived conversations, same ordering as the inbox.
    pub fn archived(&self, owner_id: &str, page: u32) -> Result<Page<MailboxEntry>> {
        let conn = self.pool.get()?;
        db::conversations::archived(&conn, owner_id, page, self.config.conversations_per_page)
    }

    pub fn archived_count(&self, owner_id: &str) -> Result<u64> {
        let conn = self.pool.get()?;
        db::conversations::archived_count(&conn, owner_id)
    }

    /// A single message body, visible only to the participants of its
    /// conversation.
    pub fn raw_message(&self, user_id: &str, message_id: i64) -> Result<Message> {
        let conn = self.pool.get()?;
        db::messages::find_for_user(&conn, message_id, user_id)
    }

    /// For the compose form: whether the user must be blocked from
    /// sending more messages.
    pub fn quota_exceeded(&self, user_id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        quota::is_over_quota(&conn, &self.config, user_id)
    }
}

fn validated_body(body: &str) -> Result<&str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ConversationError::InvalidInput(
            "message body must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}
