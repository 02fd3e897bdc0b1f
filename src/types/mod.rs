pub mod error;

use serde::{Deserialize, Serialize};

/// One mailbox's view of a thread.
///
/// The two mirrored copies of a logical thread carry the same `shared_id`
/// and nothing else ties them together — they are independent rows with
/// independent flags. A copy may exist unilaterally after the counterpart
/// deleted theirs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    /// The mailbox this row belongs to.
    pub owner_id: String,
    /// Who started the thread; None once that account is deleted.
    pub from_user_id: Option<String>,
    /// Who the thread was addressed to; None once that account is deleted.
    pub to_user_id: Option<String>,
    /// Opaque id shared by the two mirrored rows of one logical thread.
    pub shared_id: String,
    pub subject: Option<String>,
    /// Unix epoch ms.
    pub created_at: i64,
    /// Unix epoch ms; bumped on message append only, never on flag writes.
    pub modified_at: i64,
    pub trashed: bool,
    pub unread: bool,
}

impl Conversation {
    /// The other participant from this mailbox's point of view, or None
    /// when that account no longer exists.
    pub fn counterpart_id(&self) -> Option<&str> {
        if self.to_user_id.as_deref() == Some(self.owner_id.as_str()) {
            self.from_user_id.as_deref()
        } else {
            self.to_user_id.as_deref()
        }
    }
}

/// One authored text inside one conversation. Immutable once created;
/// ascending `id` is the in-conversation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    /// None once the author's account is deleted.
    pub author_id: Option<String>,
    pub body: String,
    /// Unix epoch ms.
    pub created_at: i64,
}

/// Minimal view of a forum user, resolved from the directory mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub username: String,
}

/// A mailbox listing row: the conversation plus its latest message, so an
/// inbox page can render previews without further queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxEntry {
    pub conversation: Conversation,
    pub last_message: Message,
}

/// A conversation opened for reading, with its messages in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// A page-numbered slice of a larger result set. Out-of-range pages are
/// valid and simply empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number as requested.
    pub page: u32,
    pub per_page: u32,
    /// Total matching rows across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of pages at this page size.
    pub fn page_count(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page as u64) as u32
    }
}
