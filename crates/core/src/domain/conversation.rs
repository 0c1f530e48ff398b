use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

/// A cached answer. Written once, never updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: ConversationId,
    pub query: String,
    pub reply: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewConversation {
    pub query: String,
    pub reply: String,
    pub created_at: DateTime<Utc>,
}

impl NewConversation {
    pub fn now(query: impl Into<String>, reply: impl Into<String>) -> Self {
        Self { query: query.into(), reply: reply.into(), created_at: Utc::now() }
    }

    pub fn with_id(self, id: ConversationId) -> ConversationEntry {
        ConversationEntry { id, query: self.query, reply: self.reply, created_at: self.created_at }
    }
}
