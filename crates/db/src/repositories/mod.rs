use async_trait::async_trait;
use thiserror::Error;

use krishimitr_core::domain::conversation::{ConversationEntry, NewConversation};

pub mod conversation;
pub mod memory;

pub use conversation::SqlConversationRepository;
pub use memory::InMemoryConversationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only log of answered queries used for offline recall.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn append(
        &self,
        conversation: NewConversation,
    ) -> Result<ConversationEntry, RepositoryError>;

    /// Most recent entry whose stored query contains `fragment` verbatim.
    /// Recency is `created_at`, then insertion order.
    async fn latest_containing(
        &self,
        fragment: &str,
    ) -> Result<Option<ConversationEntry>, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;
}
