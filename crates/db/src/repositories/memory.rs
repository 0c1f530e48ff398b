use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use krishimitr_core::domain::conversation::{ConversationEntry, ConversationId, NewConversation};

use super::{ConversationRepository, RepositoryError};

/// Same recall semantics as the SQL store, kept in process memory.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    entries: RwLock<Vec<ConversationEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryConversationRepository {
    /// Makes every subsequent call fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn entries(&self) -> Vec<ConversationEntry> {
        self.entries.read().await.clone()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn append(
        &self,
        conversation: NewConversation,
    ) -> Result<ConversationEntry, RepositoryError> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        let id = ConversationId(entries.len() as i64 + 1);
        let entry = conversation.with_id(id);
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn latest_containing(
        &self,
        fragment: &str,
    ) -> Result<Option<ConversationEntry>, RepositoryError> {
        self.check_available()?;
        let fragment = fragment.to_ascii_lowercase();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|entry| entry.query.to_ascii_lowercase().contains(&fragment))
            .max_by_key(|entry| (entry.created_at, entry.id))
            .cloned())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.check_available()?;
        Ok(self.entries.read().await.len() as u64)
    }
}
