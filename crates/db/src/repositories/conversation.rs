use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use krishimitr_core::domain::conversation::{ConversationEntry, ConversationId, NewConversation};

use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Fixed-width UTC timestamps keep lexical order equal to chronological order.
fn timestamp_to_sql(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationEntry, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let query: String = row.try_get("query").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reply: String = row.try_get("reply").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at `{created_at_str}`: {e}")))?;

    Ok(ConversationEntry { id: ConversationId(id), query, reply, created_at })
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn append(
        &self,
        conversation: NewConversation,
    ) -> Result<ConversationEntry, RepositoryError> {
        let result =
            sqlx::query("INSERT INTO conversation (query, reply, created_at) VALUES (?, ?, ?)")
                .bind(&conversation.query)
                .bind(&conversation.reply)
                .bind(timestamp_to_sql(&conversation.created_at))
                .execute(&self.pool)
                .await?;

        Ok(conversation.with_id(ConversationId(result.last_insert_rowid())))
    }

    async fn latest_containing(
        &self,
        fragment: &str,
    ) -> Result<Option<ConversationEntry>, RepositoryError> {
        // instr() rather than LIKE keeps `%` and `_` literal; lower() folds ASCII
        // case the way LIKE does.
        let row = sqlx::query(
            "SELECT id, query, reply, created_at
             FROM conversation
             WHERE instr(lower(query), lower(?)) > 0
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(fragment)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversation").fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use krishimitr_core::domain::conversation::NewConversation;

    use super::SqlConversationRepository;
    use crate::repositories::ConversationRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlConversationRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlConversationRepository::new(pool)
    }

    fn entry_at(query: &str, reply: &str, minute: u32) -> NewConversation {
        NewConversation {
            query: query.to_string(),
            reply: reply.to_string(),
            created_at: Utc
                .with_ymd_and_hms(2026, 3, 14, 9, minute, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[tokio::test]
    async fn append_then_recall_round_trip() {
        let repo = repository().await;

        let saved = repo
            .append(entry_at("gehu mein khad kab dalein", "Buvai ke 21 din baad.", 0))
            .await
            .expect("append");
        let found = repo.latest_containing("gehu mein khad kab dalein").await.expect("recall");

        assert_eq!(found, Some(saved));
    }

    #[tokio::test]
    async fn most_recent_matching_entry_wins() {
        let repo = repository().await;

        repo.append(entry_at("wheat price", "first answer", 1)).await.expect("append t1");
        repo.append(entry_at("wheat price", "second answer", 2)).await.expect("append t2");
        repo.append(entry_at("onion price", "unrelated", 3)).await.expect("append other");

        let found = repo.latest_containing("wheat").await.expect("recall").expect("match");

        assert_eq!(found.reply, "second answer");
    }

    #[tokio::test]
    async fn recency_is_by_timestamp_not_insertion_order() {
        let repo = repository().await;
        let later = entry_at("tamatar ki kheti", "later", 30);
        let mut earlier = entry_at("tamatar ki kheti", "earlier", 30);
        earlier.created_at = later.created_at - Duration::minutes(5);

        repo.append(later).await.expect("append later first");
        repo.append(earlier).await.expect("append earlier second");

        let found = repo.latest_containing("tamatar").await.expect("recall").expect("match");
        assert_eq!(found.reply, "later");
    }

    #[tokio::test]
    async fn recall_requires_stored_query_to_contain_fragment() {
        let repo = repository().await;
        repo.append(entry_at("wheat price", "answer", 0)).await.expect("append");

        let longer = repo.latest_containing("wheat price today").await.expect("recall");
        let wildcard = repo.latest_containing("wh%t").await.expect("recall");

        assert_eq!(longer, None);
        assert_eq!(wildcard, None);
    }

    #[tokio::test]
    async fn recall_ignores_ascii_case() {
        let repo = repository().await;
        repo.append(entry_at("wheat price", "answer", 0)).await.expect("append");

        let capitalised = repo.latest_containing("Wheat").await.expect("recall");
        let shouted = repo.latest_containing("WHEAT PRICE").await.expect("recall");

        assert_eq!(capitalised.map(|entry| entry.reply), Some("answer".to_string()));
        assert_eq!(shouted.map(|entry| entry.reply), Some("answer".to_string()));
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_persisted() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("conversations.db").display());
        let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = Arc::new(SqlConversationRepository::new(pool.clone()));

        let mut handles = Vec::new();
        for index in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.append(NewConversation::now(format!("sawaal {index}"), "jawab")).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("append");
        }

        assert_eq!(repo.count().await.expect("count"), 16);
        pool.close().await;
    }
}
