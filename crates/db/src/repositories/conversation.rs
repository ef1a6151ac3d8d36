use sqlx::Row;

use shelfwise_core::domain::activity::UserId;
use shelfwise_core::domain::conversation::{ChatMessage, Conversation, ConversationKey};
use shelfwise_core::domain::product::{CategoryId, ProductId};

use super::{parse_datetime, ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, RepositoryError> {
    let user_id: Option<String> =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let session_id: String =
        row.try_get("session_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_id: Option<String> =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category_id: Option<String> =
        row.try_get("category_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let messages_raw: String =
        row.try_get("messages").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let messages: Vec<ChatMessage> = serde_json::from_str(&messages_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid message history: {error}")))?;

    Ok(Conversation {
        key: ConversationKey {
            user_id: user_id.map(UserId),
            session_id,
            product_id: product_id.map(ProductId),
            category_id: category_id.map(CategoryId),
        },
        messages,
        created_at: parse_datetime(&created_at_str)?,
        updated_at: parse_datetime(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn upsert(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        let messages = serde_json::to_string(&conversation.messages)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO conversation (id, user_id, session_id, product_id, category_id,
                                       messages, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 messages = excluded.messages,
                 updated_at = excluded.updated_at",
        )
        .bind(conversation.key.storage_key())
        .bind(conversation.key.user_id.as_ref().map(|id| id.0.as_str()))
        .bind(&conversation.key.session_id)
        .bind(conversation.key.product_id.as_ref().map(|id| id.0.as_str()))
        .bind(conversation.key.category_id.as_ref().map(|id| id.0.as_str()))
        .bind(messages)
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_key(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, session_id, product_id, category_id, messages, created_at, updated_at
             FROM conversation WHERE id = ?",
        )
        .bind(key.storage_key())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_conversation(r)?)),
            None => Ok(None),
        }
    }
}
