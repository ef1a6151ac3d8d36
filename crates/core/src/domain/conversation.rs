use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::activity::UserId;
use crate::domain::product::{CategoryId, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Upsert key for a conversation. The same key always resolves to the same
/// stored row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub user_id: Option<UserId>,
    pub session_id: String,
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
}

impl ConversationKey {
    /// Deterministic storage key. `|` never appears in ids, so the join is
    /// collision-free.
    pub fn storage_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.user_id.as_ref().map(|id| id.0.as_str()).unwrap_or_default(),
            self.session_id,
            self.product_id.as_ref().map(|id| id.0.as_str()).unwrap_or_default(),
            self.category_id.as_ref().map(|id| id.0.as_str()).unwrap_or_default(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub key: ConversationKey,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
