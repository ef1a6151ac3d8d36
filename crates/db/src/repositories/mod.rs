use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use shelfwise_core::domain::activity::{UserActivity, UserId};
use shelfwise_core::domain::artifact::{
    ArtifactId, ArtifactStatus, ArtifactType, OptimizationArtifact,
};
use shelfwise_core::domain::conversation::{Conversation, ConversationKey};
use shelfwise_core::domain::product::{CategoryId, Product, ProductId};
use shelfwise_core::domain::relationship::ProductRelationship;
use shelfwise_core::domain::sales::SalesHistoryRecord;
use shelfwise_core::sizing::SizePreference;

pub mod activity;
pub mod artifact;
pub mod catalog;
pub mod conversation;
pub mod memory;
pub mod relationship;
pub mod sales;
pub mod size_preference;

pub use activity::SqlActivityRepository;
pub use artifact::SqlArtifactRepository;
pub use catalog::SqlCatalogRepository;
pub use conversation::SqlConversationRepository;
pub use memory::{
    InMemoryActivityRepository, InMemoryArtifactRepository, InMemoryCatalogRepository,
    InMemoryConversationRepository, InMemoryRelationshipRepository,
    InMemorySalesHistoryRepository, InMemorySizePreferenceRepository,
};
pub use relationship::SqlRelationshipRepository;
pub use sales::SqlSalesHistoryRepository;
pub use size_preference::SqlSizePreferenceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read access to the product catalog plus the narrow single-field writes
/// the lifecycle manager performs on `apply`.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn find_approved_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError>;
    async fn newest_approved(&self, limit: u32) -> Result<Vec<Product>, RepositoryError>;
    async fn newest_approved_in_category(
        &self,
        category: &CategoryId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;
    /// Case-insensitive substring search over name and description,
    /// approved products only.
    async fn search_approved(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
    async fn set_price(&self, id: &ProductId, price: Decimal) -> Result<(), RepositoryError>;
    async fn set_stock(&self, id: &ProductId, stock: i64) -> Result<(), RepositoryError>;
    async fn set_description(&self, id: &ProductId, text: &str) -> Result<(), RepositoryError>;
    async fn set_specifications(&self, id: &ProductId, text: &str)
        -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn record(&self, activity: UserActivity) -> Result<(), RepositoryError>;
    /// Distinct product ids from the user's most recent view / add-to-cart /
    /// purchase events, newest first.
    async fn recent_product_ids(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ProductId>, RepositoryError>;
    /// Category ids touched since `since`, ranked by touch count descending.
    async fn category_touches_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<(CategoryId, i64)>, RepositoryError>;
    /// Distinct categories the user has purchased from, newest first.
    async fn purchased_category_ids(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CategoryId>, RepositoryError>;
    /// Sizes recorded on the user's purchase payloads within a category.
    async fn purchased_sizes(
        &self,
        user_id: &UserId,
        category: &CategoryId,
    ) -> Result<Vec<String>, RepositoryError>;
    /// Products purchased in the same sessions as `product_id`, ranked by
    /// co-purchase frequency, excluding the product itself.
    async fn co_purchased_product_ids(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<ProductId>, RepositoryError>;
}

#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    async fn save(&self, edge: ProductRelationship) -> Result<(), RepositoryError>;
    /// Complementary edges from one source, strongest first.
    async fn complementary_from(
        &self,
        source: &ProductId,
    ) -> Result<Vec<ProductRelationship>, RepositoryError>;
    /// Complementary edges from any of the sources, strongest first.
    async fn complementary_from_any(
        &self,
        sources: &[ProductId],
    ) -> Result<Vec<ProductRelationship>, RepositoryError>;
}

#[async_trait]
pub trait SalesHistoryRepository: Send + Sync {
    async fn record(&self, record: SalesHistoryRecord) -> Result<(), RepositoryError>;
    async fn list_for_product(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<SalesHistoryRecord>, RepositoryError>;
}

#[async_trait]
pub trait SizePreferenceRepository: Send + Sync {
    async fn save(&self, preference: SizePreference) -> Result<(), RepositoryError>;
    async fn find(
        &self,
        user_id: &UserId,
        category: &CategoryId,
    ) -> Result<Option<SizePreference>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Same key updates in place.
    async fn upsert(&self, conversation: Conversation) -> Result<(), RepositoryError>;
    async fn find_by_key(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<Conversation>, RepositoryError>;
}

#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn insert(&self, artifact: OptimizationArtifact) -> Result<(), RepositoryError>;
    async fn find_by_id(
        &self,
        id: &ArtifactId,
    ) -> Result<Option<OptimizationArtifact>, RepositoryError>;
    async fn list_for_product(
        &self,
        product_id: &ProductId,
        artifact_type: Option<ArtifactType>,
    ) -> Result<Vec<OptimizationArtifact>, RepositoryError>;
    async fn latest_for_product(
        &self,
        product_id: &ProductId,
        artifact_type: ArtifactType,
    ) -> Result<Option<OptimizationArtifact>, RepositoryError>;
    /// Atomic `pending -> to` transition. Returns `false` when the artifact
    /// was not pending (already decided, or missing), so a lost race can
    /// never re-apply.
    async fn transition(
        &self,
        id: &ArtifactId,
        to: ArtifactStatus,
        applied_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("invalid decimal `{raw}`: {error}")))
}
