use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use shelfwise_core::domain::activity::{ActivityType, UserActivity, UserId};
use shelfwise_core::domain::artifact::{
    ArtifactId, ArtifactStatus, ArtifactType, OptimizationArtifact,
};
use shelfwise_core::domain::conversation::{Conversation, ConversationKey};
use shelfwise_core::domain::product::{CategoryId, Product, ProductId};
use shelfwise_core::domain::relationship::{ProductRelationship, RelationshipKind};
use shelfwise_core::domain::sales::SalesHistoryRecord;
use shelfwise_core::sizing::SizePreference;

use super::{
    ActivityRepository, ArtifactRepository, CatalogRepository, ConversationRepository,
    RelationshipRepository, RepositoryError, SalesHistoryRepository, SizePreferenceRepository,
};

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    products: RwLock<HashMap<String, Product>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn find_approved_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(&id.0))
            .filter(|product| product.approved)
            .cloned()
            .collect())
    }

    async fn newest_approved(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut approved: Vec<Product> =
            products.values().filter(|product| product.approved).cloned().collect();
        approved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        approved.truncate(limit as usize);
        Ok(approved)
    }

    async fn newest_approved_in_category(
        &self,
        category: &CategoryId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut matching: Vec<Product> = products
            .values()
            .filter(|product| product.approved && product.category_id == *category)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn search_approved(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let needle = term.trim().to_lowercase();
        let products = self.products.read().await;
        let mut matching: Vec<Product> = products
            .values()
            .filter(|product| product.approved)
            .filter(|product| {
                product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn set_price(&self, id: &ProductId, price: Decimal) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(&id.0) {
            product.price = price;
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_stock(&self, id: &ProductId, stock: i64) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(&id.0) {
            product.stock = stock;
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_description(&self, id: &ProductId, text: &str) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(&id.0) {
            product.description = text.to_string();
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_specifications(
        &self,
        id: &ProductId,
        text: &str,
    ) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(&id.0) {
            product.specifications = text.to_string();
            product.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryActivityRepository {
    activities: RwLock<Vec<UserActivity>>,
}

fn is_recommendation_signal(activity_type: ActivityType) -> bool {
    matches!(
        activity_type,
        ActivityType::View | ActivityType::AddToCart | ActivityType::Purchase
    )
}

#[async_trait::async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn record(&self, activity: UserActivity) -> Result<(), RepositoryError> {
        let mut activities = self.activities.write().await;
        activities.push(activity);
        Ok(())
    }

    async fn recent_product_ids(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let activities = self.activities.read().await;
        let mut matching: Vec<&UserActivity> = activities
            .iter()
            .filter(|activity| {
                activity.user_id.as_ref() == Some(user_id)
                    && activity.product_id.is_some()
                    && is_recommendation_signal(activity.activity_type)
            })
            .collect();
        matching.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        let mut ids = Vec::new();
        for activity in matching {
            let product_id = activity.product_id.clone().expect("filtered above");
            if !ids.contains(&product_id) {
                ids.push(product_id);
            }
            if ids.len() == limit as usize {
                break;
            }
        }
        Ok(ids)
    }

    async fn category_touches_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<(CategoryId, i64)>, RepositoryError> {
        let activities = self.activities.read().await;
        let mut touches: HashMap<String, i64> = HashMap::new();
        for activity in activities.iter() {
            if activity.user_id.as_ref() != Some(user_id) || activity.occurred_at < since {
                continue;
            }
            if let Some(category) = &activity.category_id {
                *touches.entry(category.0.clone()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(CategoryId, i64)> =
            touches.into_iter().map(|(category, count)| (CategoryId(category), count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0 .0.cmp(&b.0 .0)));
        Ok(ranked)
    }

    async fn purchased_category_ids(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let activities = self.activities.read().await;
        let mut purchases: Vec<&UserActivity> = activities
            .iter()
            .filter(|activity| {
                activity.user_id.as_ref() == Some(user_id)
                    && activity.activity_type == ActivityType::Purchase
                    && activity.category_id.is_some()
            })
            .collect();
        purchases.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        let mut categories = Vec::new();
        for activity in purchases {
            let category = activity.category_id.clone().expect("filtered above");
            if !categories.contains(&category) {
                categories.push(category);
            }
            if categories.len() == limit as usize {
                break;
            }
        }
        Ok(categories)
    }

    async fn purchased_sizes(
        &self,
        user_id: &UserId,
        category: &CategoryId,
    ) -> Result<Vec<String>, RepositoryError> {
        let activities = self.activities.read().await;
        let mut purchases: Vec<&UserActivity> = activities
            .iter()
            .filter(|activity| {
                activity.user_id.as_ref() == Some(user_id)
                    && activity.category_id.as_ref() == Some(category)
            })
            .collect();
        purchases.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        Ok(purchases
            .iter()
            .filter_map(|activity| activity.purchased_size())
            .map(str::to_string)
            .collect())
    }

    async fn co_purchased_product_ids(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let activities = self.activities.read().await;

        let sessions: Vec<&str> = activities
            .iter()
            .filter(|activity| {
                activity.activity_type == ActivityType::Purchase
                    && activity.product_id.as_ref() == Some(product_id)
            })
            .map(|activity| activity.session_id.as_str())
            .collect();

        let mut frequency: HashMap<String, i64> = HashMap::new();
        for activity in activities.iter() {
            if activity.activity_type != ActivityType::Purchase {
                continue;
            }
            let Some(other) = &activity.product_id else {
                continue;
            };
            if other == product_id || !sessions.contains(&activity.session_id.as_str()) {
                continue;
            }
            *frequency.entry(other.0.clone()).or_insert(0) += 1;
        }

        let mut ranked: Vec<(String, i64)> = frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(ranked.into_iter().take(limit as usize).map(|(id, _)| ProductId(id)).collect())
    }
}

#[derive(Default)]
pub struct InMemoryRelationshipRepository {
    edges: RwLock<Vec<ProductRelationship>>,
}

fn sort_edges(edges: &mut [ProductRelationship]) {
    edges.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then_with(|| a.related_product_id.0.cmp(&b.related_product_id.0))
    });
}

#[async_trait::async_trait]
impl RelationshipRepository for InMemoryRelationshipRepository {
    async fn save(&self, edge: ProductRelationship) -> Result<(), RepositoryError> {
        let mut edges = self.edges.write().await;
        edges.retain(|existing| {
            !(existing.source_product_id == edge.source_product_id
                && existing.related_product_id == edge.related_product_id
                && existing.kind == edge.kind)
        });
        edges.push(edge);
        Ok(())
    }

    async fn complementary_from(
        &self,
        source: &ProductId,
    ) -> Result<Vec<ProductRelationship>, RepositoryError> {
        let edges = self.edges.read().await;
        let mut matching: Vec<ProductRelationship> = edges
            .iter()
            .filter(|edge| {
                edge.kind == RelationshipKind::Complementary && edge.source_product_id == *source
            })
            .cloned()
            .collect();
        sort_edges(&mut matching);
        Ok(matching)
    }

    async fn complementary_from_any(
        &self,
        sources: &[ProductId],
    ) -> Result<Vec<ProductRelationship>, RepositoryError> {
        let edges = self.edges.read().await;
        let mut matching: Vec<ProductRelationship> = edges
            .iter()
            .filter(|edge| {
                edge.kind == RelationshipKind::Complementary
                    && sources.contains(&edge.source_product_id)
            })
            .cloned()
            .collect();
        sort_edges(&mut matching);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemorySalesHistoryRepository {
    records: RwLock<Vec<SalesHistoryRecord>>,
}

#[async_trait::async_trait]
impl SalesHistoryRepository for InMemorySalesHistoryRepository {
    async fn record(&self, record: SalesHistoryRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn list_for_product(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<SalesHistoryRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut matching: Vec<SalesHistoryRecord> =
            records.iter().filter(|record| record.product_id == *product_id).cloned().collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemorySizePreferenceRepository {
    preferences: RwLock<HashMap<(String, String), SizePreference>>,
}

#[async_trait::async_trait]
impl SizePreferenceRepository for InMemorySizePreferenceRepository {
    async fn save(&self, preference: SizePreference) -> Result<(), RepositoryError> {
        let mut preferences = self.preferences.write().await;
        preferences.insert(
            (preference.user_id.0.clone(), preference.category_id.0.clone()),
            preference,
        );
        Ok(())
    }

    async fn find(
        &self,
        user_id: &UserId,
        category: &CategoryId,
    ) -> Result<Option<SizePreference>, RepositoryError> {
        let preferences = self.preferences.read().await;
        Ok(preferences.get(&(user_id.0.clone(), category.0.clone())).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<String, Conversation>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn upsert(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.key.storage_key(), conversation);
        Ok(())
    }

    async fn find_by_key(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(&key.storage_key()).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryArtifactRepository {
    artifacts: RwLock<HashMap<String, OptimizationArtifact>>,
}

#[async_trait::async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    async fn insert(&self, artifact: OptimizationArtifact) -> Result<(), RepositoryError> {
        let mut artifacts = self.artifacts.write().await;
        artifacts.insert(artifact.id.0.clone(), artifact);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ArtifactId,
    ) -> Result<Option<OptimizationArtifact>, RepositoryError> {
        let artifacts = self.artifacts.read().await;
        Ok(artifacts.get(&id.0).cloned())
    }

    async fn list_for_product(
        &self,
        product_id: &ProductId,
        artifact_type: Option<ArtifactType>,
    ) -> Result<Vec<OptimizationArtifact>, RepositoryError> {
        let artifacts = self.artifacts.read().await;
        let mut matching: Vec<OptimizationArtifact> = artifacts
            .values()
            .filter(|artifact| artifact.product_id == *product_id)
            .filter(|artifact| {
                artifact_type.map(|wanted| artifact.artifact_type() == wanted).unwrap_or(true)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn latest_for_product(
        &self,
        product_id: &ProductId,
        artifact_type: ArtifactType,
    ) -> Result<Option<OptimizationArtifact>, RepositoryError> {
        Ok(self.list_for_product(product_id, Some(artifact_type)).await?.into_iter().next())
    }

    async fn transition(
        &self,
        id: &ArtifactId,
        to: ArtifactStatus,
        applied_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // The write lock makes check-and-set atomic, mirroring the SQL
        // conditional UPDATE.
        let mut artifacts = self.artifacts.write().await;
        match artifacts.get_mut(&id.0) {
            Some(artifact) if artifact.status == ArtifactStatus::Pending => {
                artifact.status = to;
                artifact.applied_at = applied_at;
                artifact.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
