use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::warn;

use shelfwise_core::domain::activity::UserId;
use shelfwise_core::domain::product::{Product, ProductId};
use shelfwise_db::repositories::{
    ActivityRepository, CatalogRepository, RelationshipRepository, RepositoryError,
};

/// How many of the user's most recent product touches seed the
/// relationship-based tier.
const RECENT_ACTIVITY_WINDOW: u32 = 20;
/// Trailing window for category affinity, in days.
const CATEGORY_AFFINITY_DAYS: i64 = 30;
/// At most this many categories contribute to the category tier.
const MAX_AFFINITY_CATEGORIES: usize = 5;

fn per_category_quota(limit: u32, category_count: usize) -> u32 {
    // ceil(limit / category_count)
    let count = category_count.max(1) as u32;
    limit.div_ceil(count)
}

/// Buyer-facing recommendations. Every public method is a fallback chain:
/// a tier that errors or comes back empty logs and falls through, so the
/// caller always gets a (possibly generic) answer and never an error.
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogRepository>,
    activity: Arc<dyn ActivityRepository>,
    relationships: Arc<dyn RelationshipRepository>,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        activity: Arc<dyn ActivityRepository>,
        relationships: Arc<dyn RelationshipRepository>,
    ) -> Self {
        Self { catalog, activity, relationships }
    }

    pub async fn personalized(&self, user_id: Option<&UserId>, limit: u32) -> Vec<Product> {
        if limit == 0 {
            return Vec::new();
        }

        if let Some(user_id) = user_id {
            match self.related_to_recent_activity(user_id, limit).await {
                Ok(products) if !products.is_empty() => return products,
                Ok(_) => {}
                Err(error) => log_tier_failure("personalized.relationships", &error),
            }

            match self.from_category_affinity(user_id, limit).await {
                Ok(products) if !products.is_empty() => return products,
                Ok(_) => {}
                Err(error) => log_tier_failure("personalized.categories", &error),
            }
        }

        match self.catalog.newest_approved(limit).await {
            Ok(products) => products,
            Err(error) => {
                log_tier_failure("personalized.newest", &error);
                Vec::new()
            }
        }
    }

    pub async fn complementary(&self, product_id: &ProductId, limit: u32) -> Vec<Product> {
        if limit == 0 {
            return Vec::new();
        }

        match self.from_curated_edges(product_id, limit).await {
            Ok(products) if !products.is_empty() => return products,
            Ok(_) => {}
            Err(error) => log_tier_failure("complementary.edges", &error),
        }

        match self.from_co_purchases(product_id, limit).await {
            Ok(products) if !products.is_empty() => return products,
            Ok(_) => {}
            Err(error) => log_tier_failure("complementary.co_purchases", &error),
        }

        match self.from_same_category(product_id, limit).await {
            Ok(products) => products,
            Err(error) => {
                log_tier_failure("complementary.category", &error);
                Vec::new()
            }
        }
    }

    /// Tier 1: complementary edges whose source is among the user's recent
    /// product touches, strongest edge first.
    async fn related_to_recent_activity(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let recent =
            self.activity.recent_product_ids(user_id, RECENT_ACTIVITY_WINDOW).await?;
        if recent.is_empty() {
            return Ok(Vec::new());
        }

        let edges = self.relationships.complementary_from_any(&recent).await?;
        let mut candidate_ids = Vec::new();
        for edge in &edges {
            if !candidate_ids.contains(&edge.related_product_id) {
                candidate_ids.push(edge.related_product_id.clone());
            }
            if candidate_ids.len() == limit as usize {
                break;
            }
        }

        Ok(self.resolve_in_order(&candidate_ids).await?)
    }

    /// Tier 2: most-touched categories over the trailing window, newest
    /// approved products pulled proportionally from each.
    async fn from_category_affinity(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let since = Utc::now() - Duration::days(CATEGORY_AFFINITY_DAYS);
        let touches = self.activity.category_touches_since(user_id, since).await?;
        let categories: Vec<_> =
            touches.into_iter().take(MAX_AFFINITY_CATEGORIES).map(|(id, _)| id).collect();
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let quota = per_category_quota(limit, categories.len());
        let mut products = Vec::new();
        let mut seen = BTreeSet::new();
        for category in &categories {
            let batch = self.catalog.newest_approved_in_category(category, quota).await?;
            for product in batch {
                if seen.insert(product.id.0.clone()) {
                    products.push(product);
                }
            }
        }

        products.truncate(limit as usize);
        Ok(products)
    }

    /// Tier a: curated complementary edges from the product itself.
    async fn from_curated_edges(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let edges = self.relationships.complementary_from(product_id).await?;
        let candidate_ids: Vec<ProductId> = edges
            .into_iter()
            .map(|edge| edge.related_product_id)
            .take(limit as usize)
            .collect();
        self.resolve_in_order(&candidate_ids).await
    }

    /// Tier b: products bought in the same sessions, frequency-ranked.
    async fn from_co_purchases(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let candidate_ids = self.activity.co_purchased_product_ids(product_id, limit).await?;
        self.resolve_in_order(&candidate_ids).await
    }

    /// Tier c: same-category products, newest first, excluding the product.
    async fn from_same_category(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let Some(product) = self.catalog.find_by_id(product_id).await? else {
            return Ok(Vec::new());
        };

        let mut products = self
            .catalog
            .newest_approved_in_category(&product.category_id, limit + 1)
            .await?;
        products.retain(|candidate| candidate.id != *product_id);
        products.truncate(limit as usize);
        Ok(products)
    }

    /// Resolve ids to approved products, preserving the callers' ranking.
    async fn resolve_in_order(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let fetched = self.catalog.find_approved_by_ids(ids).await?;
        let mut ordered = Vec::with_capacity(fetched.len());
        for id in ids {
            if let Some(product) = fetched.iter().find(|product| product.id == *id) {
                ordered.push(product.clone());
            }
        }
        Ok(ordered)
    }
}

fn log_tier_failure(tier: &'static str, error: &RepositoryError) {
    warn!(
        event_name = "recommendation.tier_failed",
        tier,
        error = %error,
        "recommendation tier failed; falling through"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use shelfwise_core::domain::activity::{ActivityType, UserActivity, UserId};
    use shelfwise_core::domain::product::{CategoryId, Product, ProductId, SellerId};
    use shelfwise_core::domain::relationship::{ProductRelationship, RelationshipKind};
    use shelfwise_db::repositories::{
        ActivityRepository, CatalogRepository, InMemoryActivityRepository,
        InMemoryCatalogRepository, InMemoryRelationshipRepository, RelationshipRepository,
        RepositoryError,
    };

    use super::{per_category_quota, RecommendationEngine};

    fn product(id: &str, category: &str, age_days: i64) -> Product {
        let created = Utc::now() - Duration::days(age_days);
        Product {
            id: ProductId(id.to_string()),
            seller_id: SellerId("S-1".to_string()),
            name: format!("Product {id}"),
            category_id: CategoryId(category.to_string()),
            price: Decimal::new(4999, 2),
            stock: 5,
            size_range: None,
            description: String::new(),
            specifications: String::new(),
            approved: true,
            created_at: created,
            updated_at: created,
        }
    }

    fn view(user: &str, product: &str, age_days: i64) -> UserActivity {
        UserActivity {
            user_id: Some(UserId(user.to_string())),
            session_id: "s1".to_string(),
            activity_type: ActivityType::View,
            product_id: Some(ProductId(product.to_string())),
            category_id: None,
            search_query: None,
            payload: json!({}),
            occurred_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn category_view(user: &str, category: &str, age_days: i64) -> UserActivity {
        UserActivity {
            user_id: Some(UserId(user.to_string())),
            session_id: "s1".to_string(),
            activity_type: ActivityType::View,
            product_id: None,
            category_id: Some(CategoryId(category.to_string())),
            search_query: None,
            payload: json!({}),
            occurred_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn edge(source: &str, related: &str, strength: f64) -> ProductRelationship {
        ProductRelationship {
            source_product_id: ProductId(source.to_string()),
            related_product_id: ProductId(related.to_string()),
            kind: RelationshipKind::Complementary,
            strength,
        }
    }

    /// Counts category-affinity reads so tier-skipping is observable.
    struct CountingActivityRepository {
        inner: InMemoryActivityRepository,
        category_touch_calls: AtomicUsize,
    }

    impl CountingActivityRepository {
        fn new(inner: InMemoryActivityRepository) -> Self {
            Self { inner, category_touch_calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait::async_trait]
    impl ActivityRepository for CountingActivityRepository {
        async fn record(&self, activity: UserActivity) -> Result<(), RepositoryError> {
            self.inner.record(activity).await
        }

        async fn recent_product_ids(
            &self,
            user_id: &UserId,
            limit: u32,
        ) -> Result<Vec<ProductId>, RepositoryError> {
            self.inner.recent_product_ids(user_id, limit).await
        }

        async fn category_touches_since(
            &self,
            user_id: &UserId,
            since: DateTime<Utc>,
        ) -> Result<Vec<(CategoryId, i64)>, RepositoryError> {
            self.category_touch_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.category_touches_since(user_id, since).await
        }

        async fn purchased_category_ids(
            &self,
            user_id: &UserId,
            limit: u32,
        ) -> Result<Vec<CategoryId>, RepositoryError> {
            self.inner.purchased_category_ids(user_id, limit).await
        }

        async fn purchased_sizes(
            &self,
            user_id: &UserId,
            category: &CategoryId,
        ) -> Result<Vec<String>, RepositoryError> {
            self.inner.purchased_sizes(user_id, category).await
        }

        async fn co_purchased_product_ids(
            &self,
            product_id: &ProductId,
            limit: u32,
        ) -> Result<Vec<ProductId>, RepositoryError> {
            self.inner.co_purchased_product_ids(product_id, limit).await
        }
    }

    async fn seeded_catalog(products: Vec<Product>) -> Arc<InMemoryCatalogRepository> {
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        for product in products {
            catalog.save(product).await.expect("save product");
        }
        catalog
    }

    #[tokio::test]
    async fn relationship_tier_wins_and_later_tiers_are_not_invoked() {
        let catalog = seeded_catalog(vec![
            product("P-seen", "footwear", 5),
            product("P-socks", "footwear", 3),
            product("P-pack", "accessories", 2),
        ])
        .await;

        let activity = Arc::new(CountingActivityRepository::new(
            InMemoryActivityRepository::default(),
        ));
        activity.record(view("U-1", "P-seen", 1)).await.expect("record");

        let relationships = Arc::new(InMemoryRelationshipRepository::default());
        relationships.save(edge("P-seen", "P-socks", 0.9)).await.expect("save");
        relationships.save(edge("P-seen", "P-pack", 0.5)).await.expect("save");

        let engine = RecommendationEngine::new(catalog, activity.clone(), relationships);
        let recommended = engine.personalized(Some(&UserId("U-1".to_string())), 5).await;

        let ids: Vec<&str> = recommended.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["P-socks", "P-pack"]);
        assert_eq!(
            activity.category_touch_calls.load(Ordering::SeqCst),
            0,
            "category tier must not run when the relationship tier produced results"
        );
    }

    #[tokio::test]
    async fn category_tier_fills_in_when_no_relationships_match() {
        let catalog = seeded_catalog(vec![
            product("P-1", "apparel", 1),
            product("P-2", "apparel", 2),
            product("P-3", "footwear", 1),
            product("P-other", "home", 1),
        ])
        .await;

        let activity = Arc::new(InMemoryActivityRepository::default());
        for _ in 0..3 {
            activity.record(category_view("U-1", "apparel", 2)).await.expect("record");
        }
        activity.record(category_view("U-1", "footwear", 2)).await.expect("record");

        let relationships = Arc::new(InMemoryRelationshipRepository::default());
        let engine = RecommendationEngine::new(catalog, activity, relationships);

        let recommended = engine.personalized(Some(&UserId("U-1".to_string())), 4).await;
        let ids: Vec<&str> = recommended.iter().map(|p| p.id.0.as_str()).collect();

        // ceil(4/2) = 2 per category; apparel ranks first.
        assert_eq!(ids, vec!["P-1", "P-2", "P-3"]);
    }

    #[tokio::test]
    async fn anonymous_users_get_newest_approved_products() {
        let catalog = seeded_catalog(vec![
            product("P-new", "apparel", 0),
            product("P-old", "apparel", 9),
        ])
        .await;
        let engine = RecommendationEngine::new(
            catalog,
            Arc::new(InMemoryActivityRepository::default()),
            Arc::new(InMemoryRelationshipRepository::default()),
        );

        let recommended = engine.personalized(None, 1).await;
        assert_eq!(recommended.len(), 1);
        assert_eq!(recommended[0].id.0, "P-new");
    }

    #[tokio::test]
    async fn personalized_never_exceeds_limit() {
        let catalog = seeded_catalog(
            (0..10).map(|index| product(&format!("P-{index}"), "apparel", index)).collect(),
        )
        .await;
        let engine = RecommendationEngine::new(
            catalog,
            Arc::new(InMemoryActivityRepository::default()),
            Arc::new(InMemoryRelationshipRepository::default()),
        );

        assert_eq!(engine.personalized(None, 3).await.len(), 3);
        assert!(engine.personalized(None, 0).await.is_empty());
    }

    #[tokio::test]
    async fn complementary_prefers_curated_edges() {
        let catalog = seeded_catalog(vec![
            product("P-main", "footwear", 1),
            product("P-socks", "footwear", 2),
            product("P-laces", "footwear", 3),
        ])
        .await;

        let relationships = Arc::new(InMemoryRelationshipRepository::default());
        relationships.save(edge("P-main", "P-laces", 0.8)).await.expect("save");

        let engine = RecommendationEngine::new(
            catalog,
            Arc::new(InMemoryActivityRepository::default()),
            relationships,
        );

        let related = engine.complementary(&ProductId("P-main".to_string()), 5).await;
        let ids: Vec<&str> = related.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["P-laces"]);
    }

    #[tokio::test]
    async fn complementary_falls_back_to_co_purchases_then_category() {
        let catalog = seeded_catalog(vec![
            product("P-main", "footwear", 5),
            product("P-bought-together", "accessories", 4),
            product("P-same-cat", "footwear", 1),
        ])
        .await;

        let activity = Arc::new(InMemoryActivityRepository::default());
        for (session, product_id) in [("s1", "P-main"), ("s1", "P-bought-together")] {
            activity
                .record(UserActivity {
                    user_id: None,
                    session_id: session.to_string(),
                    activity_type: ActivityType::Purchase,
                    product_id: Some(ProductId(product_id.to_string())),
                    category_id: None,
                    search_query: None,
                    payload: json!({}),
                    occurred_at: Utc::now(),
                })
                .await
                .expect("record");
        }

        let engine = RecommendationEngine::new(
            catalog,
            activity,
            Arc::new(InMemoryRelationshipRepository::default()),
        );

        // No curated edges: co-purchase tier answers.
        let related = engine.complementary(&ProductId("P-main".to_string()), 5).await;
        let ids: Vec<&str> = related.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["P-bought-together"]);

        // A product with no edges and no co-purchases degrades to category.
        let fallback = engine.complementary(&ProductId("P-same-cat".to_string()), 5).await;
        let ids: Vec<&str> = fallback.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["P-main"]);
    }

    #[tokio::test]
    async fn unknown_product_yields_empty_not_error() {
        let engine = RecommendationEngine::new(
            Arc::new(InMemoryCatalogRepository::default()),
            Arc::new(InMemoryActivityRepository::default()),
            Arc::new(InMemoryRelationshipRepository::default()),
        );

        let related = engine.complementary(&ProductId("P-404".to_string()), 5).await;
        assert!(related.is_empty());
    }

    #[test]
    fn quota_is_ceiling_division() {
        assert_eq!(per_category_quota(10, 3), 4);
        assert_eq!(per_category_quota(10, 5), 2);
        assert_eq!(per_category_quota(1, 4), 1);
        assert_eq!(per_category_quota(5, 0), 5);
    }
}
