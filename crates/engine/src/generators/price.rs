use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use shelfwise_core::decode::decode_json;
use shelfwise_core::domain::artifact::{
    ArtifactPayload, OptimizationArtifact, PriceOptimization,
};
use shelfwise_core::domain::product::ProductId;
use shelfwise_core::errors::EngineError;
use shelfwise_db::repositories::{
    ArtifactRepository, CatalogRepository, SalesHistoryRepository,
};

use crate::gateway::ModelGateway;

use super::{
    clamp_confidence, from_gateway, persistence, require_product, serialize_history,
    SALES_HISTORY_LIMIT,
};

pub struct PriceOptimizer {
    catalog: Arc<dyn CatalogRepository>,
    sales: Arc<dyn SalesHistoryRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    gateway: Arc<dyn ModelGateway>,
}

impl PriceOptimizer {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        sales: Arc<dyn SalesHistoryRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
        gateway: Arc<dyn ModelGateway>,
    ) -> Self {
        Self { catalog, sales, artifacts, gateway }
    }

    pub async fn generate(
        &self,
        product_id: &ProductId,
    ) -> Result<OptimizationArtifact, EngineError> {
        let product = require_product(&self.catalog, product_id).await?;
        let history = self
            .sales
            .list_for_product(product_id, SALES_HISTORY_LIMIT)
            .await
            .map_err(persistence)?;

        let prompt = build_prompt(
            &product.name,
            &product.price.to_string(),
            product.stock,
            &serialize_history(&history),
        );
        let raw = self.gateway.generate(&prompt).await.map_err(from_gateway)?;

        let mut decoded: PriceOptimization =
            decode_json(&raw).map_err(|error| EngineError::Validation(error.to_string()))?;

        // Rationale and market analysis drive operator trust; their absence
        // is a hard failure, never a silent default.
        if decoded.pricing_rationale.trim().is_empty() {
            return Err(EngineError::Validation(
                "pricingRationale is missing or empty".to_string(),
            ));
        }
        if decoded.market_analysis.trim().is_empty() {
            return Err(EngineError::Validation(
                "marketAnalysis is missing or empty".to_string(),
            ));
        }
        if decoded.suggested_price <= rust_decimal::Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "suggestedPrice must be positive, got {}",
                decoded.suggested_price
            )));
        }

        // The catalog, not the model, is the source of truth for the
        // current price.
        decoded.current_price = product.price;
        decoded.confidence_score = clamp_confidence(decoded.confidence_score);

        let artifact = OptimizationArtifact::new_pending(
            product.id.clone(),
            product.seller_id.clone(),
            ArtifactPayload::PriceOptimization(decoded),
            Utc::now(),
        );
        self.artifacts.insert(artifact.clone()).await.map_err(persistence)?;

        info!(
            event_name = "price_optimization.generated",
            product_id = %product_id,
            artifact_id = %artifact.id,
            "price optimization stored as pending"
        );
        Ok(artifact)
    }
}

fn build_prompt(product_name: &str, current_price: &str, stock: i64, history: &str) -> String {
    format!(
        "Suggest an optimized price for the product \"{product_name}\". \
         Current price: {current_price}. Current stock: {stock}.\n\
         Sales history (most recent first): {history}\n\n\
         Respond with ONLY a single JSON object, no prose and no code fences, \
         with exactly these fields:\n\
         {{\"currentPrice\": number, \"suggestedPrice\": number, \
         \"projectedRevenue\": number, \"projectedSales\": integer, \
         \"confidenceScore\": number between 0 and 1, \
         \"reasoningFactors\": object, \
         \"pricingRationale\": non-empty string, \
         \"marketAnalysis\": non-empty string}}"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use shelfwise_core::domain::artifact::{ArtifactPayload, ArtifactStatus};
    use shelfwise_core::domain::conversation::ChatMessage;
    use shelfwise_core::domain::product::{CategoryId, Product, ProductId, SellerId};
    use shelfwise_core::domain::sales::SalesHistoryRecord;
    use shelfwise_core::errors::EngineError;
    use shelfwise_db::repositories::{
        ArtifactRepository, CatalogRepository, InMemoryArtifactRepository,
        InMemoryCatalogRepository, InMemorySalesHistoryRepository, SalesHistoryRepository,
    };

    use crate::gateway::{GatewayError, ModelGateway};

    use super::PriceOptimizer;

    struct ScriptedGateway {
        response: String,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn generate(&self, _prompt: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        async fn converse(
            &self,
            _messages: &[ChatMessage],
            _system_context: &str,
        ) -> Result<String, GatewayError> {
            self.generate("").await
        }
    }

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId("P-1".to_string()),
            seller_id: SellerId("S-1".to_string()),
            name: "Trail Runner".to_string(),
            category_id: CategoryId("footwear".to_string()),
            price: Decimal::new(12_900, 2),
            stock: 30,
            size_range: None,
            description: String::new(),
            specifications: String::new(),
            approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn optimizer(
        response: &str,
    ) -> (PriceOptimizer, Arc<InMemoryArtifactRepository>) {
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        catalog.save(product()).await.expect("save");

        let sales = Arc::new(InMemorySalesHistoryRepository::default());
        sales
            .record(SalesHistoryRecord {
                product_id: ProductId("P-1".to_string()),
                seller_id: SellerId("S-1".to_string()),
                date: NaiveDate::from_ymd_opt(2026, 7, 1).expect("date"),
                quantity: 5,
                revenue: Decimal::new(64_500, 2),
                cost_price: Decimal::new(6_400, 2),
                profit_margin: 0.5,
                channel: "web".to_string(),
                promotion_applied: false,
                seasonality: None,
            })
            .await
            .expect("record");

        let artifacts = Arc::new(InMemoryArtifactRepository::default());
        let gateway =
            Arc::new(ScriptedGateway { response: response.to_string(), calls: AtomicUsize::new(0) });
        (PriceOptimizer::new(catalog, sales, artifacts.clone(), gateway), artifacts)
    }

    const VALID_RESPONSE: &str = r#"{
        "currentPrice": 120.00,
        "suggestedPrice": 139.00,
        "projectedRevenue": 4170.00,
        "projectedSales": 30,
        "confidenceScore": 0.78,
        "reasoningFactors": {"demand": "steady", "margin": "healthy"},
        "pricingRationale": "Demand held steady through a price test.",
        "marketAnalysis": "Comparable listings sit between 135 and 149."
    }"#;

    #[tokio::test]
    async fn well_formed_response_persists_pending() {
        let (optimizer, artifacts) = optimizer(VALID_RESPONSE).await;

        let artifact =
            optimizer.generate(&ProductId("P-1".to_string())).await.expect("generate");

        assert_eq!(artifact.status, ArtifactStatus::Pending);
        match &artifact.payload {
            ArtifactPayload::PriceOptimization(price) => {
                assert_eq!(price.suggested_price, Decimal::new(13_900, 2));
                // Catalog price overrides whatever the model echoed back.
                assert_eq!(price.current_price, Decimal::new(12_900, 2));
                assert!(!price.pricing_rationale.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let stored = artifacts
            .find_by_id(&artifact.id)
            .await
            .expect("find")
            .expect("persisted");
        assert_eq!(stored.status, ArtifactStatus::Pending);
    }

    #[tokio::test]
    async fn missing_market_analysis_never_reaches_pending() {
        let response = r#"{
            "currentPrice": 120.0,
            "suggestedPrice": 139.0,
            "projectedRevenue": 4170.0,
            "projectedSales": 30,
            "confidenceScore": 0.78,
            "reasoningFactors": {},
            "pricingRationale": "Solid demand."
        }"#;
        let (optimizer, artifacts) = optimizer(response).await;

        let error = optimizer
            .generate(&ProductId("P-1".to_string()))
            .await
            .err()
            .expect("should fail");
        assert!(matches!(error, EngineError::Validation(ref detail) if detail.contains("marketAnalysis")));

        let stored = artifacts
            .list_for_product(&ProductId("P-1".to_string()), None)
            .await
            .expect("list");
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn empty_rationale_is_rejected_like_a_missing_one() {
        let response = r#"{
            "currentPrice": 120.0,
            "suggestedPrice": 139.0,
            "projectedRevenue": 4170.0,
            "projectedSales": 30,
            "confidenceScore": 0.78,
            "reasoningFactors": {},
            "pricingRationale": "   ",
            "marketAnalysis": "Competitors priced higher."
        }"#;
        let (optimizer, _) = optimizer(response).await;

        let error = optimizer
            .generate(&ProductId("P-1".to_string()))
            .await
            .err()
            .expect("should fail");
        assert!(matches!(error, EngineError::Validation(ref detail) if detail.contains("pricingRationale")));
    }

    #[tokio::test]
    async fn non_positive_suggested_price_is_rejected() {
        let response = r#"{
            "currentPrice": 120.0,
            "suggestedPrice": 0,
            "projectedRevenue": 0,
            "projectedSales": 0,
            "confidenceScore": 0.5,
            "reasoningFactors": {},
            "pricingRationale": "None.",
            "marketAnalysis": "None."
        }"#;
        let (optimizer, _) = optimizer(response).await;

        let error = optimizer
            .generate(&ProductId("P-1".to_string()))
            .await
            .err()
            .expect("should fail");
        assert!(matches!(error, EngineError::Validation(ref detail) if detail.contains("suggestedPrice")));
    }

    #[tokio::test]
    async fn fenced_response_is_accepted() {
        let fenced = format!("```json\n{VALID_RESPONSE}\n```");
        let (optimizer, _) = optimizer(&fenced).await;
        assert!(optimizer.generate(&ProductId("P-1".to_string())).await.is_ok());
    }
}
