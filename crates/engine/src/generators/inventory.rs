use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use shelfwise_core::decode::decode_json;
use shelfwise_core::domain::artifact::{
    ArtifactPayload, ArtifactType, InventoryOptimization, OptimizationArtifact,
};
use shelfwise_core::domain::product::ProductId;
use shelfwise_core::errors::EngineError;
use shelfwise_db::repositories::{
    ArtifactRepository, CatalogRepository, SalesHistoryRepository,
};

use crate::gateway::ModelGateway;

use super::{from_gateway, persistence, require_product, serialize_history, SALES_HISTORY_LIMIT};

pub struct InventoryOptimizer {
    catalog: Arc<dyn CatalogRepository>,
    sales: Arc<dyn SalesHistoryRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    gateway: Arc<dyn ModelGateway>,
}

impl InventoryOptimizer {
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

        // The latest demand forecast, when one exists, sharpens the stock
        // targets; its absence is fine.
        let forecast_hint = self
            .artifacts
            .latest_for_product(product_id, ArtifactType::DemandForecast)
            .await
            .map_err(persistence)?
            .and_then(|artifact| match artifact.payload {
                ArtifactPayload::DemandForecast(forecast) => Some(format!(
                    "Latest demand forecast: {} units over {} (confidence {}).",
                    forecast.predicted_demand, forecast.period, forecast.confidence_score
                )),
                _ => None,
            })
            .unwrap_or_else(|| "No demand forecast is available.".to_string());

        let prompt = build_prompt(
            &product.name,
            product.stock,
            &forecast_hint,
            &serialize_history(&history),
        );
        let raw = self.gateway.generate(&prompt).await.map_err(from_gateway)?;

        let mut decoded: InventoryOptimization =
            decode_json(&raw).map_err(|error| EngineError::Validation(error.to_string()))?;

        if decoded.recommended_stock < 0 {
            return Err(EngineError::Validation(format!(
                "recommendedStock must not be negative, got {}",
                decoded.recommended_stock
            )));
        }

        // The catalog is the source of truth for current stock.
        decoded.current_stock = product.stock;

        let artifact = OptimizationArtifact::new_pending(
            product.id.clone(),
            product.seller_id.clone(),
            ArtifactPayload::InventoryOptimization(decoded),
            Utc::now(),
        );
        self.artifacts.insert(artifact.clone()).await.map_err(persistence)?;

        info!(
            event_name = "inventory_optimization.generated",
            product_id = %product_id,
            artifact_id = %artifact.id,
            "inventory optimization stored as pending"
        );
        Ok(artifact)
    }
}

fn build_prompt(product_name: &str, stock: i64, forecast_hint: &str, history: &str) -> String {
    format!(
        "Recommend inventory levels for the product \"{product_name}\". \
         Current stock: {stock}. {forecast_hint}\n\
         Sales history (most recent first): {history}\n\n\
         Respond with ONLY a single JSON object, no prose and no code fences, \
         with exactly these fields:\n\
         {{\"recommendedStock\": integer, \"reorderPoint\": integer, \
         \"maxStock\": integer, \"safetyStock\": integer, \"leadTime\": integer days, \
         \"reason\": string, \"priorityLevel\": string, \
         \"restockingAdvice\": optional string, \
         \"seasonalConsiderations\": optional string, \
         \"leadTimeRecommendations\": optional string}}"
    )
}
