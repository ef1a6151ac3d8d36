use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use shelfwise_core::decode::decode_json;
use shelfwise_core::domain::artifact::{
    ArtifactPayload, DemandForecast, ForecastFactors, OptimizationArtifact,
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

/// Conservative defaults for products with no sales history: a model call
/// on data-free input would only produce confident-sounding noise.
const NO_HISTORY_PREDICTED_DEMAND: f64 = 10.0;
const NO_HISTORY_CONFIDENCE: f64 = 0.3;

pub struct ForecastGenerator {
    catalog: Arc<dyn CatalogRepository>,
    sales: Arc<dyn SalesHistoryRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    gateway: Arc<dyn ModelGateway>,
}

impl ForecastGenerator {
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
        period: &str,
    ) -> Result<OptimizationArtifact, EngineError> {
        let product = require_product(&self.catalog, product_id).await?;
        let history = self
            .sales
            .list_for_product(product_id, SALES_HISTORY_LIMIT)
            .await
            .map_err(persistence)?;

        let forecast = if history.is_empty() {
            info!(
                event_name = "forecast.no_history_shortcut",
                product_id = %product_id,
                "no sales history; synthesizing conservative forecast without a model call"
            );
            DemandForecast {
                predicted_demand: NO_HISTORY_PREDICTED_DEMAND,
                confidence_score: NO_HISTORY_CONFIDENCE,
                factors_considered: ForecastFactors::unknown(),
                period: period.to_string(),
            }
        } else {
            let prompt = build_prompt(&product.name, product.stock, &history, period);
            let raw = self.gateway.generate(&prompt).await.map_err(from_gateway)?;

            let mut decoded: DemandForecast = decode_json(&raw)
                .map_err(|error| EngineError::Validation(error.to_string()))?;
            if !decoded.predicted_demand.is_finite() || decoded.predicted_demand < 0.0 {
                return Err(EngineError::Validation(format!(
                    "predictedDemand is not a usable number: {}",
                    decoded.predicted_demand
                )));
            }
            decoded.confidence_score = clamp_confidence(decoded.confidence_score);
            decoded.period = period.to_string();
            decoded
        };

        let artifact = OptimizationArtifact::new_pending(
            product.id.clone(),
            product.seller_id.clone(),
            ArtifactPayload::DemandForecast(forecast),
            Utc::now(),
        );
        self.artifacts.insert(artifact.clone()).await.map_err(persistence)?;

        info!(
            event_name = "forecast.generated",
            product_id = %product_id,
            artifact_id = %artifact.id,
            "demand forecast stored as pending"
        );
        Ok(artifact)
    }
}

fn build_prompt(
    product_name: &str,
    stock: i64,
    history: &[shelfwise_core::domain::sales::SalesHistoryRecord],
    period: &str,
) -> String {
    format!(
        "Forecast demand for the product \"{product_name}\" over the next {period}. \
         Current stock: {stock}.\n\
         Sales history (most recent first): {history}\n\n\
         Respond with ONLY a single JSON object, no prose and no code fences, \
         with exactly these fields:\n\
         {{\"predictedDemand\": number, \"confidenceScore\": number between 0 and 1, \
         \"factorsConsidered\": {{\"seasonality\": string, \"trends\": string, \
         \"events\": [string], \"competition\": string}}}}",
        history = serialize_history(history),
    )
}
