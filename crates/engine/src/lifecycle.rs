use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use shelfwise_core::domain::artifact::{
    ArtifactId, ArtifactPayload, ArtifactStatus, ArtifactType, ContentType,
    OptimizationArtifact,
};
use shelfwise_core::domain::product::{ProductId, SellerId};
use shelfwise_core::errors::EngineError;
use shelfwise_db::repositories::{ArtifactRepository, CatalogRepository, RepositoryError};

/// Operator-facing apply/reject over pending artifacts.
///
/// Ordering is deliberate: ownership check, then the atomic status
/// transition, then the product write. A crash between the last two leaves
/// an applied artifact with a stale product, which is detectable and
/// reconcilable; the reverse order could mutate a product with no audit
/// record.
pub struct OptimizationLifecycle {
    artifacts: Arc<dyn ArtifactRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl OptimizationLifecycle {
    pub fn new(artifacts: Arc<dyn ArtifactRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { artifacts, catalog }
    }

    pub async fn apply(
        &self,
        artifact_id: &ArtifactId,
        seller_id: &SellerId,
    ) -> Result<OptimizationArtifact, EngineError> {
        let artifact = self.checked_artifact(artifact_id, seller_id).await?;

        let now = Utc::now();
        let moved = self
            .artifacts
            .transition(artifact_id, ArtifactStatus::Applied, Some(now), now)
            .await
            .map_err(persistence)?;
        if !moved {
            return Err(EngineError::Validation(
                "artifact was decided concurrently and is no longer pending".to_string(),
            ));
        }

        self.apply_product_mutation(&artifact).await?;

        info!(
            event_name = "lifecycle.applied",
            artifact_id = %artifact_id,
            product_id = %artifact.product_id,
            seller_id = %seller_id,
            artifact_type = artifact.artifact_type().as_str(),
            "artifact applied"
        );

        self.reload(artifact_id).await
    }

    pub async fn reject(
        &self,
        artifact_id: &ArtifactId,
        seller_id: &SellerId,
    ) -> Result<OptimizationArtifact, EngineError> {
        let artifact = self.checked_artifact(artifact_id, seller_id).await?;

        let moved = self
            .artifacts
            .transition(artifact_id, ArtifactStatus::Rejected, None, Utc::now())
            .await
            .map_err(persistence)?;
        if !moved {
            return Err(EngineError::Validation(
                "artifact was decided concurrently and is no longer pending".to_string(),
            ));
        }

        info!(
            event_name = "lifecycle.rejected",
            artifact_id = %artifact_id,
            product_id = %artifact.product_id,
            seller_id = %seller_id,
            "artifact rejected"
        );

        self.reload(artifact_id).await
    }

    pub async fn list(
        &self,
        product_id: &ProductId,
        artifact_type: Option<ArtifactType>,
    ) -> Result<Vec<OptimizationArtifact>, EngineError> {
        self.artifacts.list_for_product(product_id, artifact_type).await.map_err(persistence)
    }

    /// Fetch, enforce ownership, and reject terminal states up front. The
    /// conditional transition still guards against a race after this check.
    async fn checked_artifact(
        &self,
        artifact_id: &ArtifactId,
        seller_id: &SellerId,
    ) -> Result<OptimizationArtifact, EngineError> {
        let artifact = self
            .artifacts
            .find_by_id(artifact_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| EngineError::not_found("artifact", artifact_id.0.clone()))?;

        if artifact.seller_id != *seller_id {
            return Err(EngineError::not_authorized(
                "artifact",
                artifact_id.0.clone(),
                seller_id.0.clone(),
            ));
        }

        match artifact.status {
            ArtifactStatus::Pending => Ok(artifact),
            ArtifactStatus::Applied => Err(EngineError::Validation(
                "artifact has already been applied".to_string(),
            )),
            ArtifactStatus::Rejected => Err(EngineError::Validation(
                "artifact has already been rejected".to_string(),
            )),
        }
    }

    /// The single product write an apply performs. Forecasts are
    /// informational; `features` content has no product field and is
    /// generate-and-display-only.
    async fn apply_product_mutation(
        &self,
        artifact: &OptimizationArtifact,
    ) -> Result<(), EngineError> {
        match &artifact.payload {
            ArtifactPayload::DemandForecast(_) => Ok(()),
            ArtifactPayload::PriceOptimization(price) => self
                .catalog
                .set_price(&artifact.product_id, price.suggested_price)
                .await
                .map_err(persistence),
            ArtifactPayload::InventoryOptimization(inventory) => self
                .catalog
                .set_stock(&artifact.product_id, inventory.recommended_stock)
                .await
                .map_err(persistence),
            ArtifactPayload::Content(content) => match content.content_type {
                ContentType::Description => self
                    .catalog
                    .set_description(&artifact.product_id, &content.generated_content)
                    .await
                    .map_err(persistence),
                ContentType::Specifications => self
                    .catalog
                    .set_specifications(&artifact.product_id, &content.generated_content)
                    .await
                    .map_err(persistence),
                ContentType::Features => {
                    info!(
                        event_name = "lifecycle.features_display_only",
                        artifact_id = %artifact.id,
                        "features content accepted without a product mutation"
                    );
                    Ok(())
                }
            },
        }
    }

    async fn reload(&self, artifact_id: &ArtifactId) -> Result<OptimizationArtifact, EngineError> {
        self.artifacts
            .find_by_id(artifact_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| EngineError::not_found("artifact", artifact_id.0.clone()))
    }
}

fn persistence(error: RepositoryError) -> EngineError {
    EngineError::Persistence(error.to_string())
}
