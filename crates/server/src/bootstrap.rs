use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use shelfwise_core::config::{AppConfig, ConfigError, LoadOptions};
use shelfwise_core::keywords::KeywordCategoryMap;
use shelfwise_db::repositories::{
    SqlActivityRepository, SqlArtifactRepository, SqlCatalogRepository,
    SqlConversationRepository, SqlRelationshipRepository, SqlSalesHistoryRepository,
    SqlSizePreferenceRepository,
};
use shelfwise_db::{connect_with_settings, migrations, DbPool};
use shelfwise_engine::{
    ContentGenerator, ForecastGenerator, GatewayError, HttpModelGateway, InventoryOptimizer,
    OptimizationLifecycle, PriceOptimizer, RecommendationEngine, ShoppingAssistant,
    SizeRecommender,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub recommendations: RecommendationEngine,
    pub sizing: SizeRecommender,
    pub assistant: ShoppingAssistant,
    pub forecasts: ForecastGenerator,
    pub prices: PriceOptimizer,
    pub inventory: InventoryOptimizer,
    pub content: ContentGenerator,
    pub lifecycle: OptimizationLifecycle,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("model gateway initialization failed: {0}")]
    Gateway(#[source] GatewayError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let catalog = Arc::new(SqlCatalogRepository::new(db_pool.clone()));
    let activity = Arc::new(SqlActivityRepository::new(db_pool.clone()));
    let relationships = Arc::new(SqlRelationshipRepository::new(db_pool.clone()));
    let sales = Arc::new(SqlSalesHistoryRepository::new(db_pool.clone()));
    let preferences = Arc::new(SqlSizePreferenceRepository::new(db_pool.clone()));
    let conversations = Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let artifacts = Arc::new(SqlArtifactRepository::new(db_pool.clone()));

    let gateway =
        Arc::new(HttpModelGateway::from_config(&config.model).map_err(BootstrapError::Gateway)?);

    let recommendations = RecommendationEngine::new(
        catalog.clone(),
        activity.clone(),
        relationships.clone(),
    );
    let sizing = SizeRecommender::new(catalog.clone(), preferences, activity.clone());
    let assistant = ShoppingAssistant::new(
        catalog.clone(),
        activity.clone(),
        conversations,
        KeywordCategoryMap::default(),
        gateway.clone(),
    );
    let forecasts = ForecastGenerator::new(
        catalog.clone(),
        sales.clone(),
        artifacts.clone(),
        gateway.clone(),
    );
    let prices =
        PriceOptimizer::new(catalog.clone(), sales.clone(), artifacts.clone(), gateway.clone());
    let inventory =
        InventoryOptimizer::new(catalog.clone(), sales, artifacts.clone(), gateway.clone());
    let content = ContentGenerator::new(catalog.clone(), artifacts.clone(), gateway);
    let lifecycle = OptimizationLifecycle::new(artifacts, catalog);

    info!(event_name = "system.bootstrap.engines_ready", "merchandising engines constructed");

    Ok(Application {
        config,
        db_pool,
        recommendations,
        sizing,
        assistant,
        forecasts,
        prices,
        inventory,
        content,
        lifecycle,
    })
}
