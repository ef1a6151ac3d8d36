use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::{ProductId, SellerId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    Applied,
    Rejected,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "applied" => Some(Self::Applied),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Applied | Self::Rejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    DemandForecast,
    PriceOptimization,
    InventoryOptimization,
    Content,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DemandForecast => "demand_forecast",
            Self::PriceOptimization => "price_optimization",
            Self::InventoryOptimization => "inventory_optimization",
            Self::Content => "content",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demand_forecast" => Some(Self::DemandForecast),
            "price_optimization" => Some(Self::PriceOptimization),
            "inventory_optimization" => Some(Self::InventoryOptimization),
            "content" => Some(Self::Content),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Description,
    Features,
    Specifications,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Features => "features",
            Self::Specifications => "specifications",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "description" => Some(Self::Description),
            "features" => Some(Self::Features),
            "specifications" => Some(Self::Specifications),
            _ => None,
        }
    }
}

/// Forecast factor block. Field names are part of the model output contract;
/// missing entries coerce to empty rather than failing the parse.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastFactors {
    #[serde(default)]
    pub seasonality: String,
    #[serde(default)]
    pub trends: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub competition: String,
}

impl ForecastFactors {
    pub fn unknown() -> Self {
        Self {
            seasonality: "unknown".to_string(),
            trends: "unknown".to_string(),
            events: Vec::new(),
            competition: "unknown".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandForecast {
    pub predicted_demand: f64,
    pub confidence_score: f64,
    #[serde(default)]
    pub factors_considered: ForecastFactors,
    /// Forecast horizon label, e.g. `"30d"`. Set by the generator, not the
    /// model, so it defaults when decoding raw model output.
    #[serde(default)]
    pub period: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOptimization {
    pub current_price: Decimal,
    pub suggested_price: Decimal,
    pub projected_revenue: Decimal,
    pub projected_sales: i64,
    pub confidence_score: f64,
    #[serde(default)]
    pub reasoning_factors: serde_json::Value,
    #[serde(default)]
    pub pricing_rationale: String,
    #[serde(default)]
    pub market_analysis: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryOptimization {
    #[serde(default)]
    pub current_stock: i64,
    pub recommended_stock: i64,
    pub reorder_point: i64,
    pub max_stock: i64,
    pub safety_stock: i64,
    pub lead_time: i64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub priority_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restocking_advice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonal_considerations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_time_recommendations: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub content_type: ContentType,
    pub original_data: String,
    pub generated_content: String,
    pub prompt_used: String,
}

/// Type-specific body of an optimization artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ArtifactPayload {
    DemandForecast(DemandForecast),
    PriceOptimization(PriceOptimization),
    InventoryOptimization(InventoryOptimization),
    Content(GeneratedContent),
}

impl ArtifactPayload {
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            Self::DemandForecast(_) => ArtifactType::DemandForecast,
            Self::PriceOptimization(_) => ArtifactType::PriceOptimization,
            Self::InventoryOptimization(_) => ArtifactType::InventoryOptimization,
            Self::Content(_) => ArtifactType::Content,
        }
    }

    /// Serialize only the inner shape; the type tag is stored as its own
    /// column by the repository.
    pub fn to_inner_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::DemandForecast(inner) => serde_json::to_string(inner),
            Self::PriceOptimization(inner) => serde_json::to_string(inner),
            Self::InventoryOptimization(inner) => serde_json::to_string(inner),
            Self::Content(inner) => serde_json::to_string(inner),
        }
    }

    pub fn from_inner_json(
        artifact_type: ArtifactType,
        json: &str,
    ) -> Result<Self, serde_json::Error> {
        Ok(match artifact_type {
            ArtifactType::DemandForecast => Self::DemandForecast(serde_json::from_str(json)?),
            ArtifactType::PriceOptimization => Self::PriceOptimization(serde_json::from_str(json)?),
            ArtifactType::InventoryOptimization => {
                Self::InventoryOptimization(serde_json::from_str(json)?)
            }
            ArtifactType::Content => Self::Content(serde_json::from_str(json)?),
        })
    }
}

/// Persisted recommendation object with a lifecycle status.
///
/// Invariants: exactly one terminal transition per artifact, and
/// `applied_at` is set if and only if `status` is `Applied`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationArtifact {
    pub id: ArtifactId,
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub status: ArtifactStatus,
    pub payload: ArtifactPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl OptimizationArtifact {
    /// Generators create artifacts in exactly this shape; only the
    /// lifecycle manager moves them out of `Pending`.
    pub fn new_pending(
        product_id: ProductId,
        seller_id: SellerId,
        payload: ArtifactPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ArtifactId::generate(),
            product_id,
            seller_id,
            status: ArtifactStatus::Pending,
            payload,
            created_at: now,
            updated_at: now,
            applied_at: None,
        }
    }

    pub fn artifact_type(&self) -> ArtifactType {
        self.payload.artifact_type()
    }
}
