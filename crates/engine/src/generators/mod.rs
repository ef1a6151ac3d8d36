//! Artifact generators. All four share one shape: fetch product and
//! history, build a strict-contract prompt, make exactly one gateway call,
//! decode and validate the response, persist the artifact as pending.
//! Nothing here mutates a product; that is the lifecycle manager's job.

use std::sync::Arc;

use serde_json::json;

use shelfwise_core::domain::product::{Product, ProductId};
use shelfwise_core::domain::sales::SalesHistoryRecord;
use shelfwise_core::errors::EngineError;
use shelfwise_db::repositories::{CatalogRepository, RepositoryError};

use crate::gateway::GatewayError;

pub mod content;
pub mod forecast;
pub mod inventory;
pub mod price;

pub use content::ContentGenerator;
pub use forecast::ForecastGenerator;
pub use inventory::InventoryOptimizer;
pub use price::PriceOptimizer;

/// How many sales records feed a generation prompt.
pub(crate) const SALES_HISTORY_LIMIT: u32 = 90;

pub(crate) fn persistence(error: RepositoryError) -> EngineError {
    EngineError::Persistence(error.to_string())
}

pub(crate) fn from_gateway(error: GatewayError) -> EngineError {
    match error {
        GatewayError::Unavailable(detail) => EngineError::ModelUnavailable(detail),
        GatewayError::Generation(detail) => EngineError::Generation(detail),
    }
}

pub(crate) async fn require_product(
    catalog: &Arc<dyn CatalogRepository>,
    product_id: &ProductId,
) -> Result<Product, EngineError> {
    catalog
        .find_by_id(product_id)
        .await
        .map_err(persistence)?
        .ok_or_else(|| EngineError::not_found("product", product_id.0.clone()))
}

/// Compact JSON projection of the sales history for prompt embedding.
pub(crate) fn serialize_history(history: &[SalesHistoryRecord]) -> String {
    let rows: Vec<serde_json::Value> = history
        .iter()
        .map(|record| {
            json!({
                "date": record.date.format("%Y-%m-%d").to_string(),
                "quantity": record.quantity,
                "revenue": record.revenue,
                "costPrice": record.cost_price,
                "profitMargin": record.profit_margin,
                "channel": record.channel,
                "promotionApplied": record.promotion_applied,
                "seasonality": record.seasonality,
            })
        })
        .collect();
    serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Confidence scores arrive from an untrusted generator; keep them in range.
pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use shelfwise_core::domain::product::{ProductId, SellerId};
    use shelfwise_core::domain::sales::SalesHistoryRecord;

    use super::{clamp_confidence, serialize_history};

    #[test]
    fn history_serializes_to_wire_field_names() {
        let history = vec![SalesHistoryRecord {
            product_id: ProductId("P-1".to_string()),
            seller_id: SellerId("S-1".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 7, 1).expect("date"),
            quantity: 4,
            revenue: Decimal::new(19_960, 2),
            cost_price: Decimal::new(8_000, 2),
            profit_margin: 0.35,
            channel: "web".to_string(),
            promotion_applied: true,
            seasonality: Some("summer".to_string()),
        }];

        let serialized = serialize_history(&history);
        assert!(serialized.contains("\"costPrice\""));
        assert!(serialized.contains("\"promotionApplied\""));
        assert!(serialized.contains("2026-07-01"));
    }

    #[test]
    fn confidence_is_clamped_into_unit_range() {
        assert_eq!(clamp_confidence(1.4), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(0.7), 0.7);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }
}
