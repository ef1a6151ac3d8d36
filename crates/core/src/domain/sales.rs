use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductId, SellerId};

/// Append-only sales fact, the raw input to forecasting, pricing, and
/// inventory generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesHistoryRecord {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub date: NaiveDate,
    pub quantity: i64,
    pub revenue: Decimal,
    pub cost_price: Decimal,
    pub profit_margin: f64,
    pub channel: String,
    pub promotion_applied: bool,
    pub seasonality: Option<String>,
}
