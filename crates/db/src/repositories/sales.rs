use chrono::NaiveDate;
use sqlx::Row;

use shelfwise_core::domain::product::{ProductId, SellerId};
use shelfwise_core::domain::sales::SalesHistoryRecord;

use super::{parse_decimal, RepositoryError, SalesHistoryRepository};
use crate::DbPool;

pub struct SqlSalesHistoryRepository {
    pool: DbPool,
}

impl SqlSalesHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<SalesHistoryRecord, RepositoryError> {
    let product_id: String =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let seller_id: String =
        row.try_get("seller_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let date_str: String =
        row.try_get("sale_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let revenue_str: String =
        row.try_get("revenue").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let cost_price_str: String =
        row.try_get("cost_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let profit_margin: f64 =
        row.try_get("profit_margin").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let channel: String =
        row.try_get("channel").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let promotion_applied: i64 =
        row.try_get("promotion_applied").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let seasonality: Option<String> =
        row.try_get("seasonality").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("invalid date `{date_str}`: {error}")))?;

    Ok(SalesHistoryRecord {
        product_id: ProductId(product_id),
        seller_id: SellerId(seller_id),
        date,
        quantity,
        revenue: parse_decimal(&revenue_str)?,
        cost_price: parse_decimal(&cost_price_str)?,
        profit_margin,
        channel,
        promotion_applied: promotion_applied != 0,
        seasonality,
    })
}

#[async_trait::async_trait]
impl SalesHistoryRepository for SqlSalesHistoryRepository {
    async fn record(&self, record: SalesHistoryRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sales_history (product_id, seller_id, sale_date, quantity, revenue,
                                        cost_price, profit_margin, channel, promotion_applied,
                                        seasonality)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.product_id.0)
        .bind(&record.seller_id.0)
        .bind(record.date.format("%Y-%m-%d").to_string())
        .bind(record.quantity)
        .bind(record.revenue.to_string())
        .bind(record.cost_price.to_string())
        .bind(record.profit_margin)
        .bind(&record.channel)
        .bind(i64::from(record.promotion_applied))
        .bind(&record.seasonality)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_product(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<SalesHistoryRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_id, seller_id, sale_date, quantity, revenue, cost_price,
                    profit_margin, channel, promotion_applied, seasonality
             FROM sales_history
             WHERE product_id = ?
             ORDER BY sale_date DESC
             LIMIT ?",
        )
        .bind(&product_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
