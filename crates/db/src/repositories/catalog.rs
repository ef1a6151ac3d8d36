use rust_decimal::Decimal;
use sqlx::Row;

use shelfwise_core::domain::product::{CategoryId, Product, ProductId, SellerId};

use super::{parse_datetime, parse_decimal, CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "id, seller_id, name, category_id, price, stock, size_range, \
                               description, specifications, approved, created_at, updated_at";

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let seller_id: String =
        row.try_get("seller_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category_id: String =
        row.try_get("category_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stock: i64 = row.try_get("stock").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let size_range: Option<String> =
        row.try_get("size_range").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let specifications: String =
        row.try_get("specifications").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved: i64 =
        row.try_get("approved").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Product {
        id: ProductId(id),
        seller_id: SellerId(seller_id),
        name,
        category_id: CategoryId(category_id),
        price: parse_decimal(&price_str)?,
        stock,
        size_range,
        description,
        specifications,
        approved: approved != 0,
        created_at: parse_datetime(&created_at_str)?,
        updated_at: parse_datetime(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn find_approved_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE approved = 1 AND id IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(&id.0);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn newest_approved(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE approved = 1 \
             ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn newest_approved_in_category(
        &self,
        category: &CategoryId,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE approved = 1 AND category_id = ? \
             ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(&category.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn search_approved(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let pattern = format!("%{}%", term.trim().to_lowercase());
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE approved = 1 \
             AND (LOWER(name) LIKE ? OR LOWER(description) LIKE ?) \
             ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (id, seller_id, name, category_id, price, stock, size_range,
                                  description, specifications, approved, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 seller_id = excluded.seller_id,
                 name = excluded.name,
                 category_id = excluded.category_id,
                 price = excluded.price,
                 stock = excluded.stock,
                 size_range = excluded.size_range,
                 description = excluded.description,
                 specifications = excluded.specifications,
                 approved = excluded.approved,
                 updated_at = excluded.updated_at",
        )
        .bind(&product.id.0)
        .bind(&product.seller_id.0)
        .bind(&product.name)
        .bind(&product.category_id.0)
        .bind(product.price.to_string())
        .bind(product.stock)
        .bind(&product.size_range)
        .bind(&product.description)
        .bind(&product.specifications)
        .bind(i64::from(product.approved))
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_price(&self, id: &ProductId, price: Decimal) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE product SET price = ?, updated_at = ? WHERE id = ?")
            .bind(price.to_string())
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_stock(&self, id: &ProductId, stock: i64) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE product SET stock = ?, updated_at = ? WHERE id = ?")
            .bind(stock)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_description(&self, id: &ProductId, text: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE product SET description = ?, updated_at = ? WHERE id = ?")
            .bind(text)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_specifications(
        &self,
        id: &ProductId,
        text: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE product SET specifications = ?, updated_at = ? WHERE id = ?")
            .bind(text)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
