use chrono::{DateTime, Utc};
use sqlx::Row;

use shelfwise_core::domain::activity::{UserActivity, UserId};
use shelfwise_core::domain::product::{CategoryId, ProductId};

use super::{ActivityRepository, RepositoryError};
use crate::DbPool;

pub struct SqlActivityRepository {
    pool: DbPool,
}

impl SqlActivityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ActivityRepository for SqlActivityRepository {
    async fn record(&self, activity: UserActivity) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(&activity.payload)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO user_activity (user_id, session_id, activity_type, product_id,
                                        category_id, search_query, payload, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(activity.user_id.as_ref().map(|id| id.0.as_str()))
        .bind(&activity.session_id)
        .bind(activity.activity_type.as_str())
        .bind(activity.product_id.as_ref().map(|id| id.0.as_str()))
        .bind(activity.category_id.as_ref().map(|id| id.0.as_str()))
        .bind(&activity.search_query)
        .bind(payload)
        .bind(activity.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_product_ids(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_id FROM user_activity
             WHERE user_id = ? AND product_id IS NOT NULL
               AND activity_type IN ('view', 'add_to_cart', 'purchase')
             GROUP BY product_id
             ORDER BY MAX(occurred_at) DESC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("product_id")
                    .map(ProductId)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn category_touches_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<(CategoryId, i64)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT category_id, COUNT(*) AS touches FROM user_activity
             WHERE user_id = ? AND category_id IS NOT NULL AND occurred_at >= ?
             GROUP BY category_id
             ORDER BY touches DESC, category_id ASC",
        )
        .bind(&user_id.0)
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let category = row
                    .try_get::<String, _>("category_id")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let touches = row
                    .try_get::<i64, _>("touches")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok((CategoryId(category), touches))
            })
            .collect()
    }

    async fn purchased_category_ids(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT category_id FROM user_activity
             WHERE user_id = ? AND activity_type = 'purchase' AND category_id IS NOT NULL
             GROUP BY category_id
             ORDER BY MAX(occurred_at) DESC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("category_id")
                    .map(CategoryId)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn purchased_sizes(
        &self,
        user_id: &UserId,
        category: &CategoryId,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT json_extract(payload, '$.size') AS size FROM user_activity
             WHERE user_id = ? AND activity_type = 'purchase' AND category_id = ?
               AND json_extract(payload, '$.size') IS NOT NULL
             ORDER BY occurred_at DESC",
        )
        .bind(&user_id.0)
        .bind(&category.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("size")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn co_purchased_product_ids(
        &self,
        product_id: &ProductId,
        limit: u32,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT b.product_id AS product_id, COUNT(*) AS freq
             FROM user_activity a
             JOIN user_activity b ON a.session_id = b.session_id
             WHERE a.activity_type = 'purchase' AND b.activity_type = 'purchase'
               AND a.product_id = ? AND b.product_id IS NOT NULL
               AND b.product_id != a.product_id
             GROUP BY b.product_id
             ORDER BY freq DESC, b.product_id ASC
             LIMIT ?",
        )
        .bind(&product_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("product_id")
                    .map(ProductId)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }
}
