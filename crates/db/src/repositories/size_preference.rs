use sqlx::Row;

use shelfwise_core::domain::activity::UserId;
use shelfwise_core::domain::product::CategoryId;
use shelfwise_core::sizing::SizePreference;

use super::{RepositoryError, SizePreferenceRepository};
use crate::DbPool;

pub struct SqlSizePreferenceRepository {
    pool: DbPool,
}

impl SqlSizePreferenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SizePreferenceRepository for SqlSizePreferenceRepository {
    async fn save(&self, preference: SizePreference) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO size_preference (user_id, category_id, size)
             VALUES (?, ?, ?)
             ON CONFLICT(user_id, category_id) DO UPDATE SET size = excluded.size",
        )
        .bind(&preference.user_id.0)
        .bind(&preference.category_id.0)
        .bind(&preference.size)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        user_id: &UserId,
        category: &CategoryId,
    ) -> Result<Option<SizePreference>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, category_id, size FROM size_preference
             WHERE user_id = ? AND category_id = ?",
        )
        .bind(&user_id.0)
        .bind(&category.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let size: String =
            row.try_get("size").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok(Some(SizePreference {
            user_id: user_id.clone(),
            category_id: category.clone(),
            size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use shelfwise_core::domain::activity::UserId;
    use shelfwise_core::domain::product::CategoryId;
    use shelfwise_core::sizing::SizePreference;

    use super::SqlSizePreferenceRepository;
    use crate::repositories::SizePreferenceRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlSizePreferenceRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlSizePreferenceRepository::new(pool)
    }

    #[tokio::test]
    async fn save_find_and_upsert() {
        let repo = setup().await;
        let user = UserId("U-1".to_string());
        let category = CategoryId("footwear".to_string());

        assert!(repo.find(&user, &category).await.expect("find").is_none());

        repo.save(SizePreference {
            user_id: user.clone(),
            category_id: category.clone(),
            size: "42".to_string(),
        })
        .await
        .expect("save");

        let found = repo.find(&user, &category).await.expect("find").expect("exists");
        assert_eq!(found.size, "42");

        repo.save(SizePreference {
            user_id: user.clone(),
            category_id: category.clone(),
            size: "43".to_string(),
        })
        .await
        .expect("upsert");

        let updated = repo.find(&user, &category).await.expect("find").expect("exists");
        assert_eq!(updated.size, "43");
    }
}
