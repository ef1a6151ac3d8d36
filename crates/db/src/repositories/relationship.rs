use sqlx::Row;

use shelfwise_core::domain::product::ProductId;
use shelfwise_core::domain::relationship::{ProductRelationship, RelationshipKind};

use super::{RelationshipRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRelationshipRepository {
    pool: DbPool,
}

impl SqlRelationshipRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_relationship(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProductRelationship, RepositoryError> {
    let source: String =
        row.try_get("source_product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let related: String =
        row.try_get("related_product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let strength: f64 =
        row.try_get("strength").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let kind = RelationshipKind::parse(&kind_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown relationship kind `{kind_str}`")))?;

    Ok(ProductRelationship {
        source_product_id: ProductId(source),
        related_product_id: ProductId(related),
        kind,
        strength,
    })
}

#[async_trait::async_trait]
impl RelationshipRepository for SqlRelationshipRepository {
    async fn save(&self, edge: ProductRelationship) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_relationship (source_product_id, related_product_id, kind, strength)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(source_product_id, related_product_id, kind) DO UPDATE SET
                 strength = excluded.strength",
        )
        .bind(&edge.source_product_id.0)
        .bind(&edge.related_product_id.0)
        .bind(edge.kind.as_str())
        .bind(edge.strength)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complementary_from(
        &self,
        source: &ProductId,
    ) -> Result<Vec<ProductRelationship>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT source_product_id, related_product_id, kind, strength
             FROM product_relationship
             WHERE source_product_id = ? AND kind = 'complementary'
             ORDER BY strength DESC, related_product_id ASC",
        )
        .bind(&source.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_relationship).collect()
    }

    async fn complementary_from_any(
        &self,
        sources: &[ProductId],
    ) -> Result<Vec<ProductRelationship>, RepositoryError> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; sources.len()].join(", ");
        let sql = format!(
            "SELECT source_product_id, related_product_id, kind, strength
             FROM product_relationship
             WHERE kind = 'complementary' AND source_product_id IN ({placeholders})
             ORDER BY strength DESC, related_product_id ASC"
        );

        let mut query = sqlx::query(&sql);
        for source in sources {
            query = query.bind(&source.0);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_relationship).collect()
    }
}

#[cfg(test)]
mod tests {
    use shelfwise_core::domain::product::ProductId;
    use shelfwise_core::domain::relationship::{ProductRelationship, RelationshipKind};

    use super::SqlRelationshipRepository;
    use crate::repositories::RelationshipRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlRelationshipRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlRelationshipRepository::new(pool)
    }

    fn edge(source: &str, related: &str, strength: f64) -> ProductRelationship {
        ProductRelationship {
            source_product_id: ProductId(source.to_string()),
            related_product_id: ProductId(related.to_string()),
            kind: RelationshipKind::Complementary,
            strength,
        }
    }

    #[tokio::test]
    async fn edges_order_by_strength_descending() {
        let repo = setup().await;

        repo.save(edge("P-1", "P-2", 0.4)).await.expect("save");
        repo.save(edge("P-1", "P-3", 0.9)).await.expect("save");
        repo.save(edge("P-9", "P-4", 1.0)).await.expect("save");

        let edges =
            repo.complementary_from(&ProductId("P-1".to_string())).await.expect("edges");
        let related: Vec<&str> = edges.iter().map(|e| e.related_product_id.0.as_str()).collect();
        assert_eq!(related, vec!["P-3", "P-2"]);
    }

    #[tokio::test]
    async fn multi_source_lookup_merges_and_orders() {
        let repo = setup().await;

        repo.save(edge("P-1", "P-2", 0.4)).await.expect("save");
        repo.save(edge("P-7", "P-3", 0.9)).await.expect("save");
        repo.save(edge("P-8", "P-4", 0.5)).await.expect("save");

        let edges = repo
            .complementary_from_any(&[
                ProductId("P-1".to_string()),
                ProductId("P-7".to_string()),
            ])
            .await
            .expect("edges");
        let related: Vec<&str> = edges.iter().map(|e| e.related_product_id.0.as_str()).collect();
        assert_eq!(related, vec!["P-3", "P-2"]);
    }

    #[tokio::test]
    async fn empty_source_list_short_circuits() {
        let repo = setup().await;
        assert!(repo.complementary_from_any(&[]).await.expect("edges").is_empty());
    }

    #[tokio::test]
    async fn save_upserts_strength() {
        let repo = setup().await;

        repo.save(edge("P-1", "P-2", 0.2)).await.expect("save");
        repo.save(edge("P-1", "P-2", 0.8)).await.expect("upsert");

        let edges =
            repo.complementary_from(&ProductId("P-1".to_string())).await.expect("edges");
        assert_eq!(edges.len(), 1);
        assert!((edges[0].strength - 0.8).abs() < f64::EPSILON);
    }
}
