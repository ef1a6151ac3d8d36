use chrono::{DateTime, Utc};
use sqlx::Row;

use shelfwise_core::domain::artifact::{
    ArtifactId, ArtifactPayload, ArtifactStatus, ArtifactType, OptimizationArtifact,
};
use shelfwise_core::domain::product::{ProductId, SellerId};

use super::{parse_datetime, ArtifactRepository, RepositoryError};
use crate::DbPool;

pub struct SqlArtifactRepository {
    pool: DbPool,
}

impl SqlArtifactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const ARTIFACT_COLUMNS: &str =
    "id, product_id, seller_id, artifact_type, status, payload, created_at, updated_at, applied_at";

fn row_to_artifact(row: &sqlx::sqlite::SqliteRow) -> Result<OptimizationArtifact, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_id: String =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let seller_id: String =
        row.try_get("seller_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let type_str: String =
        row.try_get("artifact_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payload_raw: String =
        row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let applied_at_str: Option<String> =
        row.try_get("applied_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let artifact_type = ArtifactType::parse(&type_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown artifact type `{type_str}`")))?;
    let status = ArtifactStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown artifact status `{status_str}`")))?;
    let payload = ArtifactPayload::from_inner_json(artifact_type, &payload_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid artifact payload: {error}")))?;

    let applied_at = match applied_at_str {
        Some(raw) => Some(parse_datetime(&raw)?),
        None => None,
    };

    Ok(OptimizationArtifact {
        id: ArtifactId(id),
        product_id: ProductId(product_id),
        seller_id: SellerId(seller_id),
        status,
        payload,
        created_at: parse_datetime(&created_at_str)?,
        updated_at: parse_datetime(&updated_at_str)?,
        applied_at,
    })
}

#[async_trait::async_trait]
impl ArtifactRepository for SqlArtifactRepository {
    async fn insert(&self, artifact: OptimizationArtifact) -> Result<(), RepositoryError> {
        let payload = artifact
            .payload
            .to_inner_json()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO optimization_artifact (id, product_id, seller_id, artifact_type, status,
                                                payload, created_at, updated_at, applied_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&artifact.id.0)
        .bind(&artifact.product_id.0)
        .bind(&artifact.seller_id.0)
        .bind(artifact.artifact_type().as_str())
        .bind(artifact.status.as_str())
        .bind(payload)
        .bind(artifact.created_at.to_rfc3339())
        .bind(artifact.updated_at.to_rfc3339())
        .bind(artifact.applied_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ArtifactId,
    ) -> Result<Option<OptimizationArtifact>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM optimization_artifact WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_artifact(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_product(
        &self,
        product_id: &ProductId,
        artifact_type: Option<ArtifactType>,
    ) -> Result<Vec<OptimizationArtifact>, RepositoryError> {
        let rows = if let Some(artifact_type) = artifact_type {
            sqlx::query(&format!(
                "SELECT {ARTIFACT_COLUMNS} FROM optimization_artifact
                 WHERE product_id = ? AND artifact_type = ?
                 ORDER BY created_at DESC"
            ))
            .bind(&product_id.0)
            .bind(artifact_type.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {ARTIFACT_COLUMNS} FROM optimization_artifact
                 WHERE product_id = ?
                 ORDER BY created_at DESC"
            ))
            .bind(&product_id.0)
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_artifact).collect()
    }

    async fn latest_for_product(
        &self,
        product_id: &ProductId,
        artifact_type: ArtifactType,
    ) -> Result<Option<OptimizationArtifact>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM optimization_artifact
             WHERE product_id = ? AND artifact_type = ?
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(&product_id.0)
        .bind(artifact_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_artifact(r)?)),
            None => Ok(None),
        }
    }

    async fn transition(
        &self,
        id: &ArtifactId,
        to: ArtifactStatus,
        applied_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // Conditional update: only a pending artifact can move, so a
        // concurrent second apply/reject loses the race and reports it.
        let result = sqlx::query(
            "UPDATE optimization_artifact
             SET status = ?, applied_at = ?, updated_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(to.as_str())
        .bind(applied_at.map(|at| at.to_rfc3339()))
        .bind(updated_at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
