use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::postgres_audit_repository::insert_audit_events;
use crate::domain::audit::AuditEvent;
use crate::domain::brief_response::BriefResponse;
use crate::domain::repositories::{BriefResponseRepository, RepositoryError, RepositoryResult};

/// PostgreSQL implementation of BriefResponseRepository
pub struct PostgresBriefResponseRepository {
    pool: PgPool,
}

impl PostgresBriefResponseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    id: Uuid,
    brief_id: Uuid,
    supplier_id: Uuid,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    withdrawn_at: Option<DateTime<Utc>>,
}

impl From<ResponseRow> for BriefResponse {
    fn from(r: ResponseRow) -> Self {
        BriefResponse::from_persistence(
            r.id,
            r.brief_id,
            r.supplier_id,
            r.data,
            r.created_at,
            r.updated_at,
            r.submitted_at,
            r.withdrawn_at,
        )
    }
}

const SELECT_RESPONSE: &str = r#"
    SELECT id, brief_id, supplier_id, data, created_at, updated_at,
           submitted_at, withdrawn_at
    FROM brief_responses
"#;

async fn upsert_response(conn: &mut PgConnection, response: &BriefResponse) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO brief_responses (
            id, brief_id, supplier_id, data, created_at, updated_at,
            submitted_at, withdrawn_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            data = EXCLUDED.data,
            updated_at = EXCLUDED.updated_at,
            submitted_at = EXCLUDED.submitted_at,
            withdrawn_at = EXCLUDED.withdrawn_at
        "#,
    )
    .bind(response.id())
    .bind(response.brief_id())
    .bind(response.supplier_id())
    .bind(response.data())
    .bind(response.created_at())
    .bind(response.updated_at())
    .bind(response.submitted_at())
    .bind(response.withdrawn_at())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl BriefResponseRepository for PostgresBriefResponseRepository {
    async fn save(&self, response: &BriefResponse, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert_response(&mut tx, response).await?;
        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn create_within_limit(
        &self,
        response: &BriefResponse,
        limit: usize,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        // Serialises response creation per brief
        sqlx::query("SELECT id FROM briefs WHERE id = $1 FOR UPDATE")
            .bind(response.brief_id())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM brief_responses
            WHERE brief_id = $1 AND supplier_id = $2 AND withdrawn_at IS NULL
            "#,
        )
        .bind(response.brief_id())
        .bind(response.supplier_id())
        .fetch_one(&mut *tx)
        .await?;

        if usize::try_from(active).map_or(true, |n| n >= limit) {
            return Err(RepositoryError::Conflict(
                "You have already responded to this opportunity".to_string(),
            ));
        }

        upsert_response(&mut tx, response).await?;
        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<BriefResponse>> {
        let row = sqlx::query_as::<_, ResponseRow>(&format!("{} WHERE id = $1", SELECT_RESPONSE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(BriefResponse::from))
    }

    async fn for_brief(&self, brief_id: Uuid) -> RepositoryResult<Vec<BriefResponse>> {
        let rows = sqlx::query_as::<_, ResponseRow>(&format!(
            "{} WHERE brief_id = $1 ORDER BY created_at",
            SELECT_RESPONSE
        ))
        .bind(brief_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BriefResponse::from).collect())
    }

    async fn for_brief_and_supplier(
        &self,
        brief_id: Uuid,
        supplier_id: Uuid,
    ) -> RepositoryResult<Vec<BriefResponse>> {
        let rows = sqlx::query_as::<_, ResponseRow>(&format!(
            "{} WHERE brief_id = $1 AND supplier_id = $2 ORDER BY created_at",
            SELECT_RESPONSE
        ))
        .bind(brief_id)
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BriefResponse::from).collect())
    }
}
