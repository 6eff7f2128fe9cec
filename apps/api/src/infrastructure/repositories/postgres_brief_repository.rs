use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::postgres_audit_repository::insert_audit_events;
use crate::domain::audit::AuditEvent;
use crate::domain::brief::{Brief, BriefHistory};
use crate::domain::framework::Lot;
use crate::domain::repositories::{BriefRepository, RepositoryError, RepositoryResult};

/// PostgreSQL implementation of BriefRepository
pub struct PostgresBriefRepository {
    pool: PgPool,
}

impl PostgresBriefRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BriefRow {
    id: Uuid,
    framework_id: Uuid,
    lot: Lot,
    data: Value,
    author_id: Uuid,
    team_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    questions_closed_at: Option<DateTime<Utc>>,
    withdrawn_at: Option<DateTime<Utc>>,
}

impl From<BriefRow> for Brief {
    fn from(r: BriefRow) -> Self {
        Brief::from_persistence(
            r.id,
            r.framework_id,
            r.lot,
            r.data,
            r.author_id,
            r.team_id,
            r.created_at,
            r.updated_at,
            r.published_at,
            r.closed_at,
            r.questions_closed_at,
            r.withdrawn_at,
        )
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    brief_id: Uuid,
    user_id: Uuid,
    edited_at: DateTime<Utc>,
    data: Value,
}

async fn upsert_brief(conn: &mut PgConnection, brief: &Brief) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO briefs (
            id, framework_id, lot, data, author_id, team_id, created_at,
            updated_at, published_at, closed_at, questions_closed_at, withdrawn_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE SET
            data = EXCLUDED.data,
            team_id = EXCLUDED.team_id,
            updated_at = EXCLUDED.updated_at,
            published_at = EXCLUDED.published_at,
            closed_at = EXCLUDED.closed_at,
            questions_closed_at = EXCLUDED.questions_closed_at,
            withdrawn_at = EXCLUDED.withdrawn_at
        "#,
    )
    .bind(brief.id())
    .bind(brief.framework_id())
    .bind(brief.lot())
    .bind(brief.data())
    .bind(brief.author_id())
    .bind(brief.team_id())
    .bind(brief.created_at())
    .bind(brief.updated_at())
    .bind(brief.published_at())
    .bind(brief.closed_at())
    .bind(brief.questions_closed_at())
    .bind(brief.withdrawn_at())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl BriefRepository for PostgresBriefRepository {
    async fn save(&self, brief: &Brief, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert_brief(&mut tx, brief).await?;
        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Brief>> {
        let row = sqlx::query_as::<_, BriefRow>(
            r#"
            SELECT id, framework_id, lot, data, author_id, team_id, created_at,
                   updated_at, published_at, closed_at, questions_closed_at, withdrawn_at
            FROM briefs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Brief::from))
    }

    async fn delete(&self, id: Uuid, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM briefs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_edit(
        &self,
        brief: &Brief,
        history: &BriefHistory,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO brief_history (id, brief_id, user_id, edited_at, data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(history.id)
        .bind(history.brief_id)
        .bind(history.user_id)
        .bind(history.edited_at)
        .bind(&history.data)
        .execute(&mut *tx)
        .await?;

        upsert_brief(&mut tx, brief).await?;
        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, brief_id: Uuid) -> RepositoryResult<Vec<BriefHistory>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, brief_id, user_id, edited_at, data
            FROM brief_history
            WHERE brief_id = $1
            ORDER BY edited_at DESC
            "#,
        )
        .bind(brief_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BriefHistory {
                id: r.id,
                brief_id: r.brief_id,
                user_id: r.user_id,
                edited_at: r.edited_at,
                data: r.data,
            })
            .collect())
    }
}
