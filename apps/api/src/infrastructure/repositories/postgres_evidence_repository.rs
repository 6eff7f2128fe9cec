use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::postgres_audit_repository::insert_audit_events;
use super::postgres_supplier_repository::save_supplier;
use crate::domain::audit::AuditEvent;
use crate::domain::evidence::{AssessmentStatus, Evidence, EvidenceAssessment};
use crate::domain::repositories::{EvidenceRepository, RepositoryError, RepositoryResult};
use crate::domain::supplier::Supplier;

/// PostgreSQL implementation of EvidenceRepository
pub struct PostgresEvidenceRepository {
    pool: PgPool,
}

impl PostgresEvidenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EvidenceRow {
    id: Uuid,
    domain_id: Uuid,
    supplier_id: Uuid,
    user_id: Uuid,
    brief_id: Option<Uuid>,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
}

impl From<EvidenceRow> for Evidence {
    fn from(r: EvidenceRow) -> Self {
        Evidence::from_persistence(
            r.id,
            r.domain_id,
            r.supplier_id,
            r.user_id,
            r.brief_id,
            r.data,
            r.created_at,
            r.updated_at,
            r.submitted_at,
            r.approved_at,
            r.rejected_at,
        )
    }
}

#[derive(sqlx::FromRow)]
struct AssessmentRow {
    id: Uuid,
    evidence_id: Uuid,
    user_id: Uuid,
    status: AssessmentStatus,
    failed_criteria: Value,
    vfm: Option<bool>,
    created_at: DateTime<Utc>,
}

const SELECT_EVIDENCE: &str = r#"
    SELECT id, domain_id, supplier_id, user_id, brief_id, data, created_at,
           updated_at, submitted_at, approved_at, rejected_at
    FROM evidence
"#;

async fn upsert_evidence(conn: &mut PgConnection, evidence: &Evidence) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO evidence (
            id, domain_id, supplier_id, user_id, brief_id, data, created_at,
            updated_at, submitted_at, approved_at, rejected_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            data = EXCLUDED.data,
            updated_at = EXCLUDED.updated_at,
            submitted_at = EXCLUDED.submitted_at,
            approved_at = EXCLUDED.approved_at,
            rejected_at = EXCLUDED.rejected_at
        "#,
    )
    .bind(evidence.id())
    .bind(evidence.domain_id())
    .bind(evidence.supplier_id())
    .bind(evidence.user_id())
    .bind(evidence.brief_id())
    .bind(evidence.data())
    .bind(evidence.created_at())
    .bind(evidence.updated_at())
    .bind(evidence.submitted_at())
    .bind(evidence.approved_at())
    .bind(evidence.rejected_at())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl EvidenceRepository for PostgresEvidenceRepository {
    async fn save(&self, evidence: &Evidence, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert_evidence(&mut tx, evidence).await?;
        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Evidence>> {
        let row = sqlx::query_as::<_, EvidenceRow>(&format!("{} WHERE id = $1", SELECT_EVIDENCE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Evidence::from))
    }

    async fn delete(&self, id: Uuid, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM evidence WHERE id = $1")
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

    async fn for_supplier_domain(
        &self,
        supplier_id: Uuid,
        domain_id: Uuid,
    ) -> RepositoryResult<Vec<Evidence>> {
        let rows = sqlx::query_as::<_, EvidenceRow>(&format!(
            "{} WHERE supplier_id = $1 AND domain_id = $2 ORDER BY created_at DESC",
            SELECT_EVIDENCE
        ))
        .bind(supplier_id)
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Evidence::from).collect())
    }

    async fn latest_assessment(
        &self,
        evidence_id: Uuid,
    ) -> RepositoryResult<Option<EvidenceAssessment>> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT id, evidence_id, user_id, status, failed_criteria, vfm, created_at
            FROM evidence_assessments
            WHERE evidence_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(evidence_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| EvidenceAssessment {
            id: r.id,
            evidence_id: r.evidence_id,
            user_id: r.user_id,
            status: r.status,
            failed_criteria: r.failed_criteria,
            vfm: r.vfm,
            created_at: r.created_at,
        }))
    }

    async fn record_assessment(
        &self,
        evidence: &Evidence,
        assessment: &EvidenceAssessment,
        supplier: Option<&Supplier>,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        upsert_evidence(&mut tx, evidence).await?;
        sqlx::query(
            r#"
            INSERT INTO evidence_assessments (
                id, evidence_id, user_id, status, failed_criteria, vfm, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(assessment.id)
        .bind(assessment.evidence_id)
        .bind(assessment.user_id)
        .bind(assessment.status)
        .bind(&assessment.failed_criteria)
        .bind(assessment.vfm)
        .bind(assessment.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(supplier) = supplier {
            save_supplier(&mut tx, supplier).await?;
        }
        insert_audit_events(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }
}
