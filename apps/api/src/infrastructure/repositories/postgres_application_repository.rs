use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::postgres_audit_repository::insert_audit_events;
use super::postgres_supplier_repository::save_supplier;
use super::postgres_user_repository::update_user;
use crate::domain::application::{Application, ApplicationKind, ApplicationStatus};
use crate::domain::audit::AuditEvent;
use crate::domain::repositories::{ApplicationRepository, RepositoryError, RepositoryResult};
use crate::domain::supplier::Supplier;
use crate::domain::user::User;

/// PostgreSQL implementation of ApplicationRepository
pub struct PostgresApplicationRepository {
    pool: PgPool,
}

impl PostgresApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    data: Value,
    status: ApplicationStatus,
    kind: ApplicationKind,
    supplier_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

async fn upsert_application(conn: &mut PgConnection, application: &Application) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO applications (
            id, data, status, kind, supplier_id, created_at, updated_at, submitted_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            data = EXCLUDED.data,
            status = EXCLUDED.status,
            supplier_id = EXCLUDED.supplier_id,
            updated_at = EXCLUDED.updated_at,
            submitted_at = EXCLUDED.submitted_at
        "#,
    )
    .bind(application.id())
    .bind(application.data())
    .bind(application.status())
    .bind(application.kind())
    .bind(application.supplier_id())
    .bind(application.created_at())
    .bind(application.updated_at())
    .bind(application.submitted_at())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl ApplicationRepository for PostgresApplicationRepository {
    async fn save(&self, application: &Application, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert_application(&mut tx, application).await?;
        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, data, status, kind, supplier_id, created_at, updated_at, submitted_at
            FROM applications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            Application::from_persistence(
                r.id,
                r.data,
                r.status,
                r.kind,
                r.supplier_id,
                r.created_at,
                r.updated_at,
                r.submitted_at,
            )
        }))
    }

    async fn record_approval(
        &self,
        application: &Application,
        supplier: &Supplier,
        users: &[User],
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        // Concurrent approvals queue on this row lock
        let current: Option<ApplicationStatus> =
            sqlx::query_scalar("SELECT status FROM applications WHERE id = $1 FOR UPDATE")
                .bind(application.id())
                .fetch_optional(&mut *tx)
                .await?;
        match current {
            None => return Err(RepositoryError::NotFound),
            Some(ApplicationStatus::Submitted) => {}
            Some(_) => {
                return Err(RepositoryError::Conflict(
                    "Application is no longer awaiting assessment".to_string(),
                ))
            }
        }

        save_supplier(&mut tx, supplier).await?;
        upsert_application(&mut tx, application).await?;
        for user in users {
            update_user(&mut tx, user).await?;
        }
        insert_audit_events(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }
}
