use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::decode_error;
use crate::domain::audit::{AuditEvent, AuditFilter, AuditObject, AuditType};
use crate::domain::repositories::{AuditRepository, RepositoryError, RepositoryResult};

/// PostgreSQL implementation of AuditRepository
///
/// Rows are only ever inserted, apart from the acknowledgement columns.
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    audit_type: String,
    user: Option<String>,
    data: Value,
    object_type: Option<String>,
    object_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    acknowledged: bool,
    acknowledged_by: Option<String>,
    acknowledged_at: Option<DateTime<Utc>>,
}

impl TryFrom<AuditRow> for AuditEvent {
    type Error = RepositoryError;

    fn try_from(r: AuditRow) -> Result<Self, Self::Error> {
        let audit_type = r.audit_type.parse::<AuditType>().map_err(decode_error)?;
        let object = match (r.object_type, r.object_id) {
            (Some(object_type), Some(object_id)) => Some(AuditObject {
                object_type,
                object_id,
            }),
            _ => None,
        };

        Ok(AuditEvent::from_persistence(
            r.id,
            audit_type,
            r.user,
            r.data,
            object,
            r.created_at,
            r.acknowledged,
            r.acknowledged_by,
            r.acknowledged_at,
        ))
    }
}

const SELECT_AUDIT: &str = r#"
    SELECT id, audit_type, "user", data, object_type, object_id, created_at,
           acknowledged, acknowledged_by, acknowledged_at
    FROM audit_events
"#;

/// Inserts audit entries on the connection carrying the state change they describe
pub(crate) async fn insert_audit_events(
    conn: &mut PgConnection,
    events: &[AuditEvent],
) -> RepositoryResult<()> {
    for event in events {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                id, audit_type, "user", data, object_type, object_id, created_at,
                acknowledged, acknowledged_by, acknowledged_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.id())
        .bind(event.audit_type().as_str())
        .bind(event.user())
        .bind(event.data())
        .bind(event.object().map(|o| o.object_type.as_str()))
        .bind(event.object().map(|o| o.object_id))
        .bind(event.created_at())
        .bind(event.acknowledged())
        .bind(event.acknowledged_by())
        .bind(event.acknowledged_at())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append(&self, event: &AuditEvent) -> RepositoryResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_audit_events(&mut conn, std::slice::from_ref(event)).await
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<AuditEvent>> {
        let row = sqlx::query_as::<_, AuditRow>(&format!("{} WHERE id = $1", SELECT_AUDIT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AuditEvent::try_from).transpose()
    }

    async fn list(&self, filter: &AuditFilter) -> RepositoryResult<Vec<AuditEvent>> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            r#"{}
            WHERE ($1::text IS NULL OR object_type = $1)
              AND ($2::uuid IS NULL OR object_id = $2)
              AND ($3::text IS NULL OR audit_type = $3)
              AND ($4::boolean IS NULL OR acknowledged = $4)
            ORDER BY created_at DESC
            "#,
            SELECT_AUDIT
        ))
        .bind(filter.object_type.as_deref())
        .bind(filter.object_id)
        .bind(filter.audit_type.map(|t| t.as_str()))
        .bind(filter.acknowledged)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEvent::try_from).collect()
    }

    async fn save_acknowledgement(&self, event: &AuditEvent) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE audit_events
            SET acknowledged = $2, acknowledged_by = $3, acknowledged_at = $4
            WHERE id = $1
            "#,
        )
        .bind(event.id())
        .bind(event.acknowledged())
        .bind(event.acknowledged_by())
        .bind(event.acknowledged_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
