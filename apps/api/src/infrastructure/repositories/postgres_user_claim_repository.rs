use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::decode_error;
use super::postgres_audit_repository::insert_audit_events;
use crate::domain::audit::AuditEvent;
use crate::domain::repositories::{ClaimAttempt, RepositoryResult, UserClaimRepository};
use crate::domain::user::Email;
use crate::domain::user_claim::{ClaimType, UserClaim};

/// PostgreSQL implementation of UserClaimRepository
pub struct PostgresUserClaimRepository {
    pool: PgPool,
}

impl PostgresUserClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ClaimRow {
    id: Uuid,
    email_address: String,
    token: String,
    claim_type: ClaimType,
    data: Value,
    claimed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl UserClaimRepository for PostgresUserClaimRepository {
    async fn create(&self, claim: &UserClaim, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO user_claims (
                id, email_address, token, claim_type, data, claimed, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(claim.id())
        .bind(claim.email_address().as_str())
        .bind(claim.token())
        .bind(claim.claim_type())
        .bind(claim.data())
        .bind(claim.claimed())
        .bind(claim.created_at())
        .bind(claim.updated_at())
        .execute(&mut *tx)
        .await?;

        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn claim(
        &self,
        claim_type: ClaimType,
        token: &str,
        email_address: &Email,
        max_age: Option<Duration>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<ClaimAttempt> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ClaimRow>(
            r#"
            SELECT id, email_address, token, claim_type, data, claimed, created_at, updated_at
            FROM user_claims
            WHERE claim_type = $1 AND token = $2 AND email_address = $3
            FOR UPDATE
            "#,
        )
        .bind(claim_type)
        .bind(token)
        .bind(email_address.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(ClaimAttempt::NotFound);
        };

        let mut claim = UserClaim::from_persistence(
            row.id,
            Email::new(row.email_address).map_err(decode_error)?,
            row.token,
            row.claim_type,
            row.data,
            row.claimed,
            row.created_at,
            row.updated_at,
        );

        let event = match claim.claim(max_age, now) {
            Ok(event) => event,
            Err(e) => return Ok(ClaimAttempt::Rejected(e)),
        };

        sqlx::query("UPDATE user_claims SET claimed = TRUE, updated_at = $2 WHERE id = $1")
            .bind(claim.id())
            .bind(claim.updated_at())
            .execute(&mut *tx)
            .await?;
        insert_audit_events(&mut tx, &[event.into_audit(None)]).await?;

        tx.commit().await?;
        Ok(ClaimAttempt::Claimed(claim))
    }
}
