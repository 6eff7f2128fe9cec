use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::decode_error;
use super::postgres_audit_repository::insert_audit_events;
use crate::domain::audit::AuditEvent;
use crate::domain::repositories::{RepositoryResult, UserRepository};
use crate::domain::user::{Email, User, UserRole};

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new PostgresUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: UserRole,
    supplier_id: Option<Uuid>,
    application_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = crate::domain::repositories::RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id,
            email: Email::new(r.email).map_err(decode_error)?,
            password_hash: r.password_hash,
            name: r.name,
            role: r.role,
            supplier_id: r.supplier_id,
            application_id: r.application_id,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

const SELECT_USER: &str = r#"
    SELECT id, email, password_hash, name, role, supplier_id,
           application_id, is_active, created_at
    FROM users
"#;

/// Updates the mutable columns of a user; shared with the approval transaction
pub(crate) async fn update_user(conn: &mut PgConnection, user: &User) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = $2, role = $3, supplier_id = $4, application_id = $5,
            is_active = $6, password_hash = $7
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(user.role)
    .bind(user.supplier_id)
    .bind(user.application_id)
    .bind(user.is_active)
    .bind(&user.password_hash)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, name, role, supplier_id,
                application_id, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.supplier_id)
        .bind(user.application_id)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save(&self, user: &User) -> RepositoryResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_user(&mut conn, user).await
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE id = $1", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE email = $1", SELECT_USER))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{} WHERE id = ANY($1)", SELECT_USER))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_by_application(&self, application_id: Uuid) -> RepositoryResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE application_id = $1 ORDER BY created_at",
            SELECT_USER
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
