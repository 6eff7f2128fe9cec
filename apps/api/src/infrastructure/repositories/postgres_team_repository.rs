use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::decode_error;
use super::postgres_audit_repository::insert_audit_events;
use crate::domain::audit::AuditEvent;
use crate::domain::repositories::{RepositoryResult, TeamRepository};
use crate::domain::team::value_objects::{Permission, TeamMember, TeamStatus};
use crate::domain::team::Team;

/// PostgreSQL implementation of TeamRepository
///
/// Members live in `team_members`, with their permissions as a text array.
pub struct PostgresTeamRepository {
    pool: PgPool,
}

impl PostgresTeamRepository {
    /// Creates a new PostgresTeamRepository
    ///
    /// # Arguments
    /// * `pool` - SQLx connection pool for PostgreSQL
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_members(&self, team_id: Uuid) -> RepositoryResult<Vec<TeamMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT user_id, is_team_lead, permissions
            FROM team_members
            WHERE team_id = $1
            ORDER BY is_team_lead DESC, user_id
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TeamMember::try_from).collect()
    }

    async fn hydrate(&self, row: TeamRow) -> RepositoryResult<Team> {
        let members = self.load_members(row.id).await?;
        Ok(Team::from_persistence(
            row.id,
            row.name,
            row.email_address,
            row.status,
            members,
            row.created_at,
            row.updated_at,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    email_address: Option<String>,
    status: TeamStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    user_id: Uuid,
    is_team_lead: bool,
    permissions: Vec<String>,
}

impl TryFrom<MemberRow> for TeamMember {
    type Error = crate::domain::repositories::RepositoryError;

    fn try_from(r: MemberRow) -> Result<Self, Self::Error> {
        let permissions = r
            .permissions
            .iter()
            .map(|p| p.parse::<Permission>().map_err(decode_error))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(TeamMember {
            user_id: r.user_id,
            is_team_lead: r.is_team_lead,
            permissions,
        })
    }
}

#[async_trait]
impl TeamRepository for PostgresTeamRepository {
    async fn save(&self, team: &Team, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO teams (id, name, email_address, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email_address = EXCLUDED.email_address,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(team.id())
        .bind(team.name())
        .bind(team.email_address())
        .bind(team.status())
        .bind(team.created_at())
        .bind(team.updated_at())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM team_members WHERE team_id = $1")
            .bind(team.id())
            .execute(&mut *tx)
            .await?;

        for member in team.members() {
            let permissions: Vec<String> = member
                .permissions
                .iter()
                .map(|p| p.as_str().to_string())
                .collect();

            sqlx::query(
                r#"
                INSERT INTO team_members (team_id, user_id, is_team_lead, permissions)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(team.id())
            .bind(member.user_id)
            .bind(member.is_team_lead)
            .bind(permissions)
            .execute(&mut *tx)
            .await?;
        }

        insert_audit_events(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT id, name, email_address, status, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn teams_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT t.id, t.name, t.email_address, t.status, t.created_at, t.updated_at
            FROM teams t
            JOIN team_members m ON m.team_id = t.id
            WHERE m.user_id = $1 AND t.status <> 'deleted'
            ORDER BY t.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut teams = Vec::with_capacity(rows.len());
        for row in rows {
            teams.push(self.hydrate(row).await?);
        }
        Ok(teams)
    }
}
