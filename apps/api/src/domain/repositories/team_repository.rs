use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::audit::AuditEvent;
use crate::domain::team::Team;

/// Repository trait for Team aggregate
///
/// Members and their permissions are stored with the team.
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Save a team with its members (insert or update)
    async fn save(&self, team: &Team, audit: &[AuditEvent]) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Team>>;

    /// Teams the user is a member or lead of, excluding deleted teams
    async fn teams_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Team>>;
}
