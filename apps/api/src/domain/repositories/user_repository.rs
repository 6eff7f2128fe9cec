use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::audit::AuditEvent;
use crate::domain::user::{Email, User};

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user; a taken email address is a conflict
    async fn create(&self, user: &User, audit: &[AuditEvent]) -> RepositoryResult<()>;

    /// Updates role, name, links and activation
    async fn save(&self, user: &User) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>>;

    /// Users in `ids`; unknown ids are skipped
    async fn find_many(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>>;

    /// Applicants working on an application
    async fn find_by_application(&self, application_id: Uuid) -> RepositoryResult<Vec<User>>;
}
