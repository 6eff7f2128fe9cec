use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::audit::AuditEvent;
use crate::domain::application::Application;
use crate::domain::supplier::Supplier;
use crate::domain::user::User;

/// Repository trait for seller applications
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Save an application (insert or update) with its audit entries
    async fn save(&self, application: &Application, audit: &[AuditEvent]) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Application>>;

    /// Persists an approval in one transaction
    ///
    /// # Arguments
    /// * `application` - the approved application
    /// * `supplier` - the created or updated supplier
    /// * `users` - applicants promoted to supplier users
    /// * `audit` - entries written in the same transaction
    ///
    /// # Errors
    /// `Conflict` when the stored application is no longer submitted, so
    /// two concurrent approvals cannot both create a supplier.
    async fn record_approval(
        &self,
        application: &Application,
        supplier: &Supplier,
        users: &[User],
        audit: &[AuditEvent],
    ) -> RepositoryResult<()>;
}
