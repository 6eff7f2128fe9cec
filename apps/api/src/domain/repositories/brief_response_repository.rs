use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::audit::AuditEvent;
use crate::domain::brief_response::BriefResponse;

#[async_trait]
pub trait BriefResponseRepository: Send + Sync {
    /// Save a response (insert or update)
    async fn save(&self, response: &BriefResponse, audit: &[AuditEvent]) -> RepositoryResult<()>;
    /// Inserts a new response unless the supplier already has `limit`
    /// responses to the brief that are not withdrawn
    ///
    /// Counting and inserting happen under one lock on the brief, so
    /// concurrent requests cannot push a supplier past the limit.
    async fn create_within_limit(
        &self,
        response: &BriefResponse,
        limit: usize,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<BriefResponse>>;

    /// All responses to a brief, withdrawn included
    async fn for_brief(&self, brief_id: Uuid) -> RepositoryResult<Vec<BriefResponse>>;

    /// One supplier's responses to a brief, withdrawn included
    async fn for_brief_and_supplier(
        &self,
        brief_id: Uuid,
        supplier_id: Uuid,
    ) -> RepositoryResult<Vec<BriefResponse>>;
}
