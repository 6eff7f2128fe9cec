use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::audit::AuditEvent;
use crate::domain::brief::{Brief, BriefHistory};

/// Repository trait for Brief aggregate
#[async_trait]
pub trait BriefRepository: Send + Sync {
    /// Save a brief (insert or update)
    async fn save(&self, brief: &Brief, audit: &[AuditEvent]) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Brief>>;

    async fn delete(&self, id: Uuid, audit: &[AuditEvent]) -> RepositoryResult<()>;

    /// Saves an edited live brief together with the snapshot taken before the edit
    async fn save_edit(
        &self,
        brief: &Brief,
        history: &BriefHistory,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()>;

    /// Edit snapshots, newest first
    async fn history(&self, brief_id: Uuid) -> RepositoryResult<Vec<BriefHistory>>;
}
