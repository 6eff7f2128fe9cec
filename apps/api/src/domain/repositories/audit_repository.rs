use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::audit::{AuditEvent, AuditFilter};

/// Append-only audit log
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<AuditEvent>>;

    /// Events matching the filter, newest first
    async fn list(&self, filter: &AuditFilter) -> RepositoryResult<Vec<AuditEvent>>;

    /// Writes the acknowledgement fields of an event; nothing else changes
    async fn save_acknowledgement(&self, event: &AuditEvent) -> RepositoryResult<()>;
}
