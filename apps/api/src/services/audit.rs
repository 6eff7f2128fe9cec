use chrono::Utc;
use uuid::Uuid;

use super::{require_admin, Repositories, ServiceError, ServiceResult};
use crate::domain::audit::{AuditEvent, AuditFilter};
use crate::domain::user::User;

/// Reading and acknowledging the audit log
pub struct AuditService<'a> {
    repos: &'a Repositories,
}

impl<'a> AuditService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    pub async fn list(&self, user: &User, filter: &AuditFilter) -> ServiceResult<Vec<AuditEvent>> {
        require_admin(user)?;
        Ok(self.repos.audit.list(filter).await?)
    }

    /// Acknowledges an event; the only change an audit event ever takes
    pub async fn acknowledge(&self, user: &User, id: Uuid) -> ServiceResult<AuditEvent> {
        require_admin(user)?;
        let mut event = self
            .repos
            .audit
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Audit event {} not found", id)))?;

        event.acknowledge(user.email.as_str(), Utc::now())?;
        self.repos.audit.save_acknowledgement(&event).await?;
        tracing::info!(audit_event_id = %id, "Audit event acknowledged");
        Ok(event)
    }
}
