// Service layer module
// Use-case orchestration: load aggregates, apply domain transitions,
// persist the result together with its audit events

pub mod applications;
pub mod audit;
pub mod briefs;
pub mod claims;
pub mod evidence;
pub mod responses;
pub mod teams;
pub mod users;

pub use applications::ApplicationService;
pub use audit::AuditService;
pub use briefs::BriefService;
pub use claims::ClaimService;
pub use evidence::EvidenceService;
pub use responses::ResponseService;
pub use teams::TeamService;
pub use users::UserService;

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use crate::domain::audit::AuditEvent;
use crate::domain::brief::DeadlineRules;
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::repositories::{
    ApplicationRepository, AuditRepository, BriefRepository, BriefResponseRepository,
    CatalogueRepository, EvidenceRepository, RepositoryError, SupplierRepository, TeamRepository,
    UserClaimRepository, UserRepository,
};
use crate::domain::user::User;

/// Every repository the services need, behind trait objects
///
/// The same services run against Postgres or the in-memory adapters.
#[derive(Clone)]
pub struct Repositories {
    pub applications: Arc<dyn ApplicationRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub briefs: Arc<dyn BriefRepository>,
    pub responses: Arc<dyn BriefResponseRepository>,
    pub catalogue: Arc<dyn CatalogueRepository>,
    pub evidence: Arc<dyn EvidenceRepository>,
    pub suppliers: Arc<dyn SupplierRepository>,
    pub teams: Arc<dyn TeamRepository>,
    pub claims: Arc<dyn UserClaimRepository>,
    pub users: Arc<dyn UserRepository>,
}

/// Business settings shared by the services
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub deadlines: DeadlineRules,
    /// Claims older than this are refused; `None` never expires them
    pub claim_max_age: Option<Duration>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            deadlines: DeadlineRules::default(),
            claim_max_age: Some(Duration::days(7)),
        }
    }
}

/// Error raised by the services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorised(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn unauthorised(message: impl Into<String>) -> Self {
        ServiceError::Unauthorised(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Audit entries for `events`, attributed to `actor`
///
/// Repositories write them in the same transaction as the change they
/// describe, so a state change is never saved without its audit trail.
pub(crate) fn audit_entries(
    actor: Option<&User>,
    events: impl IntoIterator<Item = DomainEvent>,
) -> Vec<AuditEvent> {
    let user = actor.map(|u| u.email.as_str());
    events.into_iter().map(|event| event.into_audit(user)).collect()
}

pub(crate) fn require_admin(user: &User) -> ServiceResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::unauthorised("Only administrators can do this"))
    }
}
