use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::RepositoryResult;
use crate::domain::audit::AuditEvent;
use crate::domain::errors::DomainError;
use crate::domain::user::Email;
use crate::domain::user_claim::{ClaimType, UserClaim};

/// Outcome of trying to claim a token
#[derive(Debug, Clone)]
pub enum ClaimAttempt {
    Claimed(UserClaim),
    /// No claim matches the type, token and email
    NotFound,
    /// The claim exists but was used or has expired
    Rejected(DomainError),
}

#[async_trait]
pub trait UserClaimRepository: Send + Sync {
    async fn create(&self, claim: &UserClaim, audit: &[AuditEvent]) -> RepositoryResult<()>;

    /// Claims a token at most once
    ///
    /// The matching row is locked while it is checked and marked claimed,
    /// so two concurrent attempts cannot both succeed. A successful claim
    /// writes its unattributed audit entry in the same transaction.
    async fn claim(
        &self,
        claim_type: ClaimType,
        token: &str,
        email_address: &Email,
        max_age: Option<Duration>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<ClaimAttempt>;
}
