use chrono::Utc;
use serde_json::Value;

use super::{audit_entries, Repositories, ServiceError, ServiceResult, ServiceSettings};
use crate::domain::repositories::ClaimAttempt;
use crate::domain::user::{Email, User};
use crate::domain::user_claim::{ClaimType, UserClaim};

/// Single-use tokens for signup, password reset and team invitations
pub struct ClaimService<'a> {
    repos: &'a Repositories,
    settings: &'a ServiceSettings,
}

impl<'a> ClaimService<'a> {
    pub fn new(repos: &'a Repositories, settings: &'a ServiceSettings) -> Self {
        Self { repos, settings }
    }

    /// Makes a claim for an email address
    ///
    /// # Business Rules
    /// - Admins can make any claim
    /// - Buyers can only invite people to their team
    pub async fn make(
        &self,
        user: &User,
        claim_type: ClaimType,
        email_address: Email,
        data: Value,
    ) -> ServiceResult<UserClaim> {
        let allowed = user.is_admin() || (user.is_buyer() && claim_type == ClaimType::JoinTeam);
        if !allowed {
            return Err(ServiceError::unauthorised(
                "You cannot create this kind of claim",
            ));
        }

        let (claim, event) = UserClaim::make(claim_type, email_address, data, Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.claims.create(&claim, &audit).await?;
        tracing::info!(claim_id = %claim.id(), claim_type = claim_type.as_str(), "Claim created");

        Ok(claim)
    }

    /// Validates a token and claims it
    pub async fn claim(
        &self,
        claim_type: ClaimType,
        token: &str,
        email_address: &Email,
    ) -> ServiceResult<UserClaim> {
        let attempt = self
            .repos
            .claims
            .claim(
                claim_type,
                token,
                email_address,
                self.settings.claim_max_age,
                Utc::now(),
            )
            .await?;

        match attempt {
            ClaimAttempt::Claimed(claim) => {
                tracing::info!(claim_id = %claim.id(), "Claim used");
                Ok(claim)
            }
            ClaimAttempt::NotFound => Err(ServiceError::not_found("Invalid claim")),
            ClaimAttempt::Rejected(e) => {
                tracing::warn!(reason = %e, "Claim refused");
                Err(e.into())
            }
        }
    }
}
