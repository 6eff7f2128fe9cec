use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{DomainError, DomainResult};
use super::events::DomainEvent;
use super::user::Email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "claim_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Signup,
    PasswordReset,
    JoinTeam,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Signup => "signup",
            ClaimType::PasswordReset => "password_reset",
            ClaimType::JoinTeam => "join_team",
        }
    }
}

/// A single-use token sent to an email address (signup, password reset, team invite)
///
/// # Invariants
/// - A claim is claimed at most once
#[derive(Debug, Clone, PartialEq)]
pub struct UserClaim {
    id: Uuid,
    email_address: Email,
    token: String,
    claim_type: ClaimType,
    data: Value,
    claimed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserClaim {
    /// Makes a new claim with a random token
    pub fn make(
        claim_type: ClaimType,
        email_address: Email,
        data: Value,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, DomainEvent)> {
        let has_data = data.as_object().map_or(false, |d| !d.is_empty());
        if !has_data {
            return Err(DomainError::rule("Claim data is required"));
        }

        let claim = Self {
            id: Uuid::new_v4(),
            email_address,
            token: new_token(),
            claim_type,
            data,
            claimed: false,
            created_at: now,
            updated_at: now,
        };
        let event = DomainEvent::ClaimCreated {
            claim_id: claim.id,
            claim_type: claim_type.as_str().to_string(),
        };
        Ok((claim, event))
    }

    /// Whether the claim is older than `max_age`
    pub fn is_expired(&self, max_age: Option<Duration>, now: DateTime<Utc>) -> bool {
        max_age
            .and_then(|age| now.checked_sub_signed(age))
            .map_or(false, |oldest| self.created_at < oldest)
    }

    /// Marks the claim used
    ///
    /// # Business Rules
    /// - Already claimed tokens are refused
    /// - Claims older than `max_age` are refused
    pub fn claim(&mut self, max_age: Option<Duration>, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        if self.claimed {
            return Err(DomainError::rule("This claim has already been used"));
        }
        if self.is_expired(max_age, now) {
            return Err(DomainError::rule("This claim has expired"));
        }

        self.claimed = true;
        self.updated_at = now;
        Ok(DomainEvent::ClaimClaimed { claim_id: self.id })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email_address(&self) -> &Email {
        &self.email_address
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claim_type(&self) -> ClaimType {
        self.claim_type
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn claimed(&self) -> bool {
        self.claimed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        email_address: Email,
        token: String,
        claim_type: ClaimType,
        data: Value,
        claimed: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email_address,
            token,
            claim_type,
            data,
            claimed,
            created_at,
            updated_at,
        }
    }
}

/// 64 hex characters from two v4 uuids
fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claim() -> UserClaim {
        UserClaim::make(
            ClaimType::Signup,
            Email::new("new@agency.gov.au").unwrap(),
            json!({ "name": "New Buyer" }),
            Utc::now(),
        )
        .unwrap()
        .0
    }

    #[test]
    fn make_requires_data() {
        let result = UserClaim::make(
            ClaimType::PasswordReset,
            Email::new("user@agency.gov.au").unwrap(),
            json!({}),
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn tokens_are_random() {
        let a = claim();
        let b = claim();
        assert_eq!(a.token().len(), 64);
        assert_ne!(a.token(), b.token());
    }

    #[test]
    fn claim_at_most_once() {
        let mut claim = claim();
        claim.claim(None, Utc::now()).unwrap();
        assert!(claim.claimed());

        let err = claim.claim(None, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "This claim has already been used");
    }

    #[test]
    fn expired_claim_refused() {
        let mut claim = claim();
        let later = claim.created_at() + Duration::hours(2);

        assert!(claim.claim(Some(Duration::hours(1)), later).is_err());
        assert!(!claim.claimed());
        assert!(claim.claim(Some(Duration::hours(3)), later).is_ok());
    }

    #[test]
    fn huge_max_age_never_expires() {
        let mut claim = claim();
        let age = Duration::milliseconds(i64::MAX);

        assert!(!claim.is_expired(Some(age), Utc::now()));
        assert!(claim.claim(Some(age), Utc::now()).is_ok());
    }

    #[test]
    fn claim_type_names() {
        assert_eq!(ClaimType::JoinTeam.as_str(), "join_team");
        assert_eq!(
            serde_json::to_value(ClaimType::PasswordReset).unwrap(),
            json!("password_reset")
        );
    }
}
