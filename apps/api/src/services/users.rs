use uuid::Uuid;

use super::{audit_entries, Repositories, ServiceError, ServiceResult};
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::user::{Email, User, UserRole};

/// Account registration and lookup
pub struct UserService<'a> {
    repos: &'a Repositories,
}

impl<'a> UserService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Registers a buyer or a seller applicant
    ///
    /// # Arguments
    /// * `password_hash` - bcrypt hash of the chosen password
    ///
    /// # Business Rules
    /// - Only buyers and applicants can sign themselves up
    /// - Email addresses are unique
    pub async fn register(
        &self,
        email: Email,
        password_hash: String,
        name: &str,
        role: UserRole,
    ) -> ServiceResult<User> {
        if !matches!(role, UserRole::Buyer | UserRole::Applicant) {
            return Err(DomainError::rule(format!(
                "Cannot register as {}",
                role.as_str()
            ))
            .into());
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::rule("A name is required").into());
        }

        let user = User::new(email, password_hash, name.to_string(), role);
        let audit = audit_entries(Some(&user), [DomainEvent::UserRegistered { user_id: user.id }]);
        self.repos.users.create(&user, &audit).await?;
        tracing::info!(user_id = %user.id, role = role.as_str(), "User registered");

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &Email) -> ServiceResult<Option<User>> {
        Ok(self.repos.users.find_by_email(email).await?)
    }

    /// Loads the active user behind a token
    pub async fn current(&self, user_id: Uuid) -> ServiceResult<User> {
        match self.repos.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => Err(ServiceError::unauthorised("Account is disabled")),
            None => Err(ServiceError::not_found(format!("User {} not found", user_id))),
        }
    }
}
