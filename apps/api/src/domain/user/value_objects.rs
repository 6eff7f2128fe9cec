use serde::{Deserialize, Serialize};
use std::fmt;

/// Email value object representing a valid email address
///
/// # Invariants
/// - Exactly one '@' with a non-empty local part and domain
/// - No whitespace
/// - Stored lower-cased, so lookups are case-insensitive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Creates a new Email value object
    ///
    /// # Example
    /// ```
    /// use marketplace_api::domain::user::value_objects::Email;
    ///
    /// let email = Email::new("Buyer@Agency.gov.au").expect("valid email");
    /// assert_eq!(email.as_str(), "buyer@agency.gov.au");
    /// assert_eq!(email.domain(), "agency.gov.au");
    /// ```
    pub fn new(email: impl Into<String>) -> Result<Self, String> {
        let email = email.into().trim().to_lowercase();
        if Self::is_valid(&email) {
            Ok(Email(email))
        } else {
            Err(format!("Invalid email: {}", email))
        }
    }

    /// Validates an email string without constructing one
    pub fn is_valid(email: &str) -> bool {
        let mut parts = email.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !email.chars().any(char::is_whitespace)
            }
            _ => false,
        }
    }

    /// Returns the email as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the part after '@'
    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email() {
        assert!(Email::new("test@example.com").is_ok());
    }

    #[test]
    fn valid_email_with_subdomain() {
        assert!(Email::new("user@mail.example.com").is_ok());
    }

    #[test]
    fn email_is_lowercased_and_trimmed() {
        let email = Email::new("  Someone@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "someone@example.com");
    }

    #[test]
    fn invalid_email_no_at_symbol() {
        assert!(Email::new("invalid").is_err());
    }

    #[test]
    fn invalid_email_missing_domain() {
        assert!(Email::new("a@").is_err());
    }

    #[test]
    fn invalid_email_two_at_symbols() {
        assert!(Email::new("a@b@c").is_err());
    }

    #[test]
    fn invalid_email_empty() {
        assert!(Email::new("").is_err());
    }

    #[test]
    fn email_domain() {
        let email = Email::new("seller@digital.gov.au").unwrap();
        assert_eq!(email.domain(), "digital.gov.au");
    }

    #[test]
    fn email_deserialises_with_validation() {
        let ok: Result<Email, _> = serde_json::from_str("\"x@y.com\"");
        let bad: Result<Email, _> = serde_json::from_str("\"nope\"");
        assert!(ok.is_ok());
        assert!(bad.is_err());
    }
}
