// JWT token creation and verification
// HS256 bearer tokens carrying the user id and role

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::domain::user::UserRole;

/// Lifetime of an issued token
pub const TOKEN_TTL_HOURS: i64 = 8;

/// JWT claims structure
///
/// # Fields
/// * `sub` - Subject (user_id)
/// * `role` - Role at the time the token was issued; informational only,
///   handlers always reload the user
/// * `iat` / `exp` - Issued-at and expiry (seconds since epoch)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

/// Creates a signed token for a user
///
/// # Example
/// ```
/// use marketplace_api::auth::jwt::create_token;
/// use marketplace_api::domain::user::UserRole;
/// use uuid::Uuid;
///
/// let token = create_token(Uuid::new_v4(), UserRole::Buyer, "secret").expect("valid token");
/// assert_eq!(token.split('.').count(), 3);
/// ```
pub fn create_token(user_id: Uuid, role: UserRole, secret: &str) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

/// Verifies signature and expiry, returning the claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "marketplace-test-secret";

    #[test]
    fn token_round_trips_user_and_role() {
        let user_id = Uuid::new_v4();
        let token = create_token(user_id, UserRole::Supplier, TEST_SECRET).unwrap();

        let claims = verify_token(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::Supplier);
    }

    #[test]
    fn wrong_secret_fails() {
        let token = create_token(Uuid::new_v4(), UserRole::Buyer, TEST_SECRET).unwrap();
        assert!(verify_token(&token, "another-secret").is_err());
    }

    #[test]
    fn garbage_fails() {
        assert!(matches!(
            verify_token("not.a.token", TEST_SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expires_after_ttl() {
        let token = create_token(Uuid::new_v4(), UserRole::Admin, TEST_SECRET).unwrap();
        let claims = verify_token(&token, TEST_SECRET).unwrap();

        let ttl = (claims.exp - claims.iat) as i64;
        assert_eq!(ttl, Duration::hours(TOKEN_TTL_HOURS).num_seconds());
    }
}
