use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::auth::jwt::verify_token;
use crate::domain::user::User;
use crate::services::{ServiceError, UserService};

/// Authenticated caller, resolved from a bearer token
///
/// The user is reloaded on every request so role changes and
/// deactivation apply immediately.
///
/// Usage:
/// ```rust,ignore
/// async fn protected_handler(CurrentUser(user): CurrentUser) -> Result<String, ApiError> {
///     Ok(format!("Hello {}", user.name))
/// }
/// ```
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::unauthorized("Invalid authorization format. Use: Bearer <token>")
        })?;

        let claims = verify_token(token, &state.jwt_secret)?;

        let user = UserService::new(&state.repositories)
            .current(claims.sub)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) | ServiceError::Unauthorised(_) => {
                    ApiError::unauthorized(e.to_string())
                }
                other => other.into(),
            })?;

        Ok(CurrentUser(user))
    }
}
