use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::auth::CurrentUser;
use crate::api::state::AppState;
use crate::domain::user::Email;
use crate::domain::user_claim::{ClaimType, UserClaim};
use crate::services::ClaimService;

#[derive(Debug, Deserialize)]
pub struct CreateClaimRequest {
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub email_address: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateClaimRequest {
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub token: String,
    pub email_address: String,
}

/// Claim as returned to clients
#[derive(Debug, Serialize)]
pub struct ClaimBody {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub email_address: String,
    pub data: Value,
    pub claimed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserClaim> for ClaimBody {
    fn from(claim: &UserClaim) -> Self {
        Self {
            id: claim.id(),
            claim_type: claim.claim_type(),
            email_address: claim.email_address().as_str().to_string(),
            data: claim.data().clone(),
            claimed: claim.claimed(),
            created_at: claim.created_at(),
        }
    }
}

/// Newly made claim; the token is only ever returned here
#[derive(Debug, Serialize)]
pub struct CreatedClaimBody {
    #[serde(flatten)]
    pub claim: ClaimBody,
    pub token: String,
}

/// POST /api/claims
pub async fn create_claim(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<CreatedClaimBody>), ApiError> {
    let email = Email::new(&req.email_address).map_err(ApiError::bad_request)?;
    let claim = ClaimService::new(&state.repositories, &state.settings)
        .make(&user, req.claim_type, email, Value::Object(req.data))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedClaimBody {
            claim: ClaimBody::from(&claim),
            token: claim.token().to_string(),
        }),
    ))
}

/// Validate a token and use it up
///
/// POST /api/claims/validate
pub async fn validate_claim(
    State(state): State<AppState>,
    Json(req): Json<ValidateClaimRequest>,
) -> Result<Json<ClaimBody>, ApiError> {
    let email = Email::new(&req.email_address).map_err(ApiError::bad_request)?;
    let claim = ClaimService::new(&state.repositories, &state.settings)
        .claim(req.claim_type, &req.token, &email)
        .await?;

    Ok(Json(ClaimBody::from(&claim)))
}
