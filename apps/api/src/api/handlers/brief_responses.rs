use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::auth::CurrentUser;
use crate::api::state::AppState;
use crate::domain::brief_response::{BriefResponse, ResponseStatus};
use crate::services::ResponseService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponseRequest {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub submit: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub id: Uuid,
    pub brief_id: Uuid,
    pub supplier_id: Uuid,
    pub status: ResponseStatus,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl From<&BriefResponse> for ResponseBody {
    fn from(response: &BriefResponse) -> Self {
        Self {
            id: response.id(),
            brief_id: response.brief_id(),
            supplier_id: response.supplier_id(),
            status: response.status(),
            data: response.data().clone(),
            created_at: response.created_at(),
            updated_at: response.updated_at(),
            submitted_at: response.submitted_at(),
            withdrawn_at: response.withdrawn_at(),
        }
    }
}

/// Start a response to an opportunity
///
/// POST /api/briefs/:id/respond
pub async fn create_response(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(brief_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ResponseBody>), ApiError> {
    let response = ResponseService::new(&state.repositories)
        .create(&user, brief_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ResponseBody::from(&response))))
}

/// Save or submit a response
///
/// PATCH /api/briefs/:id/respond/:response_id
pub async fn update_response(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((brief_id, response_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateResponseRequest>,
) -> Result<Json<ResponseBody>, ApiError> {
    let response = ResponseService::new(&state.repositories)
        .update(&user, brief_id, response_id, Value::Object(req.data), req.submit)
        .await?;

    Ok(Json(ResponseBody::from(&response)))
}

/// GET /api/brief-responses/:id
pub async fn get_response(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResponseBody>, ApiError> {
    let response = ResponseService::new(&state.repositories)
        .get(&user, id)
        .await?;

    Ok(Json(ResponseBody::from(&response)))
}

/// PUT /api/brief-responses/:id/withdraw
pub async fn withdraw_response(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResponseBody>, ApiError> {
    let response = ResponseService::new(&state.repositories)
        .withdraw(&user, id)
        .await?;

    Ok(Json(ResponseBody::from(&response)))
}
