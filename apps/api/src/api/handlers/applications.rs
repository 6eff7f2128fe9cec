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
use crate::domain::application::{Application, ApplicationKind, ApplicationStatus};
use crate::services::ApplicationService;

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ApplicationKind,
    #[serde(default)]
    pub data: Map<String, Value>,
}

fn default_kind() -> ApplicationKind {
    ApplicationKind::New
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub data: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationBody {
    pub id: Uuid,
    pub status: ApplicationStatus,
    #[serde(rename = "type")]
    pub kind: ApplicationKind,
    pub supplier_id: Option<Uuid>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<&Application> for ApplicationBody {
    fn from(application: &Application) -> Self {
        Self {
            id: application.id(),
            status: application.status(),
            kind: application.kind(),
            supplier_id: application.supplier_id(),
            data: application.data().clone(),
            created_at: application.created_at(),
            updated_at: application.updated_at(),
            submitted_at: application.submitted_at(),
        }
    }
}

/// POST /api/applications
pub async fn create_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationBody>), ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .create(&user, req.kind, Value::Object(req.data))
        .await?;

    Ok((StatusCode::CREATED, Json(ApplicationBody::from(&application))))
}

/// GET /api/applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .get(&user, id)
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}

/// PATCH /api/applications/:id
pub async fn update_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .update(&user, id, Value::Object(req.data))
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}

/// POST /api/applications/:id/submit
pub async fn submit_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .submit(&user, id)
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}

/// POST /api/applications/:id/approve
pub async fn approve_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .approve(&user, id)
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}

/// POST /api/applications/:id/reject
pub async fn reject_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .reject(&user, id)
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}

/// POST /api/applications/:id/revert
pub async fn revert_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .revert(&user, id)
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}

/// POST /api/applications/:id/unreject
pub async fn unreject_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .unreject(&user, id)
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}

/// DELETE /api/applications/:id
pub async fn delete_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationBody>, ApiError> {
    let application = ApplicationService::new(&state.repositories)
        .delete(&user, id)
        .await?;

    Ok(Json(ApplicationBody::from(&application)))
}
