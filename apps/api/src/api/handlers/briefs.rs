use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::auth::CurrentUser;
use crate::api::state::AppState;
use crate::domain::brief::{Brief, BriefHistory, BriefStatus, LiveEdits};
use crate::domain::eligibility::ViewerStatus;
use crate::domain::framework::Lot;
use crate::services::briefs::BriefView;
use crate::services::BriefService;

const DEFAULT_FRAMEWORK: &str = "digital-marketplace";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBriefRequest {
    #[serde(default)]
    pub framework: Option<String>,
    pub lot: Lot,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBriefRequest {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: BriefStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub withdrawn_reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub closed_at: Option<NaiveDate>,
    pub sellers: Option<Map<String, Value>>,
}

impl From<EditRequest> for LiveEdits {
    fn from(req: EditRequest) -> Self {
        LiveEdits {
            title: req.title,
            summary: req.summary,
            closed_on: req.closed_at,
            sellers: req.sellers,
        }
    }
}

/// Brief as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefBody {
    pub id: Uuid,
    pub framework_id: Uuid,
    pub lot: Lot,
    pub status: BriefStatus,
    pub data: Value,
    pub author_id: Uuid,
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub questions_closed_at: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl From<&Brief> for BriefBody {
    fn from(brief: &Brief) -> Self {
        Self {
            id: brief.id(),
            framework_id: brief.framework_id(),
            lot: brief.lot(),
            status: brief.status(),
            data: brief.data().clone(),
            author_id: brief.author_id(),
            team_id: brief.team_id(),
            created_at: brief.created_at(),
            updated_at: brief.updated_at(),
            published_at: brief.published_at(),
            closed_at: brief.closed_at(),
            questions_closed_at: brief.questions_closed_at(),
            withdrawn_at: brief.withdrawn_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefViewBody {
    pub brief: BriefBody,
    pub framework: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ViewerStatus>,
    pub can_manage: bool,
    pub can_close_early: bool,
}

impl From<&BriefView> for BriefViewBody {
    fn from(view: &BriefView) -> Self {
        let mut brief = BriefBody::from(&view.brief);
        brief.status = view.status;
        Self {
            brief,
            framework: view.framework.slug.clone(),
            viewer: view.viewer.clone(),
            can_manage: view.can_manage,
            can_close_early: view.can_close_early,
        }
    }
}

/// Create a draft opportunity
///
/// POST /api/briefs
pub async fn create_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateBriefRequest>,
) -> Result<(StatusCode, Json<BriefBody>), ApiError> {
    let framework = req.framework.as_deref().unwrap_or(DEFAULT_FRAMEWORK);
    let brief = BriefService::new(&state.repositories, &state.settings)
        .create(&user, framework, req.lot, Value::Object(req.data))
        .await?;

    Ok((StatusCode::CREATED, Json(BriefBody::from(&brief))))
}

/// GET /api/briefs/:id
pub async fn get_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BriefViewBody>, ApiError> {
    let view = BriefService::new(&state.repositories, &state.settings)
        .get(&user, id)
        .await?;

    Ok(Json(BriefViewBody::from(&view)))
}

/// Update a draft, optionally publishing it
///
/// PATCH /api/briefs/:id
pub async fn update_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBriefRequest>,
) -> Result<Json<BriefBody>, ApiError> {
    let brief = BriefService::new(&state.repositories, &state.settings)
        .update(&user, id, req.data, req.publish)
        .await?;

    Ok(Json(BriefBody::from(&brief)))
}

/// PUT /api/briefs/:id/status
pub async fn set_brief_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<BriefBody>, ApiError> {
    let brief = BriefService::new(&state.repositories, &state.settings)
        .set_status(&user, id, req.status)
        .await?;

    Ok(Json(BriefBody::from(&brief)))
}

/// Delete a draft
///
/// DELETE /api/briefs/:id
pub async fn delete_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    BriefService::new(&state.repositories, &state.settings)
        .delete(&user, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/briefs/:id/withdraw
pub async fn withdraw_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<BriefBody>, ApiError> {
    let brief = BriefService::new(&state.repositories, &state.settings)
        .withdraw(&user, id, &req.withdrawn_reason)
        .await?;

    Ok(Json(BriefBody::from(&brief)))
}

/// POST /api/briefs/:id/close
pub async fn close_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BriefBody>, ApiError> {
    let brief = BriefService::new(&state.repositories, &state.settings)
        .close_early(&user, id)
        .await?;

    Ok(Json(BriefBody::from(&brief)))
}

/// POST /api/briefs/:id/copy
pub async fn copy_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<BriefBody>), ApiError> {
    let brief = BriefService::new(&state.repositories, &state.settings)
        .copy(&user, id)
        .await?;

    Ok((StatusCode::CREATED, Json(BriefBody::from(&brief))))
}

/// Edit a live opportunity
///
/// PATCH /api/briefs/:id/edit
pub async fn edit_brief(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<EditRequest>,
) -> Result<Json<BriefBody>, ApiError> {
    let brief = BriefService::new(&state.repositories, &state.settings)
        .edit(&user, id, req.into())
        .await?;

    Ok(Json(BriefBody::from(&brief)))
}

/// GET /api/briefs/:id/history
pub async fn brief_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BriefHistory>>, ApiError> {
    let history = BriefService::new(&state.repositories, &state.settings)
        .history(&user, id)
        .await?;

    Ok(Json(history))
}
