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
use crate::domain::evidence::{AssessmentDecision, Evidence, EvidenceFeedback, EvidenceStatus};
use crate::services::evidence::EvidenceView;
use crate::services::EvidenceService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvidenceRequest {
    #[serde(default)]
    pub brief_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvidenceRequest {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub failed_criteria: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub failed_criteria: Map<String, Value>,
    #[serde(default)]
    pub vfm: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceBody {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub supplier_id: Uuid,
    pub brief_id: Option<Uuid>,
    pub status: EvidenceStatus,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_feedback: Option<EvidenceFeedback>,
}

impl From<&Evidence> for EvidenceBody {
    fn from(evidence: &Evidence) -> Self {
        Self {
            id: evidence.id(),
            domain_id: evidence.domain_id(),
            supplier_id: evidence.supplier_id(),
            brief_id: evidence.brief_id(),
            status: evidence.status(),
            data: evidence.data().clone(),
            created_at: evidence.created_at(),
            updated_at: evidence.updated_at(),
            submitted_at: evidence.submitted_at(),
            approved_at: evidence.approved_at(),
            rejected_at: evidence.rejected_at(),
            previous_feedback: None,
        }
    }
}

impl From<EvidenceView> for EvidenceBody {
    fn from(view: EvidenceView) -> Self {
        Self {
            previous_feedback: view.previous_feedback,
            ..EvidenceBody::from(&view.evidence)
        }
    }
}

/// Start a draft assessment in a domain
///
/// POST /api/evidence/:domain_id
pub async fn start_evidence(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(domain_id): Path<Uuid>,
    body: Option<Json<StartEvidenceRequest>>,
) -> Result<(StatusCode, Json<EvidenceBody>), ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let evidence = EvidenceService::new(&state.repositories)
        .start(&user, domain_id, req.brief_id)
        .await?;

    Ok((StatusCode::CREATED, Json(EvidenceBody::from(&evidence))))
}

/// GET /api/evidence/:id
pub async fn get_evidence(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EvidenceBody>, ApiError> {
    let view = EvidenceService::new(&state.repositories)
        .get(&user, id)
        .await?;

    Ok(Json(EvidenceBody::from(view)))
}

/// Save a draft, submitting it when `publish` is set
///
/// PATCH /api/evidence/:id
pub async fn update_evidence(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEvidenceRequest>,
) -> Result<Json<EvidenceBody>, ApiError> {
    let evidence = EvidenceService::new(&state.repositories)
        .update(&user, id, Value::Object(req.data), req.publish)
        .await?;

    Ok(Json(EvidenceBody::from(&evidence)))
}

/// DELETE /api/evidence/:id
pub async fn delete_evidence(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    EvidenceService::new(&state.repositories)
        .delete_draft(&user, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/evidence/:id/feedback
pub async fn evidence_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EvidenceFeedback>, ApiError> {
    let feedback = EvidenceService::new(&state.repositories)
        .feedback(&user, id)
        .await?;

    Ok(Json(feedback))
}

/// POST /api/evidence/:id/approve
pub async fn approve_evidence(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ApproveRequest>>,
) -> Result<Json<EvidenceBody>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let decision = AssessmentDecision::Approve {
        failed_criteria: req.failed_criteria,
    };
    let evidence = EvidenceService::new(&state.repositories)
        .assess(&user, id, decision)
        .await?;

    Ok(Json(EvidenceBody::from(&evidence)))
}

/// POST /api/evidence/:id/reject
pub async fn reject_evidence(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<EvidenceBody>, ApiError> {
    let decision = AssessmentDecision::Reject {
        failed_criteria: req.failed_criteria,
        vfm: req.vfm,
    };
    let evidence = EvidenceService::new(&state.repositories)
        .assess(&user, id, decision)
        .await?;

    Ok(Json(EvidenceBody::from(&evidence)))
}
