use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::auth::CurrentUser;
use crate::api::state::AppState;
use crate::domain::audit::{AuditEvent, AuditFilter, AuditObject, AuditType};
use crate::services::AuditService;

#[derive(Debug, Serialize)]
pub struct AuditEventBody {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub audit_type: AuditType,
    pub user: Option<String>,
    pub data: Value,
    pub object: Option<AuditObject>,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl From<&AuditEvent> for AuditEventBody {
    fn from(event: &AuditEvent) -> Self {
        Self {
            id: event.id(),
            audit_type: event.audit_type(),
            user: event.user().map(str::to_string),
            data: event.data().clone(),
            object: event.object().cloned(),
            created_at: event.created_at(),
            acknowledged: event.acknowledged(),
            acknowledged_by: event.acknowledged_by().map(str::to_string),
            acknowledged_at: event.acknowledged_at(),
        }
    }
}

/// GET /api/audit-events?object_type=..&object_id=..&audit_type=..&acknowledged=..
pub async fn list_audit_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<Vec<AuditEventBody>>, ApiError> {
    let events = AuditService::new(&state.repositories)
        .list(&user, &filter)
        .await?;

    Ok(Json(events.iter().map(AuditEventBody::from).collect()))
}

/// POST /api/audit-events/:id/acknowledge
pub async fn acknowledge_audit_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditEventBody>, ApiError> {
    let event = AuditService::new(&state.repositories)
        .acknowledge(&user, id)
        .await?;

    Ok(Json(AuditEventBody::from(&event)))
}
