use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::auth::CurrentUser;
use crate::api::state::AppState;
use crate::domain::team::value_objects::{Permission, TeamMember, TeamStatus};
use crate::domain::team::{Team, TeamUpdate};
use crate::services::TeamService;

/// Request body for editing a team
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub email_address: Option<String>,
    pub team_leads: Option<Vec<Uuid>>,
    pub team_members: Option<Vec<Uuid>>,
    #[serde(default)]
    pub permissions: BTreeMap<Uuid, BTreeSet<Permission>>,
    #[serde(default)]
    pub create_team: bool,
}

impl From<UpdateTeamRequest> for TeamUpdate {
    fn from(req: UpdateTeamRequest) -> Self {
        TeamUpdate {
            name: req.name,
            email_address: req.email_address,
            team_leads: req.team_leads,
            team_members: req.team_members,
            permissions: req.permissions,
            create_team: req.create_team,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBody {
    pub user_id: Uuid,
    pub is_team_lead: bool,
    pub permissions: BTreeSet<Permission>,
}

impl From<&TeamMember> for MemberBody {
    fn from(member: &TeamMember) -> Self {
        Self {
            user_id: member.user_id,
            is_team_lead: member.is_team_lead,
            permissions: member.permissions.clone(),
        }
    }
}

/// Team as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamBody {
    pub id: Uuid,
    pub name: String,
    pub email_address: Option<String>,
    pub status: TeamStatus,
    pub members: Vec<MemberBody>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Team> for TeamBody {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id(),
            name: team.name().to_string(),
            email_address: team.email_address().map(str::to_string),
            status: team.status(),
            members: team.members().iter().map(MemberBody::from).collect(),
            created_at: team.created_at(),
            updated_at: team.updated_at(),
        }
    }
}

/// Create a team led by the caller
///
/// POST /api/teams
pub async fn create_team(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(StatusCode, Json<TeamBody>), ApiError> {
    let team = TeamService::new(&state.repositories).create(&user).await?;

    Ok((StatusCode::CREATED, Json(TeamBody::from(&team))))
}

/// Get a team by ID
///
/// GET /api/teams/:id
pub async fn get_team(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamBody>, ApiError> {
    let team = TeamService::new(&state.repositories).get(&user, id).await?;

    Ok(Json(TeamBody::from(&team)))
}

/// PATCH /api/teams/:id
pub async fn update_team(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTeamRequest>,
) -> Result<Json<TeamBody>, ApiError> {
    let team = TeamService::new(&state.repositories)
        .update(&user, id, req.into())
        .await?;

    Ok(Json(TeamBody::from(&team)))
}
