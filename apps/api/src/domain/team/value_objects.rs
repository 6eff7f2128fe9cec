use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// Represents the lifecycle status of a buyer team
///
/// # Status Transitions
/// ```text
/// Created -> Completed -> Deleted
///    └-------------------> Deleted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    /// Team is being set up by its lead
    Created,
    /// Team setup has been validated and finished
    Completed,
    /// Team no longer exists
    Deleted,
}

impl TeamStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use marketplace_api::domain::team::value_objects::TeamStatus;
    ///
    /// assert!(TeamStatus::Created.can_transition_to(TeamStatus::Completed));
    /// assert!(!TeamStatus::Completed.can_transition_to(TeamStatus::Created));
    /// ```
    pub fn can_transition_to(&self, next: TeamStatus) -> bool {
        use TeamStatus::*;
        matches!(
            (self, next),
            (Created, Completed) | (Created, Deleted) | (Completed, Deleted)
        )
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamStatus::Created => write!(f, "created"),
            TeamStatus::Completed => write!(f, "completed"),
            TeamStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Permissions a team lead can grant to members
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateDrafts,
    PublishOpportunities,
    AnswerSellerQuestions,
    DownloadResponses,
    DownloadReports,
    CreateWorkOrders,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::CreateDrafts,
        Permission::PublishOpportunities,
        Permission::AnswerSellerQuestions,
        Permission::DownloadResponses,
        Permission::DownloadReports,
        Permission::CreateWorkOrders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateDrafts => "create_drafts",
            Permission::PublishOpportunities => "publish_opportunities",
            Permission::AnswerSellerQuestions => "answer_seller_questions",
            Permission::DownloadResponses => "download_responses",
            Permission::DownloadReports => "download_reports",
            Permission::CreateWorkOrders => "create_work_orders",
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

/// Membership of a user in a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    pub user_id: Uuid,
    pub is_team_lead: bool,
    pub permissions: BTreeSet<Permission>,
}

impl TeamMember {
    pub fn lead(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_team_lead: true,
            permissions: BTreeSet::new(),
        }
    }

    pub fn member(user_id: Uuid, permissions: BTreeSet<Permission>) -> Self {
        Self {
            user_id,
            is_team_lead: false,
            permissions,
        }
    }

    /// Leads hold every permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_team_lead || self.permissions.contains(&permission)
    }
}
