use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::{DomainError, DomainResult};

macro_rules! audit_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Kind of state change recorded in the audit log
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum AuditType {
            $(#[serde(rename = $name)] $variant),+
        }

        impl AuditType {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(AuditType::$variant => $name),+
                }
            }
        }

        impl FromStr for AuditType {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(AuditType::$variant),)+
                    other => Err(format!("Unknown audit type: {}", other)),
                }
            }
        }
    };
}

audit_types! {
    RegisterUser => "register_user",
    CreateBrief => "create_brief",
    UpdateBrief => "update_brief",
    PublishBrief => "publish_brief",
    WithdrawOpportunity => "withdraw_opportunity",
    CloseOpportunityEarly => "close_opportunity_early",
    OpportunityEdited => "opportunity_edited",
    CopyBrief => "copy_brief",
    DeleteBrief => "delete_brief",
    CreateBriefResponse => "create_brief_response",
    UpdateBriefResponse => "update_brief_response",
    SubmitBriefResponse => "submit_brief_response",
    WithdrawBriefResponse => "withdraw_brief_response",
    CreateApplication => "create_application",
    UpdateApplication => "update_application",
    SubmitApplication => "submit_application",
    ApproveApplication => "approve_application",
    RejectApplication => "reject_application",
    RevertApplication => "revert_application",
    UnrejectApplication => "unreject_application",
    DeleteApplication => "delete_application",
    CreateEvidence => "create_evidence",
    UpdateEvidence => "update_evidence",
    SubmitEvidence => "submit_evidence",
    EvidenceDraftDeleted => "evidence_draft_deleted",
    ApproveDomain => "approve_domain",
    RejectDomain => "reject_domain",
    CreateTeam => "create_team",
    UpdateTeam => "update_team",
    CompleteTeam => "complete_team",
    CreateUserClaim => "create_user_claim",
    UserClaimClaimed => "user_claim_claimed",
}

impl std::fmt::Display for AuditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object an audit event refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditObject {
    pub object_type: String,
    pub object_id: Uuid,
}

impl AuditObject {
    pub fn new(object_type: &str, object_id: Uuid) -> Self {
        Self {
            object_type: object_type.to_string(),
            object_id,
        }
    }
}

/// Append-only audit record
///
/// # Invariants
/// - Nothing but the acknowledgement fields ever changes after creation
/// - Acknowledgement happens at most once
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    id: Uuid,
    audit_type: AuditType,
    user: Option<String>,
    data: Value,
    object: Option<AuditObject>,
    created_at: DateTime<Utc>,
    acknowledged: bool,
    acknowledged_by: Option<String>,
    acknowledged_at: Option<DateTime<Utc>>,
}

impl AuditEvent {
    pub fn record(
        audit_type: AuditType,
        user: Option<String>,
        data: Value,
        object: Option<AuditObject>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            audit_type,
            user,
            data,
            object,
            created_at: Utc::now(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    /// Marks the event as reviewed
    ///
    /// # Business Rules
    /// - An event can only be acknowledged once
    pub fn acknowledge(&mut self, by: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if self.acknowledged {
            return Err(DomainError::rule(format!(
                "Audit event {} has already been acknowledged",
                self.id
            )));
        }

        self.acknowledged = true;
        self.acknowledged_by = Some(by.to_string());
        self.acknowledged_at = Some(now);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn audit_type(&self) -> AuditType {
        self.audit_type
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn object(&self) -> Option<&AuditObject> {
        self.object.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn acknowledged_by(&self) -> Option<&str> {
        self.acknowledged_by.as_deref()
    }

    pub fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.acknowledged_at
    }

    /// Reconstitutes an event from persistence
    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        audit_type: AuditType,
        user: Option<String>,
        data: Value,
        object: Option<AuditObject>,
        created_at: DateTime<Utc>,
        acknowledged: bool,
        acknowledged_by: Option<String>,
        acknowledged_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            audit_type,
            user,
            data,
            object,
            created_at,
            acknowledged,
            acknowledged_by,
            acknowledged_at,
        }
    }
}

/// Listing filter; every field narrows the result when set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub object_type: Option<String>,
    pub object_id: Option<Uuid>,
    pub audit_type: Option<AuditType>,
    pub acknowledged: Option<bool>,
}

impl AuditFilter {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        let object_type_ok = self.object_type.as_deref().map_or(true, |t| {
            event.object().map(|o| o.object_type.as_str()) == Some(t)
        });
        let object_id_ok = self
            .object_id
            .map_or(true, |id| event.object().map(|o| o.object_id) == Some(id));
        let type_ok = self.audit_type.map_or(true, |t| event.audit_type() == t);
        let ack_ok = self.acknowledged.map_or(true, |a| event.acknowledged() == a);

        object_type_ok && object_id_ok && type_ok && ack_ok
    }
}
