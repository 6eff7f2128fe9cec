use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::audit::{AuditEvent, AuditObject, AuditType};
use super::framework::Lot;

/// Domain events raised by the lifecycle aggregates
///
/// Every state-changing operation returns one or more of these. Services
/// turn them into audit log entries with [`DomainEvent::into_audit`].
///
/// # Example
/// ```
/// use marketplace_api::domain::events::DomainEvent;
/// use marketplace_api::domain::audit::AuditType;
/// use uuid::Uuid;
///
/// let event = DomainEvent::BriefWithdrawn {
///     brief_id: Uuid::new_v4(),
///     reason: "Budget withdrawn".to_string(),
/// };
/// assert_eq!(event.audit_type(), AuditType::WithdrawOpportunity);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    UserRegistered {
        user_id: Uuid,
    },
    BriefCreated {
        brief_id: Uuid,
        lot: Lot,
    },
    BriefUpdated {
        brief_id: Uuid,
    },
    BriefPublished {
        brief_id: Uuid,
        closed_at: DateTime<Utc>,
    },
    BriefWithdrawn {
        brief_id: Uuid,
        reason: String,
    },
    BriefClosedEarly {
        brief_id: Uuid,
    },
    BriefEdited {
        brief_id: Uuid,
        changed: Vec<String>,
    },
    BriefCopied {
        brief_id: Uuid,
        source_id: Uuid,
    },
    BriefDeleted {
        brief_id: Uuid,
    },
    ResponseCreated {
        response_id: Uuid,
        brief_id: Uuid,
        supplier_id: Uuid,
    },
    ResponseUpdated {
        response_id: Uuid,
        brief_id: Uuid,
    },
    ResponseSubmitted {
        response_id: Uuid,
        brief_id: Uuid,
    },
    ResponseWithdrawn {
        response_id: Uuid,
        brief_id: Uuid,
        previously_submitted: bool,
    },
    ApplicationCreated {
        application_id: Uuid,
    },
    ApplicationUpdated {
        application_id: Uuid,
    },
    ApplicationSubmitted {
        application_id: Uuid,
    },
    ApplicationApproved {
        application_id: Uuid,
        supplier_id: Uuid,
    },
    ApplicationRejected {
        application_id: Uuid,
    },
    ApplicationReverted {
        application_id: Uuid,
    },
    ApplicationUnrejected {
        application_id: Uuid,
    },
    ApplicationDeleted {
        application_id: Uuid,
    },
    EvidenceCreated {
        evidence_id: Uuid,
        domain_id: Uuid,
        supplier_id: Uuid,
    },
    EvidenceUpdated {
        evidence_id: Uuid,
    },
    EvidenceSubmitted {
        evidence_id: Uuid,
        domain_id: Uuid,
    },
    EvidenceApproved {
        evidence_id: Uuid,
        assessment_id: Uuid,
    },
    EvidenceRejected {
        evidence_id: Uuid,
        assessment_id: Uuid,
    },
    EvidenceDraftDeleted {
        evidence_id: Uuid,
    },
    TeamCreated {
        team_id: Uuid,
    },
    TeamUpdated {
        team_id: Uuid,
    },
    TeamCompleted {
        team_id: Uuid,
    },
    ClaimCreated {
        claim_id: Uuid,
        claim_type: String,
    },
    ClaimClaimed {
        claim_id: Uuid,
    },
}

impl DomainEvent {
    pub fn audit_type(&self) -> AuditType {
        use DomainEvent::*;
        match self {
            UserRegistered { .. } => AuditType::RegisterUser,
            BriefCreated { .. } => AuditType::CreateBrief,
            BriefUpdated { .. } => AuditType::UpdateBrief,
            BriefPublished { .. } => AuditType::PublishBrief,
            BriefWithdrawn { .. } => AuditType::WithdrawOpportunity,
            BriefClosedEarly { .. } => AuditType::CloseOpportunityEarly,
            BriefEdited { .. } => AuditType::OpportunityEdited,
            BriefCopied { .. } => AuditType::CopyBrief,
            BriefDeleted { .. } => AuditType::DeleteBrief,
            ResponseCreated { .. } => AuditType::CreateBriefResponse,
            ResponseUpdated { .. } => AuditType::UpdateBriefResponse,
            ResponseSubmitted { .. } => AuditType::SubmitBriefResponse,
            ResponseWithdrawn { .. } => AuditType::WithdrawBriefResponse,
            ApplicationCreated { .. } => AuditType::CreateApplication,
            ApplicationUpdated { .. } => AuditType::UpdateApplication,
            ApplicationSubmitted { .. } => AuditType::SubmitApplication,
            ApplicationApproved { .. } => AuditType::ApproveApplication,
            ApplicationRejected { .. } => AuditType::RejectApplication,
            ApplicationReverted { .. } => AuditType::RevertApplication,
            ApplicationUnrejected { .. } => AuditType::UnrejectApplication,
            ApplicationDeleted { .. } => AuditType::DeleteApplication,
            EvidenceCreated { .. } => AuditType::CreateEvidence,
            EvidenceUpdated { .. } => AuditType::UpdateEvidence,
            EvidenceSubmitted { .. } => AuditType::SubmitEvidence,
            EvidenceApproved { .. } => AuditType::ApproveDomain,
            EvidenceRejected { .. } => AuditType::RejectDomain,
            EvidenceDraftDeleted { .. } => AuditType::EvidenceDraftDeleted,
            TeamCreated { .. } => AuditType::CreateTeam,
            TeamUpdated { .. } => AuditType::UpdateTeam,
            TeamCompleted { .. } => AuditType::CompleteTeam,
            ClaimCreated { .. } => AuditType::CreateUserClaim,
            ClaimClaimed { .. } => AuditType::UserClaimClaimed,
        }
    }

    /// The object the event is about
    pub fn object(&self) -> AuditObject {
        use DomainEvent::*;
        match self {
            UserRegistered { user_id } => AuditObject::new("user", *user_id),
            BriefCreated { brief_id, .. }
            | BriefUpdated { brief_id }
            | BriefPublished { brief_id, .. }
            | BriefWithdrawn { brief_id, .. }
            | BriefClosedEarly { brief_id }
            | BriefEdited { brief_id, .. }
            | BriefCopied { brief_id, .. }
            | BriefDeleted { brief_id } => AuditObject::new("brief", *brief_id),
            ResponseCreated { response_id, .. }
            | ResponseUpdated { response_id, .. }
            | ResponseSubmitted { response_id, .. }
            | ResponseWithdrawn { response_id, .. } => {
                AuditObject::new("brief_response", *response_id)
            }
            ApplicationCreated { application_id }
            | ApplicationUpdated { application_id }
            | ApplicationSubmitted { application_id }
            | ApplicationApproved { application_id, .. }
            | ApplicationRejected { application_id }
            | ApplicationReverted { application_id }
            | ApplicationUnrejected { application_id }
            | ApplicationDeleted { application_id } => {
                AuditObject::new("application", *application_id)
            }
            EvidenceCreated { evidence_id, .. }
            | EvidenceUpdated { evidence_id }
            | EvidenceSubmitted { evidence_id, .. }
            | EvidenceApproved { evidence_id, .. }
            | EvidenceRejected { evidence_id, .. }
            | EvidenceDraftDeleted { evidence_id } => AuditObject::new("evidence", *evidence_id),
            TeamCreated { team_id } | TeamUpdated { team_id } | TeamCompleted { team_id } => {
                AuditObject::new("team", *team_id)
            }
            ClaimCreated { claim_id, .. } | ClaimClaimed { claim_id } => {
                AuditObject::new("user_claim", *claim_id)
            }
        }
    }

    /// Event payload stored with the audit record
    pub fn data(&self) -> Value {
        use DomainEvent::*;
        match self {
            BriefCreated { lot, .. } => json!({ "lot": lot.slug() }),
            BriefPublished { closed_at, .. } => json!({ "closedAt": closed_at }),
            BriefWithdrawn { reason, .. } => json!({ "reasonToWithdraw": reason }),
            BriefEdited { changed, .. } => json!({ "changed": changed }),
            BriefCopied { source_id, .. } => json!({ "sourceBriefId": source_id }),
            ResponseCreated {
                brief_id,
                supplier_id,
                ..
            } => json!({ "briefId": brief_id, "supplierId": supplier_id }),
            ResponseUpdated { brief_id, .. } | ResponseSubmitted { brief_id, .. } => {
                json!({ "briefId": brief_id })
            }
            ResponseWithdrawn {
                brief_id,
                previously_submitted,
                ..
            } => json!({ "briefId": brief_id, "previouslySubmitted": previously_submitted }),
            ApplicationApproved { supplier_id, .. } => json!({ "supplierId": supplier_id }),
            EvidenceCreated {
                domain_id,
                supplier_id,
                ..
            } => json!({ "domainId": domain_id, "supplierId": supplier_id }),
            EvidenceSubmitted { domain_id, .. } => json!({ "domainId": domain_id }),
            EvidenceApproved { assessment_id, .. } | EvidenceRejected { assessment_id, .. } => {
                json!({ "assessmentId": assessment_id })
            }
            ClaimCreated { claim_type, .. } => json!({ "claimType": claim_type }),
            _ => json!({}),
        }
    }

    /// Converts the event into an audit record attributed to `user`
    pub fn into_audit(self, user: Option<&str>) -> AuditEvent {
        AuditEvent::record(
            self.audit_type(),
            user.map(str::to_string),
            self.data(),
            Some(self.object()),
        )
    }
}
