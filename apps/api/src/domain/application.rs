use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::errors::{DomainError, DomainResult};
use super::events::DomainEvent;
use super::supplier::Supplier;
use super::user::Email;
use super::validation::{is_blank, normalise_document, ValidationMessage};

/// Lifecycle status of a seller application
///
/// # Status Transitions
/// ```text
/// Saved -> Submitted -> Approved
///   ^          |  ^
///   └----------┘  └-- ApprovalRejected
/// (any but Approved) -> Deleted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Saved,
    Submitted,
    Approved,
    Complete,
    ApprovalRejected,
    AssessmentRejected,
    Deleted,
}

impl ApplicationStatus {
    /// Checks if a transition from current status to next status is valid
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        match (self, next) {
            (Saved, Submitted)
            | (Submitted, Approved)
            | (Submitted, ApprovalRejected)
            | (Submitted, Saved)
            | (ApprovalRejected, Submitted) => true,
            (Approved | Deleted, Deleted) => false,
            (_, Deleted) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Saved => "saved",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Complete => "complete",
            ApplicationStatus::ApprovalRejected => "approval_rejected",
            ApplicationStatus::AssessmentRejected => "assessment_rejected",
            ApplicationStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// New seller, upgrade of an existing seller, or an edit of a seller profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationKind {
    New,
    Upgrade,
    Edit,
}

const SERVER_OWNED_KEYS: &[&str] = &[
    "id",
    "status",
    "type",
    "supplierId",
    "supplier_code",
    "createdAt",
    "updatedAt",
    "submittedAt",
];

/// Keys describing the person who filled in an edit; never copied onto an existing seller
const REPRESENTATIVE_KEYS: &[&str] = &["representative", "phone", "email"];

/// Seller application aggregate root
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    id: Uuid,
    data: Value,
    status: ApplicationStatus,
    kind: ApplicationKind,
    supplier_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

/// Result of approving an application
#[derive(Debug, Clone)]
pub struct Approval {
    pub supplier: Supplier,
    pub created_supplier: bool,
    pub event: DomainEvent,
}

impl Application {
    /// Creates a saved application
    ///
    /// Upgrades and edits must reference the existing supplier.
    pub fn new(
        kind: ApplicationKind,
        supplier_id: Option<Uuid>,
        data: Value,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, DomainEvent)> {
        if kind != ApplicationKind::New && supplier_id.is_none() {
            return Err(DomainError::rule(format!(
                "An {} application needs an existing supplier",
                match kind {
                    ApplicationKind::Upgrade => "upgrade",
                    _ => "edit",
                }
            )));
        }

        let application = Self {
            id: Uuid::new_v4(),
            data: normalise_document(data, SERVER_OWNED_KEYS),
            status: ApplicationStatus::Saved,
            kind,
            supplier_id,
            created_at: now,
            updated_at: now,
            submitted_at: None,
        };
        let event = DomainEvent::ApplicationCreated {
            application_id: application.id,
        };
        Ok((application, event))
    }

    fn transition(&mut self, next: ApplicationStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::transition("application", self.status, next));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Replaces the application data while it is saved
    pub fn update_data(&mut self, data: Value, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        if self.status != ApplicationStatus::Saved {
            return Err(DomainError::rule(format!(
                "Application '{}' is {} and cannot be edited",
                self.id, self.status
            )));
        }

        let mut merged = self.data.as_object().cloned().unwrap_or_default();
        if let Value::Object(incoming) = normalise_document(data, SERVER_OWNED_KEYS) {
            merged.extend(incoming);
        }
        self.data = Value::Object(merged);
        self.updated_at = now;

        Ok(DomainEvent::ApplicationUpdated {
            application_id: self.id,
        })
    }

    /// Fields missing before an application can be submitted
    pub fn submission_errors(&self) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();
        let required = [
            ("A001", "business-details", "name", "Business name is required"),
            ("A002", "business-details", "abn", "ABN is required"),
            ("A003", "your-info", "representative", "Authorised representative is required"),
            ("A004", "your-info", "phone", "Authorised representative phone is required"),
            ("A005", "your-info", "email", "Authorised representative email is required"),
        ];
        for (id, step, field, message) in required {
            if is_blank(self.data.get(field)) {
                messages.push(ValidationMessage::error(id, step, message));
            }
        }

        if let Some(email) = self.data.get("email").and_then(Value::as_str) {
            if !email.is_empty() && !Email::is_valid(&email.to_lowercase()) {
                messages.push(ValidationMessage::error(
                    "A006",
                    "your-info",
                    "Authorised representative email is invalid",
                ));
            }
        }

        messages
    }

    /// saved -> submitted
    pub fn submit_for_approval(&mut self, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        if self.status != ApplicationStatus::Saved {
            return Err(DomainError::rule(
                "Only a 'saved' application can be set to 'submitted'.",
            ));
        }

        let messages = self.submission_errors();
        if !messages.is_empty() {
            return Err(DomainError::Messages(messages));
        }

        self.transition(ApplicationStatus::Submitted, now)?;
        self.submitted_at = Some(now);

        Ok(DomainEvent::ApplicationSubmitted {
            application_id: self.id,
        })
    }

    /// Approves a submitted application (submitted -> approved)
    ///
    /// # Arguments
    /// * `existing` - the supplier an upgrade/edit applies to; `None` for new sellers
    ///
    /// # Business Rules
    /// - Application must be submitted
    /// - `understandsAssessmentProcess` is dropped, as are labour hire
    ///   entries lacking an expiry or licence number
    /// - Edits of an existing supplier do not copy the representative's details
    /// - New sellers start as `limited` suppliers
    pub fn approve(&mut self, existing: Option<Supplier>, now: DateTime<Utc>) -> DomainResult<Approval> {
        self.ensure_submitted_for_decision()?;

        let mut data = self.data.as_object().cloned().unwrap_or_default();
        data.remove("understandsAssessmentProcess");
        if let Some(Value::Object(labour_hire)) = data.get_mut("labourHire") {
            labour_hire.retain(|_, licence| {
                !is_blank(licence.get("expiry")) && !is_blank(licence.get("licenceNumber"))
            });
        }

        let (supplier, created_supplier) = match existing {
            Some(mut supplier) => {
                for key in REPRESENTATIVE_KEYS {
                    data.remove(*key);
                }
                supplier.merge_profile(&Value::Object(data.clone()));
                (supplier, false)
            }
            None => (Supplier::from_application(&Value::Object(data.clone()), now), true),
        };

        self.data = Value::Object(data);
        self.supplier_id = Some(supplier.id);
        self.transition(ApplicationStatus::Approved, now)?;

        let event = DomainEvent::ApplicationApproved {
            application_id: self.id,
            supplier_id: supplier.id,
        };
        Ok(Approval {
            supplier,
            created_supplier,
            event,
        })
    }

    /// Rejects a submitted application (submitted -> approval_rejected)
    pub fn reject(&mut self, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        self.ensure_submitted_for_decision()?;
        self.transition(ApplicationStatus::ApprovalRejected, now)?;
        Ok(DomainEvent::ApplicationRejected {
            application_id: self.id,
        })
    }

    fn ensure_submitted_for_decision(&self) -> DomainResult<()> {
        if self.status == ApplicationStatus::Submitted {
            Ok(())
        } else {
            Err(DomainError::rule(
                "Only a 'submitted' application can be subject to an approval decision.",
            ))
        }
    }

    /// approval_rejected -> submitted
    pub fn unreject(&mut self, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        if self.status != ApplicationStatus::ApprovalRejected {
            return Err(DomainError::rule(format!(
                "Application '{}' is not in approval_rejected state",
                self.id
            )));
        }
        self.transition(ApplicationStatus::Submitted, now)?;
        Ok(DomainEvent::ApplicationUnrejected {
            application_id: self.id,
        })
    }

    /// submitted -> saved, so the applicant can make changes
    pub fn revert(&mut self, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        if self.status != ApplicationStatus::Submitted {
            return Err(DomainError::rule(format!(
                "Application '{}' is not in submitted state for reverting",
                self.id
            )));
        }
        self.transition(ApplicationStatus::Saved, now)?;
        Ok(DomainEvent::ApplicationReverted {
            application_id: self.id,
        })
    }

    /// Marks the application deleted; approved applications are kept
    pub fn delete(&mut self, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        self.transition(ApplicationStatus::Deleted, now)?;
        Ok(DomainEvent::ApplicationDeleted {
            application_id: self.id,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn kind(&self) -> ApplicationKind {
        self.kind
    }

    pub fn supplier_id(&self) -> Option<Uuid> {
        self.supplier_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// Summary used in listings and audit payloads
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.data.get("name"),
            "status": self.status,
            "type": self.kind,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        data: Value,
        status: ApplicationStatus,
        kind: ApplicationKind,
        supplier_id: Option<Uuid>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            data,
            status,
            kind,
            supplier_id,
            created_at,
            updated_at,
            submitted_at,
        }
    }
}
