use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::errors::{DomainError, DomainResult};
use super::events::DomainEvent;
use super::framework::Lot;
use super::user::Email;
use super::validation::{is_blank, normalise_document, reason, FieldErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Draft,
    Submitted,
    Withdrawn,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStatus::Draft => write!(f, "draft"),
            ResponseStatus::Submitted => write!(f, "submitted"),
            ResponseStatus::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

const SERVER_OWNED_KEYS: &[&str] = &[
    "id",
    "briefId",
    "supplierId",
    "supplierName",
    "status",
    "createdAt",
    "updatedAt",
    "submittedAt",
    "withdrawnAt",
];

/// A supplier's response to an opportunity
///
/// # Invariants
/// - Once withdrawn a response is never edited or un-withdrawn
/// - `submitted_at` is set once
#[derive(Debug, Clone, PartialEq)]
pub struct BriefResponse {
    id: Uuid,
    brief_id: Uuid,
    supplier_id: Uuid,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    withdrawn_at: Option<DateTime<Utc>>,
}

impl BriefResponse {
    /// Starts an empty draft; eligibility is checked by the caller
    pub fn create(brief_id: Uuid, supplier_id: Uuid, now: DateTime<Utc>) -> (Self, DomainEvent) {
        let response = Self {
            id: Uuid::new_v4(),
            brief_id,
            supplier_id,
            data: json!({}),
            created_at: now,
            updated_at: now,
            submitted_at: None,
            withdrawn_at: None,
        };
        let event = DomainEvent::ResponseCreated {
            response_id: response.id,
            brief_id,
            supplier_id,
        };
        (response, event)
    }

    pub fn status(&self) -> ResponseStatus {
        if self.withdrawn_at.is_some() {
            ResponseStatus::Withdrawn
        } else if self.submitted_at.is_some() {
            ResponseStatus::Submitted
        } else {
            ResponseStatus::Draft
        }
    }

    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn_at.is_some()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some() && self.withdrawn_at.is_none()
    }

    /// Replaces the response data and optionally submits it
    ///
    /// # Business Rules
    /// - Withdrawn responses cannot be edited
    /// - Submitting requires the answers the lot asks for
    /// - A submitted response stays submitted when edited again
    pub fn update(
        &mut self,
        lot: Lot,
        data: Value,
        submit: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<DomainEvent> {
        if self.is_withdrawn() {
            return Err(DomainError::rule(format!(
                "Opportunity response with id \"{}\" has been withdrawn",
                self.id
            )));
        }

        let data = normalise_document(data, SERVER_OWNED_KEYS);
        if submit || self.is_submitted() {
            let errors = submission_errors(lot, &data);
            if !errors.is_empty() {
                return Err(DomainError::Validation(errors));
            }
        }

        self.data = data;
        self.updated_at = now;

        if submit && self.submitted_at.is_none() {
            self.submitted_at = Some(now);
            return Ok(DomainEvent::ResponseSubmitted {
                response_id: self.id,
                brief_id: self.brief_id,
            });
        }

        Ok(DomainEvent::ResponseUpdated {
            response_id: self.id,
            brief_id: self.brief_id,
        })
    }

    /// Withdraws the response; only once
    pub fn withdraw(&mut self, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        if self.is_withdrawn() {
            return Err(DomainError::rule(format!(
                "Opportunity response with id \"{}\" is already withdrawn",
                self.id
            )));
        }

        let previously_submitted = self.submitted_at.is_some();
        self.withdrawn_at = Some(now);
        self.updated_at = now;

        Ok(DomainEvent::ResponseWithdrawn {
            response_id: self.id,
            brief_id: self.brief_id,
            previously_submitted,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn brief_id(&self) -> Uuid {
        self.brief_id
    }

    pub fn supplier_id(&self) -> Uuid {
        self.supplier_id
    }

    pub fn data(&self) -> &Value {
        &self.data
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

    pub fn withdrawn_at(&self) -> Option<DateTime<Utc>> {
        self.withdrawn_at
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        brief_id: Uuid,
        supplier_id: Uuid,
        data: Value,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        submitted_at: Option<DateTime<Utc>>,
        withdrawn_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            brief_id,
            supplier_id,
            data,
            created_at,
            updated_at,
            submitted_at,
            withdrawn_at,
        }
    }
}

fn required_for(lot: Lot) -> &'static [&'static str] {
    match lot {
        Lot::Specialist => &[
            "specialistGivenNames",
            "specialistSurname",
            "availability",
            "visaStatus",
            "securityClearance",
            "previouslyWorked",
            "essentialRequirements",
        ],
        Lot::Atm => &["availability", "criteria"],
        Lot::Rfx | Lot::Training2 => &["writtenProposal"],
    }
}

/// Answers missing from a response before it can be submitted
pub fn submission_errors(lot: Lot, data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();

    match data.get("respondToEmailAddress").and_then(Value::as_str) {
        Some(email) if Email::is_valid(&email.to_lowercase()) => {}
        Some(_) => errors.add("respondToEmailAddress", reason::INVALID_EMAIL),
        None => errors.add("respondToEmailAddress", reason::ANSWER_REQUIRED),
    }

    for field in required_for(lot) {
        if is_blank(data.get(*field)) {
            errors.add(*field, reason::ANSWER_REQUIRED);
        }
    }

    if lot == Lot::Specialist && is_blank(data.get("dayRate")) && is_blank(data.get("hourRate")) {
        errors.add("dayRate", reason::ANSWER_REQUIRED);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atm_answers() -> Value {
        json!({
            "respondToEmailAddress": "bids@seller.com",
            "availability": "Next week",
            "criteria": { "Experience": "Lots" }
        })
    }

    fn new_response() -> BriefResponse {
        BriefResponse::create(Uuid::new_v4(), Uuid::new_v4(), Utc::now()).0
    }

    #[test]
    fn new_response_is_draft() {
        assert_eq!(new_response().status(), ResponseStatus::Draft);
    }

    #[test]
    fn saving_without_submit_skips_required_checks() {
        let mut response = new_response();
        let event = response
            .update(Lot::Atm, json!({ "availability": "soon" }), false, Utc::now())
            .unwrap();

        assert!(matches!(event, DomainEvent::ResponseUpdated { .. }));
        assert_eq!(response.status(), ResponseStatus::Draft);
    }

    #[test]
    fn submit_requires_answers() {
        let mut response = new_response();
        let err = response
            .update(Lot::Atm, json!({}), true, Utc::now())
            .unwrap_err();

        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.get("respondToEmailAddress"), Some(reason::ANSWER_REQUIRED));
                assert_eq!(errors.get("criteria"), Some(reason::ANSWER_REQUIRED));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(response.submitted_at().is_none());
    }

    #[test]
    fn submit_sets_submitted_once() {
        let mut response = new_response();
        let first = Utc::now();
        let event = response.update(Lot::Atm, atm_answers(), true, first).unwrap();
        assert!(matches!(event, DomainEvent::ResponseSubmitted { .. }));

        response
            .update(Lot::Atm, atm_answers(), true, first + chrono::Duration::hours(1))
            .unwrap();

        assert_eq!(response.submitted_at(), Some(first));
        assert_eq!(response.status(), ResponseStatus::Submitted);
    }

    #[test]
    fn submitted_response_edits_are_revalidated() {
        let mut response = new_response();
        response.update(Lot::Atm, atm_answers(), true, Utc::now()).unwrap();

        assert!(response
            .update(Lot::Atm, json!({ "availability": "x" }), false, Utc::now())
            .is_err());
    }

    #[test]
    fn specialist_needs_a_rate() {
        let data = json!({
            "respondToEmailAddress": "bids@seller.com",
            "specialistGivenNames": "Grace",
            "specialistSurname": "Hopper",
            "availability": "Now",
            "visaStatus": "Citizen",
            "securityClearance": "Baseline",
            "previouslyWorked": "No",
            "essentialRequirements": { "Rust": "Yes" }
        });

        let errors = submission_errors(Lot::Specialist, &data);
        assert_eq!(errors.get("dayRate"), Some(reason::ANSWER_REQUIRED));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn withdraw_only_once() {
        let mut response = new_response();
        response.update(Lot::Atm, atm_answers(), true, Utc::now()).unwrap();

        let event = response.withdraw(Utc::now()).unwrap();
        assert!(matches!(
            event,
            DomainEvent::ResponseWithdrawn {
                previously_submitted: true,
                ..
            }
        ));

        let err = response.withdraw(Utc::now()).unwrap_err();
        assert!(err.to_string().contains("is already withdrawn"));
        assert_eq!(response.status(), ResponseStatus::Withdrawn);
    }

    #[test]
    fn withdrawn_response_cannot_be_edited() {
        let mut response = new_response();
        response.withdraw(Utc::now()).unwrap();

        assert!(response
            .update(Lot::Atm, atm_answers(), true, Utc::now())
            .is_err());
        assert!(response.submitted_at().is_none());
    }
}
