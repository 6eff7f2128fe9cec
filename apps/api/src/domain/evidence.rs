use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::brief::{Brief, BriefStatus};
use super::errors::{DomainError, DomainResult};
use super::events::DomainEvent;
use super::framework::Domain;
use super::supplier::Supplier;
use super::user::User;
use super::validation::{is_blank, normalise_document, reason, FieldErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStatus {
    Draft,
    Submitted,
    Assessed,
    Rejected,
}

impl std::fmt::Display for EvidenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceStatus::Draft => write!(f, "draft"),
            EvidenceStatus::Submitted => write!(f, "submitted"),
            EvidenceStatus::Assessed => write!(f, "assessed"),
            EvidenceStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assessment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Approved,
    Rejected,
}

/// An assessor's decision on a piece of evidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceAssessment {
    pub id: Uuid,
    pub evidence_id: Uuid,
    pub user_id: Uuid,
    pub status: AssessmentStatus,
    /// Criteria id to feedback for each criterion that was not met
    pub failed_criteria: Value,
    pub vfm: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentDecision {
    Approve {
        failed_criteria: Option<Map<String, Value>>,
    },
    Reject {
        failed_criteria: Map<String, Value>,
        vfm: Option<bool>,
    },
}

/// What a supplier sees about a rejected submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFeedback {
    pub evidence_id: Uuid,
    pub domain_id: Uuid,
    pub failed_criteria: Value,
    pub vfm: Option<bool>,
    pub rejected_at: Option<DateTime<Utc>>,
}

const SERVER_OWNED_KEYS: &[&str] = &[
    "id",
    "domainId",
    "supplierId",
    "briefId",
    "status",
    "submittedAt",
    "approvedAt",
    "rejectedAt",
];

/// Evidence a supplier submits to be assessed in a domain
///
/// # Invariants
/// - Only drafts are edited
/// - Approval and rejection each happen once and only from submitted
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    id: Uuid,
    domain_id: Uuid,
    supplier_id: Uuid,
    user_id: Uuid,
    brief_id: Option<Uuid>,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
}

impl Evidence {
    /// Starts a new evidence draft for a supplier in a domain
    ///
    /// # Arguments
    /// * `latest` - the supplier's most recent evidence in this domain, if any
    /// * `brief` - the opportunity that prompted the assessment, if any
    ///
    /// # Business Rules
    /// - Recruiter-only suppliers cannot be assessed
    /// - A supplier already assessed in the domain cannot start again
    /// - Only one draft or submitted evidence per domain at a time
    /// - A linked opportunity must be live
    /// - After a rejection the new draft starts from the rejected data,
    ///   otherwise `maxDailyRate` is prefilled from the supplier's pricing
    pub fn start(
        domain: &Domain,
        supplier: &Supplier,
        user_id: Uuid,
        brief: Option<&Brief>,
        latest: Option<&Evidence>,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, DomainEvent)> {
        if supplier.is_recruiter_only() {
            return Err(DomainError::rule(
                "Assessment can't be started against a recruiter only supplier",
            ));
        }
        if supplier.is_assessed_for(domain.id) {
            return Err(DomainError::rule(
                "This supplier is already assessed for this domain",
            ));
        }
        if let Some(latest) = latest {
            if matches!(latest.status(), EvidenceStatus::Draft | EvidenceStatus::Submitted) {
                return Err(DomainError::rule(
                    "This supplier already has a draft assessment or is awaiting assessment for this domain",
                ));
            }
        }
        if let Some(brief) = brief {
            if brief.status_at(now) != BriefStatus::Live {
                return Err(DomainError::rule(
                    "Opportunity id does not exist or is not open for responses",
                ));
            }
        }

        let data = match latest {
            Some(previous) if previous.status() == EvidenceStatus::Rejected => previous.data.clone(),
            _ => match supplier.max_price_for(&domain.name) {
                Some(price) => json!({ "maxDailyRate": price_to_int(price) }),
                None => json!({}),
            },
        };

        let evidence = Self {
            id: Uuid::new_v4(),
            domain_id: domain.id,
            supplier_id: supplier.id,
            user_id,
            brief_id: brief.map(Brief::id),
            data,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
        };
        let event = DomainEvent::EvidenceCreated {
            evidence_id: evidence.id,
            domain_id: domain.id,
            supplier_id: supplier.id,
        };
        Ok((evidence, event))
    }

    pub fn status(&self) -> EvidenceStatus {
        if self.submitted_at.is_none() {
            EvidenceStatus::Draft
        } else if self.rejected_at.is_some() {
            EvidenceStatus::Rejected
        } else if self.approved_at.is_some() {
            EvidenceStatus::Assessed
        } else {
            EvidenceStatus::Submitted
        }
    }

    /// Replaces the draft data, submitting it when `publish` is set
    ///
    /// `maxDailyRate` is coerced to a whole number; unparseable rates become 0.
    pub fn update(&mut self, data: Value, publish: bool, now: DateTime<Utc>) -> DomainResult<Vec<DomainEvent>> {
        if self.status() != EvidenceStatus::Draft {
            return Err(DomainError::rule("Only draft submissions can be edited"));
        }

        let mut data = normalise_document(data, SERVER_OWNED_KEYS);
        if let Some(map) = data.as_object_mut() {
            if let Some(rate) = map.get("maxDailyRate") {
                let rate = coerce_rate(rate);
                map.insert("maxDailyRate".to_string(), json!(rate));
            }
        }

        if publish {
            let errors = submission_errors(&data);
            if !errors.is_empty() {
                return Err(DomainError::Validation(errors));
            }
        }

        self.data = data;
        self.updated_at = now;

        let mut events = vec![DomainEvent::EvidenceUpdated {
            evidence_id: self.id,
        }];
        if publish {
            events.push(self.submit(now));
        }
        Ok(events)
    }

    /// Marks the evidence submitted, clearing any earlier decision
    fn submit(&mut self, now: DateTime<Utc>) -> DomainEvent {
        self.submitted_at = Some(now);
        self.approved_at = None;
        self.rejected_at = None;
        DomainEvent::EvidenceSubmitted {
            evidence_id: self.id,
            domain_id: self.domain_id,
        }
    }

    /// Records an assessor's decision
    ///
    /// # Business Rules
    /// - Only admins and assessors can assess
    /// - Evidence must be submitted and not yet decided
    pub fn assess(
        &mut self,
        assessor: &User,
        decision: AssessmentDecision,
        now: DateTime<Utc>,
    ) -> DomainResult<(EvidenceAssessment, DomainEvent)> {
        if !assessor.role.can_assess() {
            return Err(DomainError::forbidden(
                "Only admins and assessors can assess evidence",
            ));
        }
        if self.status() != EvidenceStatus::Submitted {
            return Err(DomainError::rule("Evidence id is invalid or is not submitted"));
        }

        let (status, failed_criteria, vfm) = match decision {
            AssessmentDecision::Approve { failed_criteria } => (
                AssessmentStatus::Approved,
                Value::Object(failed_criteria.unwrap_or_default()),
                None,
            ),
            AssessmentDecision::Reject {
                failed_criteria,
                vfm,
            } => (AssessmentStatus::Rejected, Value::Object(failed_criteria), vfm),
        };

        let assessment = EvidenceAssessment {
            id: Uuid::new_v4(),
            evidence_id: self.id,
            user_id: assessor.id,
            status,
            failed_criteria,
            vfm,
            created_at: now,
        };

        self.updated_at = now;
        let event = match status {
            AssessmentStatus::Approved => {
                self.approved_at = Some(now);
                DomainEvent::EvidenceApproved {
                    evidence_id: self.id,
                    assessment_id: assessment.id,
                }
            }
            AssessmentStatus::Rejected => {
                self.rejected_at = Some(now);
                DomainEvent::EvidenceRejected {
                    evidence_id: self.id,
                    assessment_id: assessment.id,
                }
            }
        };

        Ok((assessment, event))
    }

    /// Feedback for a rejected submission
    pub fn feedback(&self, assessment: Option<&EvidenceAssessment>) -> DomainResult<EvidenceFeedback> {
        if self.status() != EvidenceStatus::Rejected {
            return Err(DomainError::rule(
                "Only rejected submissions can contain feedback",
            ));
        }

        Ok(EvidenceFeedback {
            evidence_id: self.id,
            domain_id: self.domain_id,
            failed_criteria: assessment
                .map(|a| a.failed_criteria.clone())
                .unwrap_or_else(|| json!({})),
            vfm: assessment.and_then(|a| a.vfm),
            rejected_at: self.rejected_at,
        })
    }

    /// Checks that the evidence is a draft that can be deleted
    pub fn delete_draft(&self) -> DomainResult<DomainEvent> {
        if self.status() != EvidenceStatus::Draft {
            return Err(DomainError::rule("Only draft submissions can be deleted"));
        }
        Ok(DomainEvent::EvidenceDraftDeleted {
            evidence_id: self.id,
        })
    }

    pub fn max_daily_rate(&self) -> Option<Decimal> {
        self.data
            .get("maxDailyRate")
            .and_then(Value::as_i64)
            .filter(|rate| *rate > 0)
            .map(Decimal::from)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn domain_id(&self) -> Uuid {
        self.domain_id
    }

    pub fn supplier_id(&self) -> Uuid {
        self.supplier_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn brief_id(&self) -> Option<Uuid> {
        self.brief_id
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

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        domain_id: Uuid,
        supplier_id: Uuid,
        user_id: Uuid,
        brief_id: Option<Uuid>,
        data: Value,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        submitted_at: Option<DateTime<Utc>>,
        approved_at: Option<DateTime<Utc>>,
        rejected_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            domain_id,
            supplier_id,
            user_id,
            brief_id,
            data,
            created_at,
            updated_at,
            submitted_at,
            approved_at,
            rejected_at,
        }
    }
}

fn price_to_int(price: Decimal) -> i64 {
    price.trunc().to_string().parse().unwrap_or(0)
}

fn coerce_rate(rate: &Value) -> i64 {
    match rate {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f as i64)
            .unwrap_or(0),
        _ => 0,
    }
}

/// Answers missing before evidence can be submitted
///
/// Needs a positive `maxDailyRate`, at least one criterion in `criteria`
/// and a non-empty response in `evidence` for each chosen criterion.
pub fn submission_errors(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if data.get("maxDailyRate").and_then(Value::as_i64).unwrap_or(0) <= 0 {
        errors.add("maxDailyRate", reason::ANSWER_REQUIRED);
    }

    let criteria: Vec<String> = data
        .get("criteria")
        .and_then(Value::as_array)
        .map(|c| {
            c.iter()
                .map(|id| match id {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    if criteria.is_empty() {
        errors.add("criteria", reason::ANSWER_REQUIRED);
    }

    for id in criteria {
        let answer = data.get("evidence").and_then(|e| e.get(&id));
        if is_blank(answer.and_then(|a| a.get("response")).or(answer)) {
            errors.add(format!("evidence.{id}"), reason::ANSWER_REQUIRED);
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::supplier::SupplierStatus;
    use crate::domain::user::{Email, UserRole};

    fn domain() -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: "Cyber security".to_string(),
        }
    }

    fn supplier(recruiter: &str) -> Supplier {
        Supplier {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            status: SupplierStatus::Complete,
            data: json!({
                "recruiter": recruiter,
                "pricing": { "Cyber security": { "maxPrice": "1100" } }
            }),
            domains: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn user(role: UserRole) -> User {
        User::new(
            Email::new("someone@digital.gov.au").unwrap(),
            "hash".to_string(),
            "Someone".to_string(),
            role,
        )
    }

    fn answers() -> Value {
        json!({
            "maxDailyRate": "1200",
            "criteria": ["1", "2"],
            "evidence": {
                "1": { "response": "We did it" },
                "2": { "response": "Twice" }
            }
        })
    }

    fn submitted(domain: &Domain, supplier: &Supplier) -> Evidence {
        let (mut evidence, _) =
            Evidence::start(domain, supplier, Uuid::new_v4(), None, None, Utc::now()).unwrap();
        evidence.update(answers(), true, Utc::now()).unwrap();
        evidence
    }

    #[test]
    fn start_prefills_rate_from_pricing() {
        let (evidence, _) =
            Evidence::start(&domain(), &supplier("no"), Uuid::new_v4(), None, None, Utc::now())
                .unwrap();

        assert_eq!(evidence.status(), EvidenceStatus::Draft);
        assert_eq!(evidence.data()["maxDailyRate"], 1100);
    }

    #[test]
    fn recruiter_only_cannot_start() {
        let err = Evidence::start(&domain(), &supplier("yes"), Uuid::new_v4(), None, None, Utc::now())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Assessment can't be started against a recruiter only supplier"
        );
    }

    #[test]
    fn already_assessed_cannot_start() {
        let d = domain();
        let mut s = supplier("both");
        s.record_domain_approval(&d, None);

        let err = Evidence::start(&d, &s, Uuid::new_v4(), None, None, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "This supplier is already assessed for this domain");
    }

    #[test]
    fn open_evidence_blocks_a_new_one() {
        let d = domain();
        let s = supplier("no");
        let open = submitted(&d, &s);

        let err = Evidence::start(&d, &s, Uuid::new_v4(), None, Some(&open), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("already has a draft assessment"));
    }

    #[test]
    fn restart_after_rejection_copies_data() {
        let d = domain();
        let s = supplier("no");
        let mut rejected = submitted(&d, &s);
        rejected
            .assess(
                &user(UserRole::Assessor),
                AssessmentDecision::Reject {
                    failed_criteria: Map::new(),
                    vfm: Some(false),
                },
                Utc::now(),
            )
            .unwrap();

        let (next, _) =
            Evidence::start(&d, &s, Uuid::new_v4(), None, Some(&rejected), Utc::now()).unwrap();

        assert_eq!(next.data(), rejected.data());
        assert_eq!(next.status(), EvidenceStatus::Draft);
    }

    #[test]
    fn update_coerces_rate_and_submits() {
        let (mut evidence, _) =
            Evidence::start(&domain(), &supplier("no"), Uuid::new_v4(), None, None, Utc::now())
                .unwrap();

        let events = evidence.update(answers(), true, Utc::now()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(evidence.data()["maxDailyRate"], 1200);
        assert_eq!(evidence.status(), EvidenceStatus::Submitted);
        assert_eq!(evidence.max_daily_rate(), Some(Decimal::from(1200)));
    }

    #[test]
    fn invalid_rate_becomes_zero_and_blocks_submission() {
        let (mut evidence, _) =
            Evidence::start(&domain(), &supplier("no"), Uuid::new_v4(), None, None, Utc::now())
                .unwrap();
        let mut data = answers();
        data["maxDailyRate"] = json!("lots");

        assert!(evidence.update(data.clone(), true, Utc::now()).is_err());
        evidence.update(data, false, Utc::now()).unwrap();
        assert_eq!(evidence.data()["maxDailyRate"], 0);
    }

    #[test]
    fn missing_criterion_answer() {
        let mut data = answers();
        data["evidence"]["2"] = json!({ "response": "" });

        let errors = submission_errors(&data);
        assert_eq!(errors.get("evidence.2"), Some(reason::ANSWER_REQUIRED));
    }

    #[test]
    fn only_drafts_edited() {
        let mut evidence = submitted(&domain(), &supplier("no"));
        let err = evidence.update(answers(), false, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Only draft submissions can be edited");
    }

    #[test]
    fn approve_once_by_assessor() {
        let mut evidence = submitted(&domain(), &supplier("no"));

        let err = evidence
            .assess(
                &user(UserRole::Buyer),
                AssessmentDecision::Approve {
                    failed_criteria: None,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let (assessment, _) = evidence
            .assess(
                &user(UserRole::Admin),
                AssessmentDecision::Approve {
                    failed_criteria: None,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(assessment.status, AssessmentStatus::Approved);
        assert_eq!(evidence.status(), EvidenceStatus::Assessed);

        let again = evidence.assess(
            &user(UserRole::Admin),
            AssessmentDecision::Approve {
                failed_criteria: None,
            },
            Utc::now(),
        );
        assert!(again.is_err());
    }

    #[test]
    fn draft_cannot_be_assessed() {
        let (mut evidence, _) =
            Evidence::start(&domain(), &supplier("no"), Uuid::new_v4(), None, None, Utc::now())
                .unwrap();
        let err = evidence
            .assess(
                &user(UserRole::Assessor),
                AssessmentDecision::Reject {
                    failed_criteria: Map::new(),
                    vfm: None,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Evidence id is invalid or is not submitted");
    }

    #[test]
    fn feedback_only_for_rejected() {
        let mut evidence = submitted(&domain(), &supplier("no"));
        assert!(evidence.feedback(None).is_err());

        let mut failed = Map::new();
        failed.insert("1".to_string(), json!({ "reason": "Not enough detail" }));
        let (assessment, _) = evidence
            .assess(
                &user(UserRole::Assessor),
                AssessmentDecision::Reject {
                    failed_criteria: failed,
                    vfm: Some(true),
                },
                Utc::now(),
            )
            .unwrap();

        let feedback = evidence.feedback(Some(&assessment)).unwrap();
        assert_eq!(feedback.failed_criteria["1"]["reason"], "Not enough detail");
        assert_eq!(feedback.vfm, Some(true));
    }

    #[test]
    fn only_drafts_deleted() {
        let (draft, _) =
            Evidence::start(&domain(), &supplier("no"), Uuid::new_v4(), None, None, Utc::now())
                .unwrap();
        assert!(draft.delete_draft().is_ok());
        assert!(submitted(&domain(), &supplier("no")).delete_draft().is_err());
    }
}
