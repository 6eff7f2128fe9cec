use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{audit_entries, Repositories, ServiceError, ServiceResult};
use crate::domain::evidence::{
    AssessmentDecision, AssessmentStatus, Evidence, EvidenceFeedback, EvidenceStatus,
};
use crate::domain::framework::Domain;
use crate::domain::supplier::Supplier;
use crate::domain::user::User;

/// Evidence with the feedback from the previous rejected attempt, if any
#[derive(Debug, Clone)]
pub struct EvidenceView {
    pub evidence: Evidence,
    pub previous_feedback: Option<EvidenceFeedback>,
}

/// Domain assessment: suppliers submit evidence, assessors decide
pub struct EvidenceService<'a> {
    repos: &'a Repositories,
}

impl<'a> EvidenceService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    fn supplier_id(user: &User) -> ServiceResult<Uuid> {
        user.supplier_id
            .ok_or_else(|| ServiceError::unauthorised("Only suppliers can submit evidence"))
    }

    async fn domain(&self, id: Uuid) -> ServiceResult<Domain> {
        self.repos
            .catalogue
            .find_domain(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Domain does not exist"))
    }

    async fn supplier(&self, id: Uuid) -> ServiceResult<Supplier> {
        self.repos
            .suppliers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Supplier {} not found", id)))
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Evidence> {
        self.repos
            .evidence
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Evidence {} not found", id)))
    }

    /// Evidence belonging to the user's supplier; assessors and admins see everything
    async fn visible(&self, user: &User, id: Uuid) -> ServiceResult<Evidence> {
        let evidence = self.load(id).await?;
        if user.role.can_assess() || user.supplier_id == Some(evidence.supplier_id()) {
            Ok(evidence)
        } else {
            Err(ServiceError::not_found(format!("Evidence {} not found", id)))
        }
    }

    async fn owned(&self, user: &User, id: Uuid) -> ServiceResult<Evidence> {
        let supplier_id = Self::supplier_id(user)?;
        let evidence = self.load(id).await?;
        if evidence.supplier_id() == supplier_id {
            Ok(evidence)
        } else {
            Err(ServiceError::not_found(format!("Evidence {} not found", id)))
        }
    }

    /// Starts a draft in a domain, optionally linked to an opportunity
    pub async fn start(
        &self,
        user: &User,
        domain_id: Uuid,
        brief_id: Option<Uuid>,
    ) -> ServiceResult<Evidence> {
        let supplier_id = Self::supplier_id(user)?;
        let domain = self.domain(domain_id).await?;
        let supplier = self.supplier(supplier_id).await?;

        let latest = self
            .repos
            .evidence
            .for_supplier_domain(supplier_id, domain_id)
            .await?
            .into_iter()
            .next();
        let brief = match brief_id {
            Some(id) => Some(
                self.repos
                    .briefs
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Opportunity id does not exist or is not open for responses"))?,
            ),
            None => None,
        };

        let (evidence, event) = match Evidence::start(
            &domain,
            &supplier,
            user.id,
            brief.as_ref(),
            latest.as_ref(),
            Utc::now(),
        ) {
            Ok(started) => started,
            Err(e) => {
                tracing::warn!(%supplier_id, %domain_id, reason = %e, "Evidence refused");
                return Err(e.into());
            }
        };
        let audit = audit_entries(Some(user), [event]);
        self.repos.evidence.save(&evidence, &audit).await?;
        tracing::info!(evidence_id = %evidence.id(), %domain_id, "Evidence started");

        Ok(evidence)
    }

    /// Loads evidence, with the previous rejection's feedback for a fresh draft
    pub async fn get(&self, user: &User, id: Uuid) -> ServiceResult<EvidenceView> {
        let evidence = self.visible(user, id).await?;

        let previous_feedback = if evidence.status() == EvidenceStatus::Draft {
            let previous = self
                .repos
                .evidence
                .for_supplier_domain(evidence.supplier_id(), evidence.domain_id())
                .await?
                .into_iter()
                .find(|e| e.id() != evidence.id() && e.status() == EvidenceStatus::Rejected);
            match previous {
                Some(previous) => {
                    let assessment = self.repos.evidence.latest_assessment(previous.id()).await?;
                    Some(previous.feedback(assessment.as_ref())?)
                }
                None => None,
            }
        } else {
            None
        };

        Ok(EvidenceView {
            evidence,
            previous_feedback,
        })
    }

    /// Saves a draft, submitting it for assessment when `publish` is set
    pub async fn update(&self, user: &User, id: Uuid, data: Value, publish: bool) -> ServiceResult<Evidence> {
        let mut evidence = self.owned(user, id).await?;
        let events = evidence.update(data, publish, Utc::now())?;
        let audit = audit_entries(Some(user), events);
        self.repos.evidence.save(&evidence, &audit).await?;
        if publish {
            tracing::info!(evidence_id = %id, "Evidence submitted for assessment");
        }

        Ok(evidence)
    }

    pub async fn delete_draft(&self, user: &User, id: Uuid) -> ServiceResult<()> {
        let evidence = self.owned(user, id).await?;
        let event = evidence.delete_draft()?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.evidence.delete(id, &audit).await?;

        Ok(())
    }

    pub async fn feedback(&self, user: &User, id: Uuid) -> ServiceResult<EvidenceFeedback> {
        let evidence = self.visible(user, id).await?;
        let assessment = self.repos.evidence.latest_assessment(id).await?;
        Ok(evidence.feedback(assessment.as_ref())?)
    }

    /// Records an assessor's decision
    ///
    /// Approval marks the supplier assessed in the domain with the
    /// evidence's daily rate; both changes are written together.
    pub async fn assess(
        &self,
        user: &User,
        id: Uuid,
        decision: AssessmentDecision,
    ) -> ServiceResult<Evidence> {
        let mut evidence = self.load(id).await?;
        let (assessment, event) = evidence.assess(user, decision, Utc::now())?;

        let supplier = if assessment.status == AssessmentStatus::Approved {
            let domain = self.domain(evidence.domain_id()).await?;
            let mut supplier = self.supplier(evidence.supplier_id()).await?;
            supplier.record_domain_approval(&domain, evidence.max_daily_rate());
            Some(supplier)
        } else {
            None
        };

        let audit = audit_entries(Some(user), [event]);
        self.repos
            .evidence
            .record_assessment(&evidence, &assessment, supplier.as_ref(), &audit)
            .await?;
        tracing::info!(
            evidence_id = %id,
            status = ?assessment.status,
            assessor_id = %user.id,
            "Evidence assessed"
        );

        Ok(evidence)
    }
}
