use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::audit::AuditEvent;
use crate::domain::evidence::{Evidence, EvidenceAssessment};
use crate::domain::supplier::Supplier;

/// Repository trait for evidence and its assessments
#[async_trait]
pub trait EvidenceRepository: Send + Sync {
    /// Save evidence (insert or update)
    async fn save(&self, evidence: &Evidence, audit: &[AuditEvent]) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Evidence>>;

    async fn delete(&self, id: Uuid, audit: &[AuditEvent]) -> RepositoryResult<()>;

    /// A supplier's evidence in a domain, newest first
    async fn for_supplier_domain(
        &self,
        supplier_id: Uuid,
        domain_id: Uuid,
    ) -> RepositoryResult<Vec<Evidence>>;

    /// The most recent assessment of a piece of evidence
    async fn latest_assessment(&self, evidence_id: Uuid)
        -> RepositoryResult<Option<EvidenceAssessment>>;

    /// Persists an assessment in one transaction
    ///
    /// `supplier` is given when an approval changed the supplier's domains or pricing.
    async fn record_assessment(
        &self,
        evidence: &Evidence,
        assessment: &EvidenceAssessment,
        supplier: Option<&Supplier>,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()>;
}
