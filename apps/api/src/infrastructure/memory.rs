use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::application::{Application, ApplicationStatus};
use crate::domain::audit::{AuditEvent, AuditFilter};
use crate::domain::brief::{Brief, BriefHistory};
use crate::domain::brief_response::BriefResponse;
use crate::domain::evidence::{Evidence, EvidenceAssessment};
use crate::domain::framework::{Domain, Framework};
use crate::domain::repositories::{
    ApplicationRepository, AuditRepository, BriefRepository, BriefResponseRepository,
    CatalogueRepository, ClaimAttempt, EvidenceRepository, RepositoryError, RepositoryResult,
    SupplierRepository, TeamRepository, UserClaimRepository, UserRepository,
};
use crate::domain::supplier::Supplier;
use crate::domain::team::value_objects::TeamStatus;
use crate::domain::team::Team;
use crate::domain::user::{Email, User};
use crate::domain::user_claim::{ClaimType, UserClaim};
use crate::services::Repositories;

#[derive(Default)]
struct State {
    frameworks: HashMap<Uuid, Framework>,
    domains: HashMap<Uuid, Domain>,
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    briefs: HashMap<Uuid, Brief>,
    history: Vec<BriefHistory>,
    responses: HashMap<Uuid, BriefResponse>,
    suppliers: HashMap<Uuid, Supplier>,
    applications: HashMap<Uuid, Application>,
    evidence: HashMap<Uuid, Evidence>,
    assessments: Vec<EvidenceAssessment>,
    claims: HashMap<Uuid, UserClaim>,
    audit: Vec<AuditEvent>,
}

/// Process-local storage implementing every repository port
///
/// One lock guards all tables, so multi-aggregate writes are atomic
/// the same way a Postgres transaction makes them.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every port backed by this store
    pub fn repositories(&self) -> Repositories {
        Repositories {
            applications: Arc::new(self.clone()),
            audit: Arc::new(self.clone()),
            briefs: Arc::new(self.clone()),
            responses: Arc::new(self.clone()),
            catalogue: Arc::new(self.clone()),
            evidence: Arc::new(self.clone()),
            suppliers: Arc::new(self.clone()),
            teams: Arc::new(self.clone()),
            claims: Arc::new(self.clone()),
            users: Arc::new(self.clone()),
        }
    }

    /// Adds reference data that only migrations write in Postgres
    pub async fn insert_framework(&self, framework: Framework) {
        self.state
            .lock()
            .await
            .frameworks
            .insert(framework.id, framework);
    }

    pub async fn insert_domain(&self, domain: Domain) {
        self.state.lock().await.domains.insert(domain.id, domain);
    }
}

fn sorted_by_created<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl CatalogueRepository for InMemoryStore {
    async fn find_framework(&self, id: Uuid) -> RepositoryResult<Option<Framework>> {
        Ok(self.state.lock().await.frameworks.get(&id).cloned())
    }

    async fn find_framework_by_slug(&self, slug: &str) -> RepositoryResult<Option<Framework>> {
        let state = self.state.lock().await;
        Ok(state.frameworks.values().find(|f| f.slug == slug).cloned())
    }

    async fn find_domain(&self, id: Uuid) -> RepositoryResult<Option<Domain>> {
        Ok(self.state.lock().await.domains.get(&id).cloned())
    }

    async fn list_domains(&self) -> RepositoryResult<Vec<Domain>> {
        let state = self.state.lock().await;
        let mut domains: Vec<Domain> = state.domains.values().cloned().collect();
        domains.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(domains)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: &User, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(format!(
                "A user with email {} already exists",
                user.email.as_str()
            )));
        }
        state.users.insert(user.id, user.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn save(&self, user: &User) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| &u.email == email).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn find_by_application(&self, application_id: Uuid) -> RepositoryResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.application_id == Some(application_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn save(&self, team: &Team, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.teams.insert(team.id(), team.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Team>> {
        Ok(self.state.lock().await.teams.get(&id).cloned())
    }

    async fn teams_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Team>> {
        let state = self.state.lock().await;
        let teams = state
            .teams
            .values()
            .filter(|t| t.status() != TeamStatus::Deleted && t.is_member(user_id))
            .cloned()
            .collect();
        Ok(sorted_by_created(teams, |t: &Team| t.created_at()))
    }
}

#[async_trait]
impl BriefRepository for InMemoryStore {
    async fn save(&self, brief: &Brief, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.briefs.insert(brief.id(), brief.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Brief>> {
        Ok(self.state.lock().await.briefs.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.briefs.remove(&id).ok_or(RepositoryError::NotFound)?;
        state.history.retain(|h| h.brief_id != id);
        state.responses.retain(|_, r| r.brief_id() != id);
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn save_edit(
        &self,
        brief: &Brief,
        history: &BriefHistory,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.history.push(history.clone());
        state.briefs.insert(brief.id(), brief.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn history(&self, brief_id: Uuid) -> RepositoryResult<Vec<BriefHistory>> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|h| h.brief_id == brief_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BriefResponseRepository for InMemoryStore {
    async fn save(&self, response: &BriefResponse, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.responses.insert(response.id(), response.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn create_within_limit(
        &self,
        response: &BriefResponse,
        limit: usize,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        if !state.briefs.contains_key(&response.brief_id()) {
            return Err(RepositoryError::NotFound);
        }

        let active = state
            .responses
            .values()
            .filter(|r| {
                r.brief_id() == response.brief_id()
                    && r.supplier_id() == response.supplier_id()
                    && !r.is_withdrawn()
            })
            .count();
        if active >= limit {
            return Err(RepositoryError::Conflict(
                "You have already responded to this opportunity".to_string(),
            ));
        }

        state.responses.insert(response.id(), response.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<BriefResponse>> {
        Ok(self.state.lock().await.responses.get(&id).cloned())
    }

    async fn for_brief(&self, brief_id: Uuid) -> RepositoryResult<Vec<BriefResponse>> {
        let state = self.state.lock().await;
        let responses = state
            .responses
            .values()
            .filter(|r| r.brief_id() == brief_id)
            .cloned()
            .collect();
        Ok(sorted_by_created(responses, |r: &BriefResponse| r.created_at()))
    }

    async fn for_brief_and_supplier(
        &self,
        brief_id: Uuid,
        supplier_id: Uuid,
    ) -> RepositoryResult<Vec<BriefResponse>> {
        let state = self.state.lock().await;
        let responses = state
            .responses
            .values()
            .filter(|r| r.brief_id() == brief_id && r.supplier_id() == supplier_id)
            .cloned()
            .collect();
        Ok(sorted_by_created(responses, |r: &BriefResponse| r.created_at()))
    }
}

#[async_trait]
impl SupplierRepository for InMemoryStore {
    async fn save(&self, supplier: &Supplier) -> RepositoryResult<()> {
        self.state
            .lock()
            .await
            .suppliers
            .insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Supplier>> {
        Ok(self.state.lock().await.suppliers.get(&id).cloned())
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryStore {
    async fn save(&self, application: &Application, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state
            .applications
            .insert(application.id(), application.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Application>> {
        Ok(self.state.lock().await.applications.get(&id).cloned())
    }

    async fn record_approval(
        &self,
        application: &Application,
        supplier: &Supplier,
        users: &[User],
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        match state.applications.get(&application.id()).map(Application::status) {
            None => return Err(RepositoryError::NotFound),
            Some(ApplicationStatus::Submitted) => {}
            Some(_) => {
                return Err(RepositoryError::Conflict(
                    "Application is no longer awaiting assessment".to_string(),
                ))
            }
        }
        if users.iter().any(|u| !state.users.contains_key(&u.id)) {
            return Err(RepositoryError::NotFound);
        }

        state.suppliers.insert(supplier.id, supplier.clone());
        state
            .applications
            .insert(application.id(), application.clone());
        for user in users {
            state.users.insert(user.id, user.clone());
        }
        state.audit.extend_from_slice(audit);
        Ok(())
    }
}

#[async_trait]
impl EvidenceRepository for InMemoryStore {
    async fn save(&self, evidence: &Evidence, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.evidence.insert(evidence.id(), evidence.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Evidence>> {
        Ok(self.state.lock().await.evidence.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.evidence.remove(&id).ok_or(RepositoryError::NotFound)?;
        state.assessments.retain(|a| a.evidence_id != id);
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn for_supplier_domain(
        &self,
        supplier_id: Uuid,
        domain_id: Uuid,
    ) -> RepositoryResult<Vec<Evidence>> {
        let state = self.state.lock().await;
        let evidence = state
            .evidence
            .values()
            .filter(|e| e.supplier_id() == supplier_id && e.domain_id() == domain_id)
            .cloned()
            .collect();
        let mut evidence = sorted_by_created(evidence, |e: &Evidence| e.created_at());
        evidence.reverse();
        Ok(evidence)
    }

    async fn latest_assessment(
        &self,
        evidence_id: Uuid,
    ) -> RepositoryResult<Option<EvidenceAssessment>> {
        let state = self.state.lock().await;
        Ok(state
            .assessments
            .iter()
            .rev()
            .find(|a| a.evidence_id == evidence_id)
            .cloned())
    }

    async fn record_assessment(
        &self,
        evidence: &Evidence,
        assessment: &EvidenceAssessment,
        supplier: Option<&Supplier>,
        audit: &[AuditEvent],
    ) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.evidence.insert(evidence.id(), evidence.clone());
        state.assessments.push(assessment.clone());
        if let Some(supplier) = supplier {
            state.suppliers.insert(supplier.id, supplier.clone());
        }
        state.audit.extend_from_slice(audit);
        Ok(())
    }
}

#[async_trait]
impl UserClaimRepository for InMemoryStore {
    async fn create(&self, claim: &UserClaim, audit: &[AuditEvent]) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        if state.claims.values().any(|c| c.token() == claim.token()) {
            return Err(RepositoryError::Conflict("Claim token already exists".to_string()));
        }
        state.claims.insert(claim.id(), claim.clone());
        state.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn claim(
        &self,
        claim_type: ClaimType,
        token: &str,
        email_address: &Email,
        max_age: Option<Duration>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<ClaimAttempt> {
        let mut state = self.state.lock().await;
        let Some(claim) = state.claims.values_mut().find(|c| {
            c.claim_type() == claim_type && c.token() == token && c.email_address() == email_address
        }) else {
            return Ok(ClaimAttempt::NotFound);
        };

        match claim.claim(max_age, now) {
            Ok(event) => {
                let claimed = claim.clone();
                state.audit.push(event.into_audit(None));
                Ok(ClaimAttempt::Claimed(claimed))
            }
            Err(e) => Ok(ClaimAttempt::Rejected(e)),
        }
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn append(&self, event: &AuditEvent) -> RepositoryResult<()> {
        self.state.lock().await.audit.push(event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<AuditEvent>> {
        let state = self.state.lock().await;
        Ok(state.audit.iter().find(|e| e.id() == id).cloned())
    }

    async fn list(&self, filter: &AuditFilter) -> RepositoryResult<Vec<AuditEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn save_acknowledgement(&self, event: &AuditEvent) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .audit
            .iter_mut()
            .find(|e| e.id() == event.id())
            .ok_or(RepositoryError::NotFound)?;

        if let Some(by) = event.acknowledged_by() {
            if !stored.acknowledged() {
                let at = event.acknowledged_at().unwrap_or_else(Utc::now);
                stored
                    .acknowledge(by, at)
                    .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
            }
        }
        Ok(())
    }
}
