use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{audit_entries, Repositories, ServiceError, ServiceResult};
use crate::domain::application::ApplicationStatus;
use crate::domain::brief::{Brief, BriefStatus};
use crate::domain::brief_response::BriefResponse;
use crate::domain::eligibility::{BriefUserStatus, SellerFacts};
use crate::domain::errors::DomainError;
use crate::domain::evidence::Evidence;
use crate::domain::framework::{Framework, Lot};
use crate::domain::supplier::Supplier;
use crate::domain::user::User;

/// Everything eligibility needs to know about a seller, loaded for one brief
#[derive(Debug, Default)]
pub(crate) struct SellerContext {
    pub supplier: Option<Supplier>,
    pub category_evidence: Option<Evidence>,
    pub awaiting_application_assessment: bool,
    pub responses: Vec<BriefResponse>,
}

impl SellerContext {
    pub async fn load(repos: &Repositories, user: &User, brief: &Brief) -> ServiceResult<Self> {
        let mut context = SellerContext::default();

        if let Some(application_id) = user.application_id {
            context.awaiting_application_assessment = repos
                .applications
                .find_by_id(application_id)
                .await?
                .map_or(false, |a| a.status() == ApplicationStatus::Submitted);
        }

        let Some(supplier_id) = user.supplier_id else {
            return Ok(context);
        };
        context.supplier = repos.suppliers.find_by_id(supplier_id).await?;
        context.responses = repos
            .responses
            .for_brief_and_supplier(brief.id(), supplier_id)
            .await?;
        if let Some(category) = brief.seller_category() {
            context.category_evidence = repos
                .evidence
                .for_supplier_domain(supplier_id, category)
                .await?
                .into_iter()
                .next();
        }

        Ok(context)
    }

    pub fn facts(&self) -> SellerFacts<'_> {
        SellerFacts {
            supplier: self.supplier.as_ref(),
            category_evidence: self.category_evidence.as_ref(),
            awaiting_application_assessment: self.awaiting_application_assessment,
            responses: &self.responses,
        }
    }
}

pub(crate) async fn load_brief(repos: &Repositories, id: Uuid) -> ServiceResult<(Brief, Framework)> {
    let brief = repos
        .briefs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Opportunity {} not found", id)))?;
    let framework = repos
        .catalogue
        .find_framework(brief.framework_id())
        .await?
        .ok_or_else(|| ServiceError::not_found("Framework not found"))?;
    Ok((brief, framework))
}

/// Supplier responses to opportunities
pub struct ResponseService<'a> {
    repos: &'a Repositories,
}

impl<'a> ResponseService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    fn supplier_id(user: &User) -> ServiceResult<Uuid> {
        user.supplier_id
            .ok_or_else(|| ServiceError::unauthorised("Only suppliers can respond to opportunities"))
    }

    /// Starts a draft response
    ///
    /// # Business Rules
    /// - The supplier must be eligible, including the response limit
    /// - The limit is checked again as the response is stored
    pub async fn create(&self, user: &User, brief_id: Uuid) -> ServiceResult<BriefResponse> {
        let supplier_id = Self::supplier_id(user)?;
        let (brief, framework) = load_brief(self.repos, brief_id).await?;
        let now = Utc::now();

        let context = SellerContext::load(self.repos, user, &brief).await?;
        if let Err(e) =
            BriefUserStatus::new(&brief, &framework, user, context.facts(), now).can_submit_response(true)
        {
            tracing::warn!(%brief_id, %supplier_id, reason = %e, "Response refused");
            return Err(e.into());
        }

        let limit = if brief.lot() == Lot::Specialist {
            brief.number_of_suppliers()
        } else {
            1
        };
        let (response, event) = BriefResponse::create(brief.id(), supplier_id, now);
        let audit = audit_entries(Some(user), [event]);
        self.repos
            .responses
            .create_within_limit(&response, limit, &audit)
            .await?;
        tracing::info!(response_id = %response.id(), %brief_id, "Brief response created");

        Ok(response)
    }

    /// Updates a draft or submitted response, submitting it when asked
    ///
    /// # Business Rules
    /// - The brief must still be live and the supplier eligible (limit not checked)
    /// - Withdrawn responses cannot change
    pub async fn update(
        &self,
        user: &User,
        brief_id: Uuid,
        response_id: Uuid,
        data: Value,
        submit: bool,
    ) -> ServiceResult<BriefResponse> {
        let mut response = self.owned_response(user, response_id).await?;
        if response.brief_id() != brief_id {
            return Err(ServiceError::not_found(format!(
                "Brief response {} not found",
                response_id
            )));
        }

        let (brief, framework) = load_brief(self.repos, brief_id).await?;
        let now = Utc::now();
        let context = SellerContext::load(self.repos, user, &brief).await?;
        BriefUserStatus::new(&brief, &framework, user, context.facts(), now)
            .can_submit_response(false)?;

        let event = response.update(brief.lot(), data, submit, now)?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.responses.save(&response, &audit).await?;
        tracing::info!(%response_id, submitted = response.is_submitted(), "Brief response updated");

        Ok(response)
    }

    /// Withdraws a response while its brief is live; only once
    pub async fn withdraw(&self, user: &User, response_id: Uuid) -> ServiceResult<BriefResponse> {
        let mut response = self.owned_response(user, response_id).await?;
        let (brief, _) = load_brief(self.repos, response.brief_id()).await?;
        let now = Utc::now();

        if brief.status_at(now) != BriefStatus::Live {
            return Err(DomainError::rule(format!(
                "Opportunity {} is not live",
                brief.id()
            ))
            .into());
        }

        let event = response.withdraw(now)?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.responses.save(&response, &audit).await?;
        tracing::info!(%response_id, "Brief response withdrawn");

        Ok(response)
    }

    pub async fn get(&self, user: &User, response_id: Uuid) -> ServiceResult<BriefResponse> {
        self.owned_response(user, response_id).await
    }

    async fn owned_response(&self, user: &User, response_id: Uuid) -> ServiceResult<BriefResponse> {
        let supplier_id = Self::supplier_id(user)?;
        self.repos
            .responses
            .find_by_id(response_id)
            .await?
            .filter(|r| r.supplier_id() == supplier_id)
            .ok_or_else(|| ServiceError::not_found(format!("Brief response {} not found", response_id)))
    }
}
