use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{audit_entries, require_admin, Repositories, ServiceError, ServiceResult};
use crate::domain::application::{Application, ApplicationKind};
use crate::domain::user::{User, UserRole};

/// Seller applications and their approval workflow
pub struct ApplicationService<'a> {
    repos: &'a Repositories,
}

impl<'a> ApplicationService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Application> {
        self.repos
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Application {} not found", id)))
    }

    /// Loads an application the user works on, or any application for admins
    async fn owned(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        let application = self.load(id).await?;
        let owns = user.application_id == Some(id)
            || (user.supplier_id.is_some() && application.supplier_id() == user.supplier_id);
        if owns || user.is_admin() {
            Ok(application)
        } else {
            Err(ServiceError::unauthorised(
                "You do not have access to this application",
            ))
        }
    }

    /// Starts an application
    ///
    /// # Business Rules
    /// - Applicants start new seller applications and are linked to them
    /// - Suppliers start upgrade or edit applications for their own supplier
    pub async fn create(&self, user: &User, kind: ApplicationKind, data: Value) -> ServiceResult<Application> {
        let supplier_id = match (user.role, kind) {
            (UserRole::Applicant, ApplicationKind::New) => None,
            (UserRole::Supplier, ApplicationKind::Upgrade | ApplicationKind::Edit) => user.supplier_id,
            _ => {
                return Err(ServiceError::unauthorised(
                    "You cannot start this kind of application",
                ))
            }
        };

        let (application, event) = Application::new(kind, supplier_id, data, Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.applications.save(&application, &audit).await?;

        if kind == ApplicationKind::New {
            let mut applicant = user.clone();
            applicant.application_id = Some(application.id());
            self.repos.users.save(&applicant).await?;
        }
        tracing::info!(application_id = %application.id(), "Application started");

        Ok(application)
    }

    pub async fn get(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        self.owned(user, id).await
    }

    pub async fn update(&self, user: &User, id: Uuid, data: Value) -> ServiceResult<Application> {
        let mut application = self.owned(user, id).await?;
        let event = application.update_data(data, Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.applications.save(&application, &audit).await?;

        Ok(application)
    }

    /// saved -> submitted
    pub async fn submit(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        let mut application = self.owned(user, id).await?;
        let event = application.submit_for_approval(Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.applications.save(&application, &audit).await?;
        tracing::info!(application_id = %id, "Application submitted for approval");

        Ok(application)
    }

    /// Approves a submitted application
    ///
    /// Creates or updates the supplier and promotes the application's
    /// applicants to supplier users, all in one write.
    pub async fn approve(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        require_admin(user)?;
        let mut application = self.load(id).await?;

        let existing = match application.supplier_id() {
            Some(supplier_id) => Some(
                self.repos
                    .suppliers
                    .find_by_id(supplier_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found(format!("Supplier {} not found", supplier_id)))?,
            ),
            None => None,
        };

        let approval = match application.approve(existing, Utc::now()) {
            Ok(approval) => approval,
            Err(e) => {
                tracing::warn!(application_id = %id, reason = %e, "Approval refused");
                return Err(e.into());
            }
        };

        let mut applicants = self.repos.users.find_by_application(id).await?;
        for applicant in applicants.iter_mut().filter(|u| u.role == UserRole::Applicant) {
            applicant.promote_to_supplier(approval.supplier.id);
        }

        let audit = audit_entries(Some(user), [approval.event]);
        self.repos
            .applications
            .record_approval(&application, &approval.supplier, &applicants, &audit)
            .await?;
        tracing::info!(
            application_id = %id,
            supplier_id = %approval.supplier.id,
            created_supplier = approval.created_supplier,
            "Application approved"
        );

        Ok(application)
    }

    /// submitted -> approval_rejected
    pub async fn reject(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        require_admin(user)?;
        let mut application = self.load(id).await?;
        let event = application.reject(Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.applications.save(&application, &audit).await?;
        tracing::info!(application_id = %id, "Application rejected");

        Ok(application)
    }

    /// submitted -> saved
    pub async fn revert(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        require_admin(user)?;
        let mut application = self.load(id).await?;
        let event = application.revert(Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.applications.save(&application, &audit).await?;

        Ok(application)
    }

    /// approval_rejected -> submitted
    pub async fn unreject(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        require_admin(user)?;
        let mut application = self.load(id).await?;
        let event = application.unreject(Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.applications.save(&application, &audit).await?;

        Ok(application)
    }

    pub async fn delete(&self, user: &User, id: Uuid) -> ServiceResult<Application> {
        let mut application = self.owned(user, id).await?;
        let event = application.delete(Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.applications.save(&application, &audit).await?;
        tracing::info!(application_id = %id, "Application deleted");

        Ok(application)
    }
}
