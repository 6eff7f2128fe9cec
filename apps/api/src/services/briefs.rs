use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::responses::{load_brief, SellerContext};
use super::{audit_entries, Repositories, ServiceError, ServiceResult, ServiceSettings};
use crate::domain::brief::{Brief, BriefHistory, BriefStatus, LiveEdits};
use crate::domain::eligibility::{
    buyer_has_permission, has_permission_to_brief, BriefUserStatus, ViewerStatus,
};
use crate::domain::framework::{Framework, Lot};
use crate::domain::team::{Permission, Team};
use crate::domain::user::{User, UserRole};

/// A brief as seen by one user
#[derive(Debug, Clone)]
pub struct BriefView {
    pub brief: Brief,
    pub framework: Framework,
    pub status: BriefStatus,
    /// Eligibility flags for sellers
    pub viewer: Option<ViewerStatus>,
    /// Whether the viewer manages this brief
    pub can_manage: bool,
    pub can_close_early: bool,
}

/// A buyer's access to a brief they manage
struct Managed {
    brief: Brief,
    framework: Framework,
    teams: Vec<Team>,
}

/// Opportunity lifecycle: drafting, publishing, withdrawing, closing, editing
pub struct BriefService<'a> {
    repos: &'a Repositories,
    settings: &'a ServiceSettings,
}

impl<'a> BriefService<'a> {
    pub fn new(repos: &'a Repositories, settings: &'a ServiceSettings) -> Self {
        Self { repos, settings }
    }

    fn ensure_permitted(user: &User, teams: &[Team], any_of: &[Permission]) -> ServiceResult<()> {
        if user.is_admin() || any_of.iter().any(|p| buyer_has_permission(user, teams, *p)) {
            Ok(())
        } else {
            Err(ServiceError::unauthorised(format!(
                "You need the '{}' permission to do this",
                any_of.first().map_or("", |p| p.as_str())
            )))
        }
    }

    async fn teams_of(&self, user: &User) -> ServiceResult<Vec<Team>> {
        Ok(self.repos.teams.teams_for_user(user.id).await?)
    }

    /// Loads a brief the user may manage
    async fn managed(&self, user: &User, id: Uuid) -> ServiceResult<Managed> {
        if !user.is_buyer() && !user.is_admin() {
            return Err(ServiceError::unauthorised(
                "Only buyers can manage opportunities",
            ));
        }
        let (brief, framework) = load_brief(self.repos, id).await?;
        let teams = self.teams_of(user).await?;
        if !user.is_admin() && !has_permission_to_brief(user, &brief, &teams) {
            return Err(ServiceError::unauthorised(
                "You do not have permission to manage this opportunity",
            ));
        }
        Ok(Managed {
            brief,
            framework,
            teams,
        })
    }

    /// Creates a draft brief for a buyer
    ///
    /// # Business Rules
    /// - Only buyers holding `create_drafts` or `publish_opportunities`
    /// - The brief belongs to the buyer's completed team, if any
    pub async fn create(
        &self,
        user: &User,
        framework_slug: &str,
        lot: Lot,
        data: Value,
    ) -> ServiceResult<Brief> {
        if !user.is_buyer() {
            return Err(ServiceError::unauthorised(
                "Only buyers can create opportunities",
            ));
        }
        let teams = self.teams_of(user).await?;
        Self::ensure_permitted(
            user,
            &teams,
            &[Permission::CreateDrafts, Permission::PublishOpportunities],
        )?;

        let framework = self
            .repos
            .catalogue
            .find_framework_by_slug(framework_slug)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Framework '{}' not found", framework_slug)))?;
        let team_id = completed_team_id(user, &teams);

        let (brief, event) = Brief::new_draft(&framework, lot, user.id, team_id, data, Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.briefs.save(&brief, &audit).await?;
        tracing::info!(brief_id = %brief.id(), lot = lot.slug(), "Opportunity drafted");

        Ok(brief)
    }

    /// Loads a brief for viewing
    ///
    /// Drafts are only visible to the people who manage them. Sellers get
    /// their eligibility flags with the brief.
    pub async fn get(&self, user: &User, id: Uuid) -> ServiceResult<BriefView> {
        let (brief, framework) = load_brief(self.repos, id).await?;
        let now = Utc::now();
        let status = brief.status_at(now);

        let can_manage = user.is_admin()
            || (user.is_buyer() && has_permission_to_brief(user, &brief, &self.teams_of(user).await?));
        if status == BriefStatus::Draft && !can_manage {
            return Err(ServiceError::not_found(format!("Opportunity {} not found", id)));
        }

        let viewer = if matches!(user.role, UserRole::Supplier | UserRole::Applicant) {
            let context = SellerContext::load(self.repos, user, &brief).await?;
            Some(BriefUserStatus::new(&brief, &framework, user, context.facts(), now).summary())
        } else {
            None
        };

        let can_close_early = can_manage && {
            let submitted = self.submitted_by_invited(&brief).await?;
            brief.can_close_early(submitted, now)
        };

        Ok(BriefView {
            brief,
            framework,
            status,
            viewer,
            can_manage,
            can_close_early,
        })
    }

    /// Updates a draft, publishing it when `publish` is set
    ///
    /// # Business Rules
    /// - Editing needs `create_drafts` or `publish_opportunities`
    /// - Publishing needs `publish_opportunities`
    pub async fn update(
        &self,
        user: &User,
        id: Uuid,
        data: Option<Value>,
        publish: bool,
    ) -> ServiceResult<Brief> {
        let Managed {
            mut brief,
            framework,
            teams,
        } = self.managed(user, id).await?;
        Self::ensure_permitted(
            user,
            &teams,
            &[Permission::CreateDrafts, Permission::PublishOpportunities],
        )?;
        if publish {
            Self::ensure_permitted(user, &teams, &[Permission::PublishOpportunities])?;
        }

        let now = Utc::now();
        let mut events = Vec::new();
        if let Some(data) = data {
            events.push(brief.update_draft_data(data, now)?);
        }
        if publish {
            let event = brief.publish(&framework, &self.settings.deadlines, now)?;
            tracing::info!(brief_id = %id, closed_at = ?brief.closed_at(), "Opportunity published");
            events.push(event);
        }

        let audit = audit_entries(Some(user), events);
        self.repos.briefs.save(&brief, &audit).await?;
        Ok(brief)
    }

    /// Generic status change; only draft -> live and live -> withdrawn are honoured
    pub async fn set_status(&self, user: &User, id: Uuid, target: BriefStatus) -> ServiceResult<Brief> {
        let Managed {
            mut brief,
            framework,
            teams,
        } = self.managed(user, id).await?;
        Self::ensure_permitted(user, &teams, &[Permission::PublishOpportunities])?;

        let event = brief.set_status(target, &framework, &self.settings.deadlines, Utc::now())?;
        if let Some(event) = event {
            let audit = audit_entries(Some(user), [event]);
            self.repos.briefs.save(&brief, &audit).await?;
            tracing::info!(brief_id = %id, status = %target, "Opportunity status changed");
        }
        Ok(brief)
    }

    /// Deletes a draft
    pub async fn delete(&self, user: &User, id: Uuid) -> ServiceResult<()> {
        let Managed { brief, teams, .. } = self.managed(user, id).await?;
        Self::ensure_permitted(
            user,
            &teams,
            &[Permission::CreateDrafts, Permission::PublishOpportunities],
        )?;

        let event = brief.delete(Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.briefs.delete(id, &audit).await?;
        tracing::info!(brief_id = %id, "Draft opportunity deleted");

        Ok(())
    }

    /// Withdraws a live brief with a reason
    pub async fn withdraw(&self, user: &User, id: Uuid, reason: &str) -> ServiceResult<Brief> {
        let Managed {
            mut brief, teams, ..
        } = self.managed(user, id).await?;
        Self::ensure_permitted(user, &teams, &[Permission::PublishOpportunities])?;

        let event = brief.withdraw(reason, Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.briefs.save(&brief, &audit).await?;
        tracing::info!(brief_id = %id, "Opportunity withdrawn");

        Ok(brief)
    }

    /// Closes a live brief early once its only invited seller has submitted
    pub async fn close_early(&self, user: &User, id: Uuid) -> ServiceResult<Brief> {
        let Managed {
            mut brief, teams, ..
        } = self.managed(user, id).await?;
        Self::ensure_permitted(user, &teams, &[Permission::PublishOpportunities])?;

        let submitted = self.submitted_by_invited(&brief).await?;
        let event = match brief.close_early(submitted, Utc::now()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(brief_id = %id, reason = %e, "Early close refused");
                return Err(e.into());
            }
        };
        let audit = audit_entries(Some(user), [event]);
        self.repos.briefs.save(&brief, &audit).await?;
        tracing::info!(brief_id = %id, "Opportunity closed early");

        Ok(brief)
    }

    /// Copies a brief into a new draft owned by the user
    pub async fn copy(&self, user: &User, id: Uuid) -> ServiceResult<Brief> {
        let Managed {
            brief,
            framework,
            teams,
        } = self.managed(user, id).await?;
        Self::ensure_permitted(
            user,
            &teams,
            &[Permission::CreateDrafts, Permission::PublishOpportunities],
        )?;

        let team_id = completed_team_id(user, &teams);
        let (copy, event) = brief.copy(&framework, user.id, team_id, Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.briefs.save(&copy, &audit).await?;
        tracing::info!(brief_id = %copy.id(), source_id = %id, "Opportunity copied");

        Ok(copy)
    }

    /// Edits a live brief and keeps the previous version
    pub async fn edit(&self, user: &User, id: Uuid, edits: LiveEdits) -> ServiceResult<Brief> {
        let Managed {
            mut brief, teams, ..
        } = self.managed(user, id).await?;
        Self::ensure_permitted(user, &teams, &[Permission::PublishOpportunities])?;

        let (history, event) = brief.edit_live(edits, user.id, &self.settings.deadlines, Utc::now())?;
        let audit = audit_entries(Some(user), [event]);
        self.repos.briefs.save_edit(&brief, &history, &audit).await?;
        tracing::info!(brief_id = %id, "Live opportunity edited");

        Ok(brief)
    }

    pub async fn history(&self, user: &User, id: Uuid) -> ServiceResult<Vec<BriefHistory>> {
        self.managed(user, id).await?;
        Ok(self.repos.briefs.history(id).await?)
    }

    /// Submitted responses from the brief's single invited seller
    async fn submitted_by_invited(&self, brief: &Brief) -> ServiceResult<usize> {
        let invited = brief.sellers();
        let [seller] = invited.as_slice() else {
            return Ok(0);
        };
        let responses = self
            .repos
            .responses
            .for_brief_and_supplier(brief.id(), *seller)
            .await?;
        Ok(responses
            .iter()
            .filter(|r| r.is_submitted() && !r.is_withdrawn())
            .count())
    }
}

fn completed_team_id(user: &User, teams: &[Team]) -> Option<Uuid> {
    teams
        .iter()
        .find(|t| t.is_completed() && t.is_member(user.id))
        .map(Team::id)
}

