use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use super::{audit_entries, Repositories, ServiceError, ServiceResult};
use crate::domain::team::{Team, TeamContext, TeamCreation, TeamUpdate};
use crate::domain::user::User;

/// Buyer teams
pub struct TeamService<'a> {
    repos: &'a Repositories,
}

impl<'a> TeamService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Creates a team led by the user, or returns the one they are setting up
    pub async fn create(&self, user: &User) -> ServiceResult<Team> {
        if !user.is_buyer() {
            return Err(ServiceError::unauthorised("Only buyers can create teams"));
        }

        let teams = self.repos.teams.teams_for_user(user.id).await?;
        match Team::create_for(user.id, &teams, Utc::now())? {
            TeamCreation::Existing(team) => Ok(team),
            TeamCreation::Created(team, event) => {
                let audit = audit_entries(Some(user), [event]);
                self.repos.teams.save(&team, &audit).await?;
                tracing::info!(team_id = %team.id(), "Team created");
                Ok(team)
            }
        }
    }

    pub async fn get(&self, user: &User, id: Uuid) -> ServiceResult<Team> {
        let team = self.load(id).await?;
        if team.is_member(user.id) || user.is_admin() {
            Ok(team)
        } else {
            Err(ServiceError::not_found(format!("Team {} not found", id)))
        }
    }

    /// Applies a lead's changes to a team
    pub async fn update(&self, user: &User, id: Uuid, update: TeamUpdate) -> ServiceResult<Team> {
        let mut team = self.load(id).await?;
        let context = self.context(&team, user, &update).await?;

        let events = match team.update(update, user, &context, Utc::now()) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(team_id = %id, reason = %e, "Team update refused");
                return Err(e.into());
            }
        };
        let audit = audit_entries(Some(user), events);
        self.repos.teams.save(&team, &audit).await?;
        tracing::info!(team_id = %id, status = ?team.status(), "Team updated");

        Ok(team)
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Team> {
        self.repos
            .teams
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Team {} not found", id)))
    }

    /// Loads everyone the team will contain after the update, and the
    /// completed teams they already belong to
    async fn context(&self, team: &Team, user: &User, update: &TeamUpdate) -> ServiceResult<TeamContext> {
        let ids: BTreeSet<Uuid> = team
            .members()
            .iter()
            .map(|m| m.user_id)
            .chain(update.team_leads.iter().flatten().copied())
            .chain(update.team_members.iter().flatten().copied())
            .chain([user.id])
            .collect();
        let ids: Vec<Uuid> = ids.into_iter().collect();

        let mut context = TeamContext::default();
        for member in self.repos.users.find_many(&ids).await? {
            context.users.insert(member.id, member);
        }
        for id in ids {
            let other = self
                .repos
                .teams
                .teams_for_user(id)
                .await?
                .into_iter()
                .find(|t| t.id() != team.id() && t.is_completed());
            if let Some(other) = other {
                context.other_teams.insert(id, other.name().to_string());
            }
        }

        Ok(context)
    }
}
