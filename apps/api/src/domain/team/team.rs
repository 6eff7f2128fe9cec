use super::validator::{TeamContext, TeamValidator};
use super::value_objects::{Permission, TeamMember, TeamStatus};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::DomainEvent;
use crate::domain::user::User;
use crate::domain::validation::errors_only;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Team aggregate root
///
/// A group of buyers from one agency who share opportunities.
///
/// # Invariants
/// - A completed team always has at least one lead
/// - Only leads can change the team
/// - Status transitions must follow defined rules
///
/// # Example
/// ```
/// use marketplace_api::domain::team::{Team, TeamCreation};
/// use uuid::Uuid;
///
/// let creator = Uuid::new_v4();
/// let creation = Team::create_for(creator, &[], chrono::Utc::now()).expect("not in a team");
/// match creation {
///     TeamCreation::Created(team, _) => assert!(team.is_lead(creator)),
///     TeamCreation::Existing(_) => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    id: Uuid,
    name: String,
    email_address: Option<String>,
    status: TeamStatus,
    members: Vec<TeamMember>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Outcome of asking for a new team
#[derive(Debug, Clone)]
pub enum TeamCreation {
    /// The user already had a team being set up
    Existing(Team),
    Created(Team, DomainEvent),
}

/// Requested changes to a team
#[derive(Debug, Clone, Default)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub email_address: Option<String>,
    /// Full list of leads after the update, when given
    pub team_leads: Option<Vec<Uuid>>,
    /// Full list of non-lead members after the update, when given
    pub team_members: Option<Vec<Uuid>>,
    /// Granted permissions per member; members not listed keep theirs
    pub permissions: BTreeMap<Uuid, BTreeSet<Permission>>,
    /// Finish setup: validate everything and complete the team
    pub create_team: bool,
}

impl Team {
    /// Creates a team led by `user_id`
    ///
    /// # Arguments
    /// * `user_teams` - teams the user already belongs to
    ///
    /// # Business Rules
    /// - A user in a completed team cannot create another
    /// - A team the user is still setting up is returned instead of a new one
    pub fn create_for(
        user_id: Uuid,
        user_teams: &[Team],
        now: DateTime<Utc>,
    ) -> DomainResult<TeamCreation> {
        if let Some(completed) = user_teams
            .iter()
            .find(|t| t.status == TeamStatus::Completed)
        {
            return Err(DomainError::rule(format!(
                "You can only be in one team. You're already a member of {}.",
                completed.name
            )));
        }

        if let Some(existing) = user_teams
            .iter()
            .find(|t| t.status == TeamStatus::Created && t.is_member(user_id))
        {
            return Ok(TeamCreation::Existing(existing.clone()));
        }

        let team = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            email_address: None,
            status: TeamStatus::Created,
            members: vec![TeamMember::lead(user_id)],
            created_at: now,
            updated_at: now,
        };
        let event = DomainEvent::TeamCreated { team_id: team.id };
        Ok(TeamCreation::Created(team, event))
    }

    /// Applies an update from a team lead
    ///
    /// # Business Rules
    /// - Only team leads can edit a team
    /// - `create_team` validates everything and completes the team
    /// - A completed team is revalidated on every update
    /// - A team still being set up only checks the membership rules
    pub fn update(
        &mut self,
        update: TeamUpdate,
        actor: &User,
        context: &TeamContext,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<DomainEvent>> {
        if !self.is_lead(actor.id) {
            return Err(DomainError::forbidden("Only team leads can edit a team"));
        }
        if self.status == TeamStatus::Deleted {
            return Err(DomainError::rule("This team has been deleted"));
        }

        let mut next = self.clone();
        next.apply(update.clone());

        let messages = TeamValidator::new(&next, actor, context).validate_all();
        let completing = update.create_team && self.status == TeamStatus::Created;
        let blocking: Vec<_> = if update.create_team || self.status == TeamStatus::Completed {
            errors_only(messages)
        } else {
            errors_only(messages)
                .into_iter()
                .filter(|m| m.id.starts_with("TM"))
                .collect()
        };
        if !blocking.is_empty() {
            return Err(DomainError::Messages(blocking));
        }

        let mut events = vec![DomainEvent::TeamUpdated { team_id: self.id }];
        if completing {
            if !next.status.can_transition_to(TeamStatus::Completed) {
                return Err(DomainError::transition("team", next.status, TeamStatus::Completed));
            }
            next.status = TeamStatus::Completed;
            events.push(DomainEvent::TeamCompleted { team_id: self.id });
        }

        next.updated_at = now;
        *self = next;
        Ok(events)
    }

    fn apply(&mut self, update: TeamUpdate) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = update.email_address {
            let email = email.trim().to_lowercase();
            self.email_address = (!email.is_empty()).then_some(email);
        }

        let leads = update.team_leads.unwrap_or_else(|| {
            self.members
                .iter()
                .filter(|m| m.is_team_lead)
                .map(|m| m.user_id)
                .collect()
        });
        let members = update.team_members.unwrap_or_else(|| {
            self.members
                .iter()
                .filter(|m| !m.is_team_lead)
                .map(|m| m.user_id)
                .collect()
        });

        let previous = std::mem::take(&mut self.members);
        let granted = |user_id: Uuid| {
            update.permissions.get(&user_id).cloned().unwrap_or_else(|| {
                previous
                    .iter()
                    .find(|m| m.user_id == user_id)
                    .map(|m| m.permissions.clone())
                    .unwrap_or_default()
            })
        };

        let mut seen = BTreeSet::new();
        for user_id in leads {
            if seen.insert(user_id) {
                self.members.push(TeamMember {
                    user_id,
                    is_team_lead: true,
                    permissions: granted(user_id),
                });
            }
        }
        for user_id in members {
            if seen.insert(user_id) {
                self.members.push(TeamMember::member(user_id, granted(user_id)));
            }
        }
    }

    pub fn member(&self, user_id: Uuid) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member(user_id).is_some()
    }

    pub fn is_lead(&self, user_id: Uuid) -> bool {
        self.member(user_id).map_or(false, |m| m.is_team_lead)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TeamStatus::Completed
    }

    /// Whether `user_id` may act with `permission` in this team
    pub fn has_permission(&self, user_id: Uuid, permission: Permission) -> bool {
        self.member(user_id)
            .map_or(false, |m| m.has_permission(permission))
    }

    pub fn leads(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(|m| m.is_team_lead)
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email_address(&self) -> Option<&str> {
        self.email_address.as_deref()
    }

    pub fn status(&self) -> TeamStatus {
        self.status
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Reconstructs a Team from persistence layer data
    ///
    /// Only to be used by repository implementations.
    pub fn from_persistence(
        id: Uuid,
        name: String,
        email_address: Option<String>,
        status: TeamStatus,
        members: Vec<TeamMember>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email_address,
            status,
            members,
            created_at,
            updated_at,
        }
    }
}
