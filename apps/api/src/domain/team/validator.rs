use std::collections::HashMap;
use uuid::Uuid;

use super::team::Team;
use crate::domain::user::{Email, User, UserRole};
use crate::domain::validation::ValidationMessage;

/// Facts about the people on a team that the team itself doesn't hold
#[derive(Debug, Clone, Default)]
pub struct TeamContext {
    /// Every user referenced by the team's membership
    pub users: HashMap<Uuid, User>,
    /// Users who already belong to another completed team, with that team's name
    pub other_teams: HashMap<Uuid, String>,
}

/// Step-oriented checks run when a team is edited
pub struct TeamValidator<'a> {
    team: &'a Team,
    current_user: &'a User,
    context: &'a TeamContext,
}

impl<'a> TeamValidator<'a> {
    pub fn new(team: &'a Team, current_user: &'a User, context: &'a TeamContext) -> Self {
        Self {
            team,
            current_user,
            context,
        }
    }

    pub fn validate_all(&self) -> Vec<ValidationMessage> {
        let mut messages = self.validate_basics();
        messages.extend(self.validate_leads());
        messages.extend(self.validate_members());
        messages
    }

    fn agency_domain(&self) -> &str {
        self.current_user.email.domain()
    }

    fn display_name(&self, user_id: Uuid) -> String {
        self.context
            .users
            .get(&user_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    fn validate_basics(&self) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();

        if self.team.name().trim().is_empty() {
            messages.push(ValidationMessage::error(
                "T001",
                "about",
                "A team name is required.",
            ));
        }

        if let Some(email) = self.team.email_address() {
            match Email::new(email) {
                Err(_) => messages.push(ValidationMessage::error(
                    "T002",
                    "about",
                    "The team email address is not valid.",
                )),
                Ok(email) if email.domain() != self.agency_domain() => {
                    messages.push(ValidationMessage::error(
                        "T003",
                        "about",
                        format!(
                            "The team email address must end in @{}.",
                            self.agency_domain()
                        ),
                    ))
                }
                Ok(_) => {}
            }
        }

        messages
    }

    fn validate_leads(&self) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();

        if self.team.leads().next().is_none() {
            messages.push(ValidationMessage::error(
                "TM002",
                "leads",
                "At least one team lead is required.",
            ));
        }

        if !self.team.is_lead(self.current_user.id) {
            messages.push(ValidationMessage::error(
                "TM003",
                "leads",
                "You must remain a team lead.",
            ));
        }

        messages
    }

    fn validate_members(&self) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();

        if !self.team.members().iter().any(|m| !m.is_team_lead) {
            messages.push(ValidationMessage::error(
                "TM001",
                "members",
                "At least one team member is required.",
            ));
        }

        for member in self.team.members() {
            let name = self.display_name(member.user_id);

            if let Some(other) = self.context.other_teams.get(&member.user_id) {
                messages.push(ValidationMessage::error(
                    "TM004",
                    "members",
                    format!("{} is already a member of {}.", name, other),
                ));
            }

            let Some(user) = self.context.users.get(&member.user_id) else {
                messages.push(ValidationMessage::error(
                    "TM007",
                    "members",
                    format!("{} is not a registered user.", member.user_id),
                ));
                continue;
            };
            if user.role != UserRole::Buyer {
                messages.push(ValidationMessage::error(
                    "TM005",
                    "members",
                    format!("{} is not a buyer and cannot join a team.", name),
                ));
            }
            if user.email.domain() != self.agency_domain() {
                messages.push(ValidationMessage::error(
                    "TM006",
                    "members",
                    format!("{} is from a different agency.", name),
                ));
            }
        }

        messages
    }
}
