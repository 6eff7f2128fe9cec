use thiserror::Error;

use super::validation::{FieldErrors, ValidationMessage};

/// Errors raised by aggregates when a business rule refuses an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Cannot change {entity} status from '{from}' to '{to}'")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{}", join_messages(.0))]
    Messages(Vec<ValidationMessage>),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Rule(String),
}

impl DomainError {
    pub fn rule(message: impl Into<String>) -> Self {
        Self::Rule(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn transition(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

fn join_messages(messages: &[ValidationMessage]) -> String {
    messages
        .iter()
        .map(|m| m.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::reason;

    #[test]
    fn transition_message() {
        let err = DomainError::transition("opportunity", "closed", "live");
        assert_eq!(
            err.to_string(),
            "Cannot change opportunity status from 'closed' to 'live'"
        );
    }

    #[test]
    fn validation_message_lists_fields() {
        let err = DomainError::Validation(FieldErrors::single("title", reason::ANSWER_REQUIRED));
        assert_eq!(err.to_string(), "Validation failed: title: answer_required");
    }

    #[test]
    fn messages_are_joined() {
        let err = DomainError::Messages(vec![
            ValidationMessage::error("TM001", "members", "Team members are required."),
            ValidationMessage::error("T001", "about", "A team name is required."),
        ]);
        assert_eq!(
            err.to_string(),
            "Team members are required. A team name is required."
        );
    }
}
