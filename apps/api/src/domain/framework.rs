use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::errors::{DomainError, DomainResult};

/// Lifecycle status of a procurement framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "framework_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FrameworkStatus {
    Coming,
    Open,
    Pending,
    Standstill,
    Live,
    Expired,
}

/// A procurement framework, e.g. the digital marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Framework {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub status: FrameworkStatus,
}

impl Framework {
    pub fn is_live(&self) -> bool {
        self.status == FrameworkStatus::Live
    }

    /// Publishing, copying and responding all need a live framework
    pub fn ensure_live(&self) -> DomainResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(DomainError::rule(format!(
                "Framework '{}' is not live",
                self.slug
            )))
        }
    }
}

/// Lot an opportunity is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lot_slug", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Lot {
    Rfx,
    Atm,
    Specialist,
    Training2,
}

impl Lot {
    pub fn slug(&self) -> &'static str {
        match self {
            Lot::Rfx => "rfx",
            Lot::Atm => "atm",
            Lot::Specialist => "specialist",
            Lot::Training2 => "training2",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Lot::Rfx => "Request for proposal",
            Lot::Atm => "Ask the market",
            Lot::Specialist => "Specialist",
            Lot::Training2 => "Training",
        }
    }

    /// Lots where sellers are invited by id from a single category
    pub fn invites_by_category(&self) -> bool {
        matches!(self, Lot::Rfx | Lot::Training2)
    }
}

impl std::fmt::Display for Lot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for Lot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rfx" => Ok(Lot::Rfx),
            "atm" => Ok(Lot::Atm),
            "specialist" => Ok(Lot::Specialist),
            "training2" => Ok(Lot::Training2),
            other => Err(format!("Unknown lot: {}", other)),
        }
    }
}

/// Area of expertise a supplier can be assessed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framework(status: FrameworkStatus) -> Framework {
        Framework {
            id: Uuid::new_v4(),
            slug: "digital-marketplace".to_string(),
            name: "Digital Marketplace".to_string(),
            status,
        }
    }

    #[test]
    fn only_live_framework_passes() {
        assert!(framework(FrameworkStatus::Live).ensure_live().is_ok());
        assert!(framework(FrameworkStatus::Expired).ensure_live().is_err());
        assert!(framework(FrameworkStatus::Standstill).ensure_live().is_err());
    }

    #[test]
    fn lot_slug_round_trips_through_from_str() {
        for lot in [Lot::Rfx, Lot::Atm, Lot::Specialist, Lot::Training2] {
            assert_eq!(lot.slug().parse::<Lot>().unwrap(), lot);
        }
        assert!("digital-outcome".parse::<Lot>().is_err());
    }

    #[test]
    fn category_invitation_lots() {
        assert!(Lot::Rfx.invites_by_category());
        assert!(Lot::Training2.invites_by_category());
        assert!(!Lot::Atm.invites_by_category());
        assert!(!Lot::Specialist.invites_by_category());
    }
}
