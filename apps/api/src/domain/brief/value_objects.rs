use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Derived lifecycle status of an opportunity
///
/// # Status Transitions
/// ```text
/// Draft -> Live -> Closed
///            └---> Withdrawn
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BriefStatus {
    Draft,
    Live,
    Closed,
    Withdrawn,
}

impl BriefStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use marketplace_api::domain::brief::value_objects::BriefStatus;
    ///
    /// assert!(BriefStatus::Draft.can_transition_to(BriefStatus::Live));
    /// assert!(!BriefStatus::Closed.can_transition_to(BriefStatus::Live));
    /// ```
    pub fn can_transition_to(&self, next: BriefStatus) -> bool {
        use BriefStatus::*;
        matches!(
            (self, next),
            (Draft, Live) | (Live, Closed) | (Live, Withdrawn)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BriefStatus::Draft => "draft",
            BriefStatus::Live => "live",
            BriefStatus::Closed => "closed",
            BriefStatus::Withdrawn => "withdrawn",
        }
    }
}

impl std::fmt::Display for BriefStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BriefStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BriefStatus::Draft),
            "live" => Ok(BriefStatus::Live),
            "closed" => Ok(BriefStatus::Closed),
            "withdrawn" => Ok(BriefStatus::Withdrawn),
            other => Err(format!("Unknown opportunity status: {}", other)),
        }
    }
}

/// How sellers were chosen for an opportunity (`data.sellerSelector`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SellerSelector {
    AllSellers,
    SomeSellers,
    OneSeller,
}

impl SellerSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerSelector::AllSellers => "allSellers",
            SellerSelector::SomeSellers => "someSellers",
            SellerSelector::OneSeller => "oneSeller",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "allSellers" => Some(SellerSelector::AllSellers),
            "someSellers" => Some(SellerSelector::SomeSellers),
            "oneSeller" => Some(SellerSelector::OneSeller),
            _ => None,
        }
    }
}

/// Audience of an ask-the-market or specialist opportunity (`data.openTo`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenTo {
    All,
    Selected,
    Category,
}

impl OpenTo {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenTo::All => "all",
            OpenTo::Selected => "selected",
            OpenTo::Category => "category",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(OpenTo::All),
            "selected" => Some(OpenTo::Selected),
            "category" => Some(OpenTo::Category),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        assert!(BriefStatus::Draft.can_transition_to(BriefStatus::Live));
        assert!(BriefStatus::Live.can_transition_to(BriefStatus::Closed));
        assert!(BriefStatus::Live.can_transition_to(BriefStatus::Withdrawn));
    }

    #[test]
    fn no_backwards_transitions() {
        assert!(!BriefStatus::Live.can_transition_to(BriefStatus::Draft));
        assert!(!BriefStatus::Closed.can_transition_to(BriefStatus::Live));
        assert!(!BriefStatus::Withdrawn.can_transition_to(BriefStatus::Live));
        assert!(!BriefStatus::Closed.can_transition_to(BriefStatus::Withdrawn));
    }

    #[test]
    fn draft_cannot_skip_to_closed() {
        assert!(!BriefStatus::Draft.can_transition_to(BriefStatus::Closed));
        assert!(!BriefStatus::Draft.can_transition_to(BriefStatus::Withdrawn));
    }

    #[test]
    fn status_display_and_parse() {
        assert_eq!(BriefStatus::Withdrawn.to_string(), "withdrawn");
        assert_eq!("live".parse::<BriefStatus>().unwrap(), BriefStatus::Live);
        assert!("open".parse::<BriefStatus>().is_err());
    }

    #[test]
    fn seller_selector_names() {
        assert_eq!(
            SellerSelector::parse("someSellers"),
            Some(SellerSelector::SomeSellers)
        );
        assert_eq!(SellerSelector::OneSeller.as_str(), "oneSeller");
        assert_eq!(SellerSelector::parse("everyone"), None);
    }

    #[test]
    fn open_to_names() {
        assert_eq!(OpenTo::parse("category"), Some(OpenTo::Category));
        assert_eq!(OpenTo::Selected.as_str(), "selected");
        assert_eq!(OpenTo::parse("some"), None);
    }
}
