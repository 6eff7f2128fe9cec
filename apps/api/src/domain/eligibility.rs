use chrono::{DateTime, Utc};
use serde::Serialize;

use super::brief::{Brief, BriefStatus, OpenTo, SellerSelector};
use super::brief_response::BriefResponse;
use super::errors::{DomainError, DomainResult};
use super::evidence::{Evidence, EvidenceStatus};
use super::framework::{Framework, Lot};
use super::supplier::{RecruiterKind, Supplier, SupplierValidator};
use super::team::{Permission, Team};
use super::user::{User, UserRole};

/// What we know about the viewing seller, loaded by the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct SellerFacts<'a> {
    pub supplier: Option<&'a Supplier>,
    /// Latest evidence of the supplier in the brief's category
    pub category_evidence: Option<&'a Evidence>,
    /// The user's seller application is waiting for a decision
    pub awaiting_application_assessment: bool,
    /// The supplier's responses to this brief
    pub responses: &'a [BriefResponse],
}

/// Who may see and respond to an opportunity
pub struct BriefUserStatus<'a> {
    brief: &'a Brief,
    framework: &'a Framework,
    user: &'a User,
    facts: SellerFacts<'a>,
    now: DateTime<Utc>,
}

/// Viewer flags returned alongside an opportunity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerStatus {
    pub is_approved_seller: bool,
    pub is_recruiter_only: bool,
    pub is_assessed_in_any_category: bool,
    pub is_assessed_for_category: bool,
    pub has_evidence_in_draft_for_category: bool,
    pub has_latest_evidence_rejected_for_category: bool,
    pub is_awaiting_domain_assessment: bool,
    pub is_awaiting_application_assessment: bool,
    pub is_invited: bool,
    pub can_respond: bool,
    pub has_responded: bool,
    pub has_supplier_errors: bool,
}

impl<'a> BriefUserStatus<'a> {
    pub fn new(
        brief: &'a Brief,
        framework: &'a Framework,
        user: &'a User,
        facts: SellerFacts<'a>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            brief,
            framework,
            user,
            facts,
            now,
        }
    }

    pub fn is_approved_seller(&self) -> bool {
        self.user.role == UserRole::Supplier
            && self.facts.supplier.map_or(false, |s| !s.is_deleted())
    }

    pub fn is_recruiter_only(&self) -> bool {
        self.facts.supplier.map_or(false, Supplier::is_recruiter_only)
    }

    pub fn is_assessed_in_any_category(&self) -> bool {
        self.facts.supplier.map_or(false, Supplier::has_assessed_domain)
    }

    pub fn is_assessed_for_category(&self) -> bool {
        match (self.facts.supplier, self.brief.seller_category()) {
            (Some(supplier), Some(category)) => supplier.is_assessed_for(category),
            _ => false,
        }
    }

    fn category_evidence_status(&self) -> Option<EvidenceStatus> {
        self.facts.category_evidence.map(Evidence::status)
    }

    pub fn has_evidence_in_draft_for_category(&self) -> bool {
        self.category_evidence_status() == Some(EvidenceStatus::Draft)
    }

    pub fn has_latest_evidence_rejected_for_category(&self) -> bool {
        self.category_evidence_status() == Some(EvidenceStatus::Rejected)
    }

    pub fn is_awaiting_domain_assessment(&self) -> bool {
        self.category_evidence_status() == Some(EvidenceStatus::Submitted)
    }

    pub fn is_awaiting_application_assessment(&self) -> bool {
        self.facts.awaiting_application_assessment
    }

    pub fn has_supplier_errors(&self) -> bool {
        self.facts
            .supplier
            .map_or(true, |s| !SupplierValidator::new(s, self.now).errors().is_empty())
    }

    /// Whether the supplier has used up its responses
    ///
    /// Specialist briefs allow `numberOfSuppliers` candidates per seller;
    /// other lots allow a single response. Withdrawn responses don't count.
    pub fn has_responded(&self, submitted_only: bool) -> bool {
        let count = self
            .facts
            .responses
            .iter()
            .filter(|r| !r.is_withdrawn())
            .filter(|r| !submitted_only || r.is_submitted())
            .count();

        match self.brief.lot() {
            Lot::Specialist => count >= self.brief.number_of_suppliers(),
            _ => count > 0,
        }
    }

    /// Whether the supplier falls inside the brief's seller scope
    pub fn is_invited(&self) -> bool {
        let Some(supplier) = self.facts.supplier else {
            return false;
        };
        let email = self.user.email.as_str();

        self.brief.open_to() == Some(OpenTo::All)
            || self.brief.seller_selector() == Some(SellerSelector::AllSellers)
            || self.brief.sellers().contains(&supplier.id)
            || (self.brief.open_to() == Some(OpenTo::Category) && self.is_assessed_for_category())
            || (self.brief.seller_selector() == Some(SellerSelector::SomeSellers)
                && self.brief.seller_email_list().iter().any(|e| e == email))
            || (self.brief.seller_selector() == Some(SellerSelector::OneSeller)
                && self.brief.seller_email().as_deref() == Some(email))
    }

    /// Lot-specific recruiter and audience rules
    ///
    /// - atm: no recruiter-only sellers; open to all needs any assessed
    ///   domain, open to a category needs that category
    /// - rfx/training2: no recruiter-only sellers; must be invited and
    ///   assessed for the category
    /// - specialist: recruiters only (yes or both); open to all, or the
    ///   seller is one of those selected
    pub fn can_respond(&self) -> bool {
        let Some(supplier) = self.facts.supplier else {
            return false;
        };
        let recruiter = supplier.recruiter();

        match self.brief.lot() {
            Lot::Atm => {
                recruiter != Some(RecruiterKind::Yes)
                    && match self.brief.open_to() {
                        Some(OpenTo::All) => self.is_assessed_in_any_category(),
                        Some(OpenTo::Category) => self.is_assessed_for_category(),
                        _ => false,
                    }
            }
            Lot::Rfx | Lot::Training2 => {
                recruiter != Some(RecruiterKind::Yes)
                    && self.brief.sellers().contains(&supplier.id)
                    && self.is_assessed_for_category()
            }
            Lot::Specialist => {
                matches!(recruiter, Some(RecruiterKind::Yes | RecruiterKind::Both))
                    && match self.brief.open_to() {
                        Some(OpenTo::All) => true,
                        Some(OpenTo::Selected) => self.brief.sellers().contains(&supplier.id),
                        _ => false,
                    }
            }
        }
    }

    /// Checks, in order, everything that stops a supplier responding
    ///
    /// # Arguments
    /// * `check_limit` - false when editing an existing response
    pub fn can_submit_response(&self, check_limit: bool) -> DomainResult<()> {
        if self.brief.status_at(self.now) != BriefStatus::Live || !self.framework.is_live() {
            return Err(DomainError::rule(
                "Opportunity id does not exist or is not open for responses",
            ));
        }
        if !self.is_approved_seller() || self.has_supplier_errors() {
            return Err(DomainError::rule("Supplier is invalid"));
        }
        if !self.is_assessed_in_any_category() {
            return Err(DomainError::rule("Supplier is not assessed in any category"));
        }
        let category_needed =
            self.brief.lot() != Lot::Atm || self.brief.open_to() == Some(OpenTo::Category);
        if category_needed && !self.is_assessed_for_category() {
            return Err(DomainError::rule(
                "Supplier is not assessed for the category of the opportunity",
            ));
        }
        if !self.is_invited() || !self.can_respond() {
            return Err(DomainError::rule(
                "Supplier is not selected to respond or does not meet the minimum requirements to respond",
            ));
        }
        if check_limit && self.has_responded(false) {
            return Err(DomainError::rule(
                "Supplier has reached the permitted amount of draft/submitted responses for this opportunity",
            ));
        }
        Ok(())
    }

    pub fn summary(&self) -> ViewerStatus {
        ViewerStatus {
            is_approved_seller: self.is_approved_seller(),
            is_recruiter_only: self.is_recruiter_only(),
            is_assessed_in_any_category: self.is_assessed_in_any_category(),
            is_assessed_for_category: self.is_assessed_for_category(),
            has_evidence_in_draft_for_category: self.has_evidence_in_draft_for_category(),
            has_latest_evidence_rejected_for_category: self
                .has_latest_evidence_rejected_for_category(),
            is_awaiting_domain_assessment: self.is_awaiting_domain_assessment(),
            is_awaiting_application_assessment: self.is_awaiting_application_assessment(),
            is_invited: self.is_invited(),
            can_respond: self.can_respond(),
            has_responded: self.has_responded(false),
            has_supplier_errors: self.facts.supplier.is_some() && self.has_supplier_errors(),
        }
    }
}

/// Whether a buyer can see and manage a brief
///
/// # Arguments
/// * `user_teams` - teams the user belongs to
///
/// # Business Rules
/// - The author always can
/// - Members of the completed team that owns the brief can
/// - Members of a completed team that the author also belongs to can
pub fn has_permission_to_brief(user: &User, brief: &Brief, user_teams: &[Team]) -> bool {
    if brief.author_id() == user.id {
        return true;
    }

    user_teams
        .iter()
        .filter(|t| t.is_completed() && t.is_member(user.id))
        .any(|t| brief.team_id() == Some(t.id()) || t.is_member(brief.author_id()))
}

/// Whether a buyer holds a team permission
///
/// A buyer in no completed team works alone and holds every permission.
/// Otherwise leads hold everything and members hold what they were granted.
pub fn buyer_has_permission(user: &User, user_teams: &[Team], permission: Permission) -> bool {
    let mut completed = user_teams
        .iter()
        .filter(|t| t.is_completed() && t.is_member(user.id))
        .peekable();

    if completed.peek().is_none() {
        return true;
    }
    completed.any(|t| t.has_permission(user.id, permission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::brief::DeadlineRules;
    use crate::domain::framework::{Domain, FrameworkStatus};
    use crate::domain::supplier::SupplierStatus;
    use crate::domain::team::{TeamContext, TeamCreation, TeamUpdate};
    use crate::domain::user::Email;
    use serde_json::{json, Map, Value};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn framework() -> Framework {
        Framework {
            id: Uuid::new_v4(),
            slug: "digital-marketplace".to_string(),
            name: "Digital Marketplace".to_string(),
            status: FrameworkStatus::Live,
        }
    }

    fn closing_day() -> String {
        (now() + chrono::Duration::days(10)).date_naive().to_string()
    }

    fn seller_user(email: &str, supplier: &Supplier) -> User {
        let mut user = User::new(
            Email::new(email).unwrap(),
            "hash".to_string(),
            "Seller".to_string(),
            UserRole::Applicant,
        );
        user.promote_to_supplier(supplier.id);
        user
    }

    fn supplier(recruiter: &str, assessed_in: Option<&Domain>) -> Supplier {
        let mut supplier = Supplier {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            status: SupplierStatus::Complete,
            data: json!({
                "representative": "Ada",
                "phone": "02 6123 4567",
                "email": "ada@acme.com",
                "recruiter": recruiter
            }),
            domains: Vec::new(),
            created_at: now(),
        };
        if let Some(domain) = assessed_in {
            supplier.record_domain_approval(domain, None);
        }
        supplier
    }

    fn domain() -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: "Software engineering".to_string(),
        }
    }

    fn publish(lot: Lot, data: Value) -> Brief {
        let framework = framework();
        let (mut brief, _) =
            Brief::new_draft(&framework, lot, Uuid::new_v4(), None, data, now()).unwrap();
        brief
            .publish(&framework, &DeadlineRules::default(), now())
            .unwrap();
        brief
    }

    fn rfx_brief(category: &Domain, invited: &[Uuid]) -> Brief {
        let sellers: Map<String, Value> = invited
            .iter()
            .map(|id| (id.to_string(), json!({ "name": "Seller" })))
            .collect();
        publish(
            Lot::Rfx,
            json!({
                "title": "Build",
                "organisation": "Dept",
                "summary": "Build a thing",
                "location": ["ACT"],
                "sellerCategory": category.id.to_string(),
                "sellers": sellers,
                "startDate": "ASAP",
                "contractLength": "3 months",
                "evaluationCriteria": [{ "criteria": "Skill" }],
                "evaluationType": ["Written proposal"],
                "requirementsDocument": ["doc.pdf"],
                "workingArrangements": "Remote",
                "contactNumber": "02 6123 4567",
                "closedAt": closing_day()
            }),
        )
    }

    fn atm_brief(open_to: &str, category: Option<&Domain>) -> Brief {
        let mut data = json!({
            "title": "Ask",
            "organisation": "Dept",
            "summary": "Ask the market",
            "location": ["ACT"],
            "openTo": open_to,
            "backgroundInformation": "Background",
            "outcome": "Outcome",
            "endUsers": "Citizens",
            "startDate": "ASAP",
            "evaluationCriteria": [{ "criteria": "Skill" }],
            "contactNumber": "02 6123 4567",
            "closedAt": closing_day()
        });
        if let Some(category) = category {
            data["sellerCategory"] = json!(category.id.to_string());
        }
        publish(Lot::Atm, data)
    }

    fn specialist_brief(category: &Domain, selected: Option<Uuid>, number: u32) -> Brief {
        let mut data = json!({
            "title": "Developer",
            "organisation": "Dept",
            "summary": "Write code",
            "location": ["ACT"],
            "openTo": if selected.is_some() { "selected" } else { "all" },
            "sellerCategory": category.id.to_string(),
            "numberOfSuppliers": number,
            "essentialRequirements": [{ "criteria": "Rust" }],
            "maxRate": 1000,
            "startDate": "ASAP",
            "contractLength": "6 months",
            "securityClearance": "none",
            "contactNumber": "02 6123 4567",
            "closedAt": closing_day()
        });
        if let Some(id) = selected {
            data["sellers"] = json!({ (id.to_string()): { "name": "Seller" } });
        }
        publish(Lot::Specialist, data)
    }

    fn responses(brief: &Brief, supplier: &Supplier, count: usize) -> Vec<BriefResponse> {
        (0..count)
            .map(|_| BriefResponse::create(brief.id(), supplier.id, now()).0)
            .collect()
    }

    #[test]
    fn supplier_without_assessed_domains_cannot_respond() {
        let s = supplier("no", None);
        let user = seller_user("bids@acme.com", &s);
        let brief = atm_brief("all", None);
        let framework = framework();

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            now(),
        );

        let err = status.can_submit_response(true).unwrap_err();
        assert_eq!(err.to_string(), "Supplier is not assessed in any category");
        assert!(!status.is_assessed_for_category());
    }

    #[test]
    fn invited_rfx_seller_can_respond_once() {
        let category = domain();
        let s = supplier("no", Some(&category));
        let user = seller_user("bids@acme.com", &s);
        let brief = rfx_brief(&category, &[s.id]);
        let framework = framework();

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            now(),
        );
        assert!(status.can_submit_response(true).is_ok());

        let existing = responses(&brief, &s, 1);
        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                responses: &existing,
                ..Default::default()
            },
            now(),
        );
        let err = status.can_submit_response(true).unwrap_err();
        assert!(err.to_string().starts_with("Supplier has reached the permitted amount"));
        assert!(status.can_submit_response(false).is_ok());
    }

    #[test]
    fn uninvited_rfx_seller_refused() {
        let category = domain();
        let s = supplier("no", Some(&category));
        let user = seller_user("bids@acme.com", &s);
        let brief = rfx_brief(&category, &[Uuid::new_v4()]);
        let framework = framework();

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            now(),
        );
        let err = status.can_submit_response(true).unwrap_err();
        assert!(err.to_string().starts_with("Supplier is not selected to respond"));
    }

    #[test]
    fn rfx_needs_category_assessment() {
        let category = domain();
        let other = domain();
        let s = supplier("no", Some(&other));
        let user = seller_user("bids@acme.com", &s);
        let brief = rfx_brief(&category, &[s.id]);
        let framework = framework();

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            now(),
        );
        assert_eq!(
            status.can_submit_response(true).unwrap_err().to_string(),
            "Supplier is not assessed for the category of the opportunity"
        );
    }

    #[test]
    fn recruiter_only_excluded_from_atm() {
        let category = domain();
        let s = supplier("yes", Some(&category));
        let user = seller_user("bids@acme.com", &s);
        let brief = atm_brief("all", None);
        let framework = framework();

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            now(),
        );
        assert!(status.is_invited());
        assert!(!status.can_respond());
        assert!(status.can_submit_response(true).is_err());
    }

    #[test]
    fn atm_category_scope() {
        let category = domain();
        let assessed = supplier("no", Some(&category));
        let elsewhere = supplier("no", Some(&domain()));
        let brief = atm_brief("category", Some(&category));
        let framework = framework();

        let user = seller_user("a@acme.com", &assessed);
        let ok = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&assessed),
                ..Default::default()
            },
            now(),
        );
        assert!(ok.can_submit_response(true).is_ok());

        let user = seller_user("b@other.com", &elsewhere);
        let refused = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&elsewhere),
                ..Default::default()
            },
            now(),
        );
        assert!(refused.can_submit_response(true).is_err());
    }

    #[test]
    fn specialist_requires_recruiter() {
        let category = domain();
        let consultancy = supplier("no", Some(&category));
        let recruiter = supplier("both", Some(&category));
        let brief = specialist_brief(&category, None, 3);
        let framework = framework();

        let user = seller_user("c@acme.com", &consultancy);
        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&consultancy),
                ..Default::default()
            },
            now(),
        );
        assert!(!status.can_respond());

        let user = seller_user("r@acme.com", &recruiter);
        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&recruiter),
                ..Default::default()
            },
            now(),
        );
        assert!(status.can_respond());
    }

    #[test]
    fn specialist_fourth_response_blocked() {
        let category = domain();
        let s = supplier("yes", Some(&category));
        let user = seller_user("bids@acme.com", &s);
        let brief = specialist_brief(&category, Some(s.id), 3);
        let framework = framework();

        let mut existing = responses(&brief, &s, 3);
        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                responses: &existing,
                ..Default::default()
            },
            now(),
        );
        assert!(status.can_submit_response(true).is_err());

        existing[0].withdraw(now()).unwrap();
        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                responses: &existing,
                ..Default::default()
            },
            now(),
        );
        assert!(status.can_submit_response(true).is_ok());
    }

    #[test]
    fn invalid_profile_blocks_responses() {
        let category = domain();
        let mut s = supplier("no", Some(&category));
        s.data["phone"] = json!("123");
        let user = seller_user("bids@acme.com", &s);
        let brief = rfx_brief(&category, &[s.id]);
        let framework = framework();

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            now(),
        );
        assert_eq!(
            status.can_submit_response(true).unwrap_err().to_string(),
            "Supplier is invalid"
        );
        assert!(status.summary().has_supplier_errors);
    }

    #[test]
    fn invited_by_email() {
        let s = supplier("no", None);
        let user = seller_user("invited@acme.com", &s);
        let framework = framework();
        let (brief, _) = Brief::new_draft(
            &framework,
            Lot::Atm,
            Uuid::new_v4(),
            None,
            json!({ "sellerEmailList": ["Invited@acme.com"] }),
            now(),
        )
        .unwrap();

        // A draft carries no sellerSelector for an email list, so it is not an invitation
        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            now(),
        );
        assert!(!status.is_invited());
    }

    fn draft_with(data: Value) -> Brief {
        let (brief, _) =
            Brief::new_draft(&framework(), Lot::Atm, Uuid::new_v4(), None, data, now()).unwrap();
        brief
    }

    fn invited(brief: &Brief, user: &User, supplier: &Supplier) -> bool {
        BriefUserStatus::new(
            brief,
            &framework(),
            user,
            SellerFacts {
                supplier: Some(supplier),
                ..Default::default()
            },
            now(),
        )
        .is_invited()
    }

    #[test]
    fn invited_through_seller_email_list() {
        let s = supplier("no", None);
        let brief = draft_with(json!({
            "sellerSelector": "someSellers",
            "sellerEmailList": ["other@example.com", "Invited@Acme.com"]
        }));

        assert!(invited(&brief, &seller_user("invited@acme.com", &s), &s));
        assert!(!invited(&brief, &seller_user("someone@acme.com", &s), &s));
    }

    #[test]
    fn invited_as_the_one_seller() {
        let s = supplier("no", None);
        let user = seller_user("invited@acme.com", &s);
        let one = draft_with(json!({
            "sellerSelector": "oneSeller",
            "sellerEmail": "INVITED@acme.com"
        }));
        assert!(invited(&one, &user, &s));
        assert!(!invited(&one, &seller_user("other@acme.com", &s), &s));

        // sellerEmail only counts when one seller was selected
        let some = draft_with(json!({
            "sellerSelector": "someSellers",
            "sellerEmail": "invited@acme.com"
        }));
        assert!(!invited(&some, &user, &s));
    }

    #[test]
    fn closed_brief_not_open_for_responses() {
        let category = domain();
        let s = supplier("no", Some(&category));
        let user = seller_user("bids@acme.com", &s);
        let brief = rfx_brief(&category, &[s.id]);
        let framework = framework();
        let after_close = brief.closed_at().unwrap() + chrono::Duration::seconds(1);

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                ..Default::default()
            },
            after_close,
        );
        assert!(status
            .can_submit_response(true)
            .unwrap_err()
            .to_string()
            .contains("not open for responses"));
    }

    #[test]
    fn evidence_flags() {
        let category = domain();
        let s = supplier("no", None);
        let user = seller_user("bids@acme.com", &s);
        let brief = rfx_brief(&category, &[s.id]);
        let framework = framework();
        let (evidence, _) =
            Evidence::start(&category, &s, user.id, Some(&brief), None, now()).unwrap();

        let status = BriefUserStatus::new(
            &brief,
            &framework,
            &user,
            SellerFacts {
                supplier: Some(&s),
                category_evidence: Some(&evidence),
                awaiting_application_assessment: false,
                responses: &[],
            },
            now(),
        );
        let summary = status.summary();
        assert!(summary.has_evidence_in_draft_for_category);
        assert!(!summary.is_awaiting_domain_assessment);
        assert!(!summary.has_latest_evidence_rejected_for_category);
    }

    fn completed_team(lead: &User, member: &User, granted: &[Permission]) -> Team {
        let team = match Team::create_for(lead.id, &[], now()).unwrap() {
            TeamCreation::Created(team, _) => team,
            TeamCreation::Existing(team) => team,
        };
        let mut team = team;
        let ctx = TeamContext {
            users: [(lead.id, lead.clone()), (member.id, member.clone())]
                .into_iter()
                .collect(),
            other_teams: Default::default(),
        };
        team.update(
            TeamUpdate {
                name: Some("Digital".to_string()),
                team_members: Some(vec![member.id]),
                permissions: [(member.id, granted.iter().copied().collect())]
                    .into_iter()
                    .collect(),
                create_team: true,
                ..Default::default()
            },
            lead,
            &ctx,
            now(),
        )
        .unwrap();
        team
    }

    fn buyer(email: &str) -> User {
        User::new(
            Email::new(email).unwrap(),
            "hash".to_string(),
            "Buyer".to_string(),
            UserRole::Buyer,
        )
    }

    #[test]
    fn brief_access_through_team() {
        let lead = buyer("lead@agency.gov.au");
        let member = buyer("member@agency.gov.au");
        let stranger = buyer("stranger@agency.gov.au");
        let team = completed_team(&lead, &member, &[]);
        let framework = framework();
        let (brief, _) =
            Brief::new_draft(&framework, Lot::Atm, lead.id, None, json!({}), now()).unwrap();
        let (team_brief, _) = Brief::new_draft(
            &framework,
            Lot::Atm,
            stranger.id,
            Some(team.id()),
            json!({}),
            now(),
        )
        .unwrap();

        assert!(has_permission_to_brief(&lead, &brief, &[]));
        assert!(has_permission_to_brief(&member, &brief, &[team.clone()]));
        assert!(has_permission_to_brief(&member, &team_brief, &[team.clone()]));
        assert!(!has_permission_to_brief(&stranger, &brief, &[]));
    }

    #[test]
    fn permission_model() {
        let lead = buyer("lead@agency.gov.au");
        let member = buyer("member@agency.gov.au");
        let solo = buyer("solo@agency.gov.au");
        let team = completed_team(&lead, &member, &[Permission::CreateDrafts]);
        let teams = [team];

        assert!(buyer_has_permission(&solo, &[], Permission::PublishOpportunities));
        assert!(buyer_has_permission(&lead, &teams, Permission::PublishOpportunities));
        assert!(buyer_has_permission(&member, &teams, Permission::CreateDrafts));
        assert!(!buyer_has_permission(&member, &teams, Permission::PublishOpportunities));
    }
}
