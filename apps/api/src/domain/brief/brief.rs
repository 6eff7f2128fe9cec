use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::deadlines::{DeadlineRules, MAX_OPEN_DAYS};
use super::validator::{as_number, parse_day, validate_brief_data, ValidationMode};
use super::value_objects::{BriefStatus, OpenTo, SellerSelector};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::DomainEvent;
use crate::domain::framework::{Framework, Lot};
use crate::domain::validation::{normalise_document, reason, FieldErrors};

/// Specialist opportunities accept this many responses per seller unless stated otherwise
pub const DEFAULT_NUMBER_OF_SUPPLIERS: usize = 3;

/// Keys clients may echo back that are owned by the server
const SERVER_OWNED_KEYS: &[&str] = &[
    "id",
    "status",
    "lot",
    "lotSlug",
    "frameworkSlug",
    "frameworkName",
    "createdAt",
    "updatedAt",
    "publishedAt",
    "withdrawnAt",
    "questionsClosedAt",
    "dates",
    "author",
    "sellerSelector",
    "reasonToWithdraw",
    "originalClosedAt",
    "originalQuestionsClosedAt",
];

/// Keys not carried over when an opportunity is copied
const NOT_COPIED_KEYS: &[&str] = &[
    "closedAt",
    "reasonToWithdraw",
    "originalClosedAt",
    "originalQuestionsClosedAt",
];

/// Brief (opportunity) aggregate root
///
/// Status is never stored. It is derived from the lifecycle timestamps, so a
/// live brief closes by itself once `closed_at` passes.
///
/// # Invariants
/// - Transitions only go forward: draft -> live -> {closed, withdrawn}
/// - Closed and withdrawn briefs cannot be edited or re-opened
/// - `questions_closed_at <= closed_at` once published
#[derive(Debug, Clone, PartialEq)]
pub struct Brief {
    id: Uuid,
    framework_id: Uuid,
    lot: Lot,
    data: Value,
    author_id: Uuid,
    team_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    questions_closed_at: Option<DateTime<Utc>>,
    withdrawn_at: Option<DateTime<Utc>>,
}

/// Snapshot of a live brief taken before it was edited
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BriefHistory {
    pub id: Uuid,
    pub brief_id: Uuid,
    pub user_id: Uuid,
    pub edited_at: DateTime<Utc>,
    pub data: Value,
}

/// Changes allowed on a live brief
#[derive(Debug, Clone, Default)]
pub struct LiveEdits {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub closed_on: Option<NaiveDate>,
    /// Sellers to invite in addition to those already invited
    pub sellers: Option<Map<String, Value>>,
}

impl Brief {
    /// Creates a new draft brief
    ///
    /// # Business Rules
    /// - The framework must be live
    /// - Data is normalised and must pass draft validation for the lot
    pub fn new_draft(
        framework: &Framework,
        lot: Lot,
        author_id: Uuid,
        team_id: Option<Uuid>,
        data: Value,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, DomainEvent)> {
        framework.ensure_live()?;

        let mut brief = Self {
            id: Uuid::new_v4(),
            framework_id: framework.id,
            lot,
            data: json!({}),
            author_id,
            team_id,
            created_at: now,
            updated_at: now,
            published_at: None,
            closed_at: None,
            questions_closed_at: None,
            withdrawn_at: None,
        };
        brief.replace_data(merge_data(json!({}), data))?;

        let event = DomainEvent::BriefCreated {
            brief_id: brief.id,
            lot,
        };
        Ok((brief, event))
    }

    /// Status as of `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> BriefStatus {
        if self.withdrawn_at.is_some() {
            BriefStatus::Withdrawn
        } else if self.published_at.is_none() {
            BriefStatus::Draft
        } else if self.closed_at.map_or(false, |closed| closed > now) {
            BriefStatus::Live
        } else {
            BriefStatus::Closed
        }
    }

    pub fn status(&self) -> BriefStatus {
        self.status_at(Utc::now())
    }

    /// Merges `data` into a draft
    ///
    /// Null values clear existing keys; everything else is trimmed and merged.
    pub fn update_draft_data(&mut self, data: Value, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        let status = self.status_at(now);
        if status != BriefStatus::Draft {
            return Err(DomainError::rule(format!(
                "Cannot edit a {} opportunity",
                status
            )));
        }

        self.replace_data(merge_data(self.data.clone(), data))?;
        self.updated_at = now;

        Ok(DomainEvent::BriefUpdated { brief_id: self.id })
    }

    fn replace_data(&mut self, data: Value) -> DomainResult<()> {
        let errors = validate_brief_data(self.lot, &data, ValidationMode::Draft);
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        self.data = data;
        self.derive_seller_selector();
        Ok(())
    }

    /// Keeps `sellerSelector` in line with the invited sellers and audience
    fn derive_seller_selector(&mut self) {
        let selector = match self.lot {
            Lot::Rfx | Lot::Training2 => match self.sellers().len() {
                0 => None,
                1 => Some(SellerSelector::OneSeller),
                _ => Some(SellerSelector::SomeSellers),
            },
            Lot::Specialist => match self.open_to() {
                Some(OpenTo::All) => Some(SellerSelector::AllSellers),
                Some(OpenTo::Selected) => Some(SellerSelector::SomeSellers),
                _ => None,
            },
            Lot::Atm => match self.open_to() {
                Some(OpenTo::All) => Some(SellerSelector::AllSellers),
                _ => None,
            },
        };

        if let Some(map) = self.data.as_object_mut() {
            match selector {
                Some(s) => {
                    map.insert("sellerSelector".to_string(), json!(s.as_str()));
                }
                None => {
                    map.remove("sellerSelector");
                }
            }
        }
    }

    /// Publishes a draft (draft -> live)
    ///
    /// # Business Rules
    /// - Brief must be a draft and the framework live
    /// - Data must be complete for the lot
    /// - Closing and question deadlines come from [`DeadlineRules::closing_dates`]
    pub fn publish(
        &mut self,
        framework: &Framework,
        deadlines: &DeadlineRules,
        now: DateTime<Utc>,
    ) -> DomainResult<DomainEvent> {
        let status = self.status_at(now);
        if !status.can_transition_to(BriefStatus::Live) {
            return Err(DomainError::transition("opportunity", status, BriefStatus::Live));
        }
        framework.ensure_live()?;

        let errors = validate_brief_data(self.lot, &self.data, ValidationMode::Publish);
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let closed_on = self.data_str("closedAt").and_then(parse_day);
        let dates = deadlines.closing_dates(now, closed_on, self.requirements_length())?;

        self.published_at = Some(now);
        self.closed_at = Some(dates.closed_at);
        self.questions_closed_at = Some(dates.questions_closed_at);
        self.updated_at = now;
        self.set_data_key("closedAt", json!(dates.closed_at.date_naive().to_string()));

        Ok(DomainEvent::BriefPublished {
            brief_id: self.id,
            closed_at: dates.closed_at,
        })
    }

    /// Withdraws a live brief (live -> withdrawn); terminal
    pub fn withdraw(&mut self, reason_to_withdraw: &str, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        let status = self.status_at(now);
        if !status.can_transition_to(BriefStatus::Withdrawn) {
            return Err(DomainError::transition(
                "opportunity",
                status,
                BriefStatus::Withdrawn,
            ));
        }

        let reason_to_withdraw = reason_to_withdraw.trim();
        if reason_to_withdraw.is_empty() {
            return Err(DomainError::Validation(FieldErrors::single(
                "reasonToWithdraw",
                reason::ANSWER_REQUIRED,
            )));
        }

        self.withdrawn_at = Some(now);
        self.updated_at = now;
        self.set_data_key("reasonToWithdraw", json!(reason_to_withdraw));

        Ok(DomainEvent::BriefWithdrawn {
            brief_id: self.id,
            reason: reason_to_withdraw.to_string(),
        })
    }

    /// Generic status setter
    ///
    /// Only draft -> live and live -> withdrawn are honoured; setting the
    /// current status is a no-op.
    pub fn set_status(
        &mut self,
        target: BriefStatus,
        framework: &Framework,
        deadlines: &DeadlineRules,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<DomainEvent>> {
        let current = self.status_at(now);
        match (current, target) {
            (c, t) if c == t => Ok(None),
            (BriefStatus::Draft, BriefStatus::Live) => {
                self.publish(framework, deadlines, now).map(Some)
            }
            (BriefStatus::Live, BriefStatus::Withdrawn) => {
                self.withdrawn_at = Some(now);
                self.updated_at = now;
                Ok(Some(DomainEvent::BriefWithdrawn {
                    brief_id: self.id,
                    reason: String::new(),
                }))
            }
            (c, t) => Err(DomainError::transition("opportunity", c, t)),
        }
    }

    /// Whether the brief can be closed before its closing date
    ///
    /// # Arguments
    /// * `submitted_by_invited` - submitted, non-withdrawn responses from the invited seller
    ///
    /// # Business Rules
    /// - rfx/training2 addressed to one seller who has submitted a response
    /// - specialist addressed to one selected seller who has submitted
    ///   `numberOfSuppliers` responses
    pub fn can_close_early(&self, submitted_by_invited: usize, now: DateTime<Utc>) -> bool {
        if self.status_at(now) != BriefStatus::Live || self.sellers().len() != 1 {
            return false;
        }

        match (self.lot, self.seller_selector()) {
            (Lot::Rfx | Lot::Training2, Some(SellerSelector::OneSeller)) => {
                submitted_by_invited >= 1
            }
            (Lot::Specialist, Some(SellerSelector::SomeSellers)) => {
                submitted_by_invited >= self.number_of_suppliers()
            }
            _ => false,
        }
    }

    /// Closes a live brief early (live -> closed)
    pub fn close_early(&mut self, submitted_by_invited: usize, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        let status = self.status_at(now);
        if !status.can_transition_to(BriefStatus::Closed) {
            return Err(DomainError::transition("opportunity", status, BriefStatus::Closed));
        }
        if !self.can_close_early(submitted_by_invited, now) {
            return Err(DomainError::rule(format!(
                "Unable to close opportunity {} early",
                self.id
            )));
        }

        if let Some(questions) = self.questions_closed_at {
            self.set_data_key("originalQuestionsClosedAt", json!(questions.to_rfc3339()));
        }
        if let Some(closed) = self.closed_at {
            self.set_data_key("originalClosedAt", json!(closed.to_rfc3339()));
        }
        self.set_data_key("closedAt", json!(now.date_naive().to_string()));

        let questions_close = now - Duration::seconds(1);
        self.questions_closed_at = Some(
            self.questions_closed_at
                .map_or(questions_close, |q| q.min(questions_close)),
        );
        self.closed_at = Some(now);
        self.updated_at = now;

        Ok(DomainEvent::BriefClosedEarly { brief_id: self.id })
    }

    /// Edits a live brief, returning a snapshot of the data before the edit
    ///
    /// # Business Rules
    /// - Only live briefs can be edited this way
    /// - Title and summary cannot be blanked
    /// - The closing date can only move later, and not past 365 days from publication
    /// - Sellers can be added but not removed
    pub fn edit_live(
        &mut self,
        edits: LiveEdits,
        user_id: Uuid,
        deadlines: &DeadlineRules,
        now: DateTime<Utc>,
    ) -> DomainResult<(BriefHistory, DomainEvent)> {
        let status = self.status_at(now);
        if status != BriefStatus::Live {
            return Err(DomainError::rule(format!(
                "Cannot edit a {} opportunity",
                status
            )));
        }

        let mut errors = FieldErrors::new();
        let mut changed = Vec::new();
        let mut next = self.clone();

        for (field, value) in [("title", edits.title), ("summary", edits.summary)] {
            let Some(value) = value else { continue };
            let value = value.trim().to_string();
            if value.is_empty() {
                errors.add(field, reason::ANSWER_REQUIRED);
            } else if next.data_str(field) != Some(value.as_str()) {
                next.set_data_key(field, json!(value));
                changed.push(field.to_string());
            }
        }

        if let Some(day) = edits.closed_on {
            let closed_at = deadlines.at_deadline(day);
            let current = self.closed_at.unwrap_or(now);
            let latest = self.published_at.unwrap_or(now) + Duration::days(MAX_OPEN_DAYS);
            if closed_at <= current || closed_at <= now {
                errors.add("closedAt", reason::CLOSING_DATE_TOO_SOON);
            } else if closed_at > latest {
                errors.add("closedAt", reason::CLOSING_DATE_TOO_LATE);
            } else {
                next.closed_at = Some(closed_at);
                next.set_data_key("closedAt", json!(day.to_string()));
                changed.push("closedAt".to_string());
            }
        }

        if let Some(new_sellers) = edits.sellers {
            if new_sellers.keys().any(|id| Uuid::parse_str(id).is_err()) {
                errors.add("sellers", reason::INVALID_VALUE);
            } else {
                let mut sellers = next
                    .data
                    .get("sellers")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let before = sellers.len();
                for (id, seller) in new_sellers {
                    sellers.entry(id).or_insert(seller);
                }
                if sellers.len() != before {
                    next.set_data_key("sellers", Value::Object(sellers));
                    next.derive_seller_selector();
                    changed.push("sellers".to_string());
                }
            }
        }

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        if changed.is_empty() {
            return Err(DomainError::rule("No changes were made to the opportunity"));
        }

        let history = BriefHistory {
            id: Uuid::new_v4(),
            brief_id: self.id,
            user_id,
            edited_at: now,
            data: self.history_snapshot(),
        };

        next.updated_at = now;
        *self = next;

        Ok((
            history,
            DomainEvent::BriefEdited {
                brief_id: self.id,
                changed,
            },
        ))
    }

    fn history_snapshot(&self) -> Value {
        let mut snapshot = self.data.clone();
        if let Some(map) = snapshot.as_object_mut() {
            if let Some(closed) = self.closed_at {
                map.insert("closedAtTimestamp".to_string(), json!(closed));
            }
            if let Some(questions) = self.questions_closed_at {
                map.insert("questionsClosedAt".to_string(), json!(questions));
            }
        }
        snapshot
    }

    /// Makes a new draft from this brief
    ///
    /// # Business Rules
    /// - The framework must still be live
    /// - Closing and withdrawal details are not copied
    pub fn copy(
        &self,
        framework: &Framework,
        author_id: Uuid,
        team_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DomainResult<(Brief, DomainEvent)> {
        framework.ensure_live()?;

        let mut data = self.data.clone();
        if let Some(map) = data.as_object_mut() {
            for key in NOT_COPIED_KEYS {
                map.remove(*key);
            }
        }

        let (copy, _) = Brief::new_draft(framework, self.lot, author_id, team_id, data, now)?;
        let event = DomainEvent::BriefCopied {
            brief_id: copy.id,
            source_id: self.id,
        };
        Ok((copy, event))
    }

    /// Checks that the brief can be deleted; only drafts can
    pub fn delete(&self, now: DateTime<Utc>) -> DomainResult<DomainEvent> {
        let status = self.status_at(now);
        if status != BriefStatus::Draft {
            return Err(DomainError::rule(format!(
                "Cannot delete a {} opportunity",
                status
            )));
        }
        Ok(DomainEvent::BriefDeleted { brief_id: self.id })
    }

    fn set_data_key(&mut self, key: &str, value: Value) {
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    // ===== Data accessors =====

    pub fn title(&self) -> &str {
        self.data_str("title").unwrap_or_default()
    }

    pub fn seller_selector(&self) -> Option<SellerSelector> {
        self.data_str("sellerSelector").and_then(SellerSelector::parse)
    }

    pub fn open_to(&self) -> Option<OpenTo> {
        self.data_str("openTo").and_then(OpenTo::parse)
    }

    /// Supplier ids of the invited sellers
    pub fn sellers(&self) -> Vec<Uuid> {
        self.data
            .get("sellers")
            .and_then(Value::as_object)
            .map(|sellers| {
                sellers
                    .keys()
                    .filter_map(|id| Uuid::parse_str(id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn seller_category(&self) -> Option<Uuid> {
        self.data_str("sellerCategory")
            .and_then(|c| Uuid::parse_str(c).ok())
    }

    pub fn seller_email(&self) -> Option<String> {
        self.data_str("sellerEmail").map(str::to_lowercase)
    }

    pub fn seller_email_list(&self) -> Vec<String> {
        self.data
            .get("sellerEmailList")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Responses allowed per seller for specialist briefs
    pub fn number_of_suppliers(&self) -> usize {
        self.data
            .get("numberOfSuppliers")
            .and_then(as_number)
            .filter(|n| *n >= 1.0)
            .map_or(DEFAULT_NUMBER_OF_SUPPLIERS, |n| n as usize)
    }

    pub fn requirements_length(&self) -> Option<&str> {
        self.data_str("requirementsLength")
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn framework_id(&self) -> Uuid {
        self.framework_id
    }

    pub fn lot(&self) -> Lot {
        self.lot
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn team_id(&self) -> Option<Uuid> {
        self.team_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn questions_closed_at(&self) -> Option<DateTime<Utc>> {
        self.questions_closed_at
    }

    pub fn withdrawn_at(&self) -> Option<DateTime<Utc>> {
        self.withdrawn_at
    }

    /// Reconstitutes a Brief from persistence
    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        framework_id: Uuid,
        lot: Lot,
        data: Value,
        author_id: Uuid,
        team_id: Option<Uuid>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        published_at: Option<DateTime<Utc>>,
        closed_at: Option<DateTime<Utc>>,
        questions_closed_at: Option<DateTime<Utc>>,
        withdrawn_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            framework_id,
            lot,
            data,
            author_id,
            team_id,
            created_at,
            updated_at,
            published_at,
            closed_at,
            questions_closed_at,
            withdrawn_at,
        }
    }
}

/// Shallow merge of `incoming` into `existing`; nulls remove keys
fn merge_data(existing: Value, incoming: Value) -> Value {
    let mut merged = match existing {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    if let Value::Object(incoming) = incoming {
        let cleared: Vec<String> = incoming
            .iter()
            .filter(|(_, v)| v.is_null())
            .map(|(k, _)| k.clone())
            .collect();
        for key in cleared {
            merged.remove(&key);
        }

        if let Value::Object(cleaned) = normalise_document(Value::Object(incoming), SERVER_OWNED_KEYS) {
            merged.extend(cleaned);
        }
    }

    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::framework::FrameworkStatus;
    use chrono::TimeZone;

    fn framework(status: FrameworkStatus) -> Framework {
        Framework {
            id: Uuid::new_v4(),
            slug: "digital-marketplace".to_string(),
            name: "Digital Marketplace".to_string(),
            status,
        }
    }

    fn live_framework() -> Framework {
        framework(FrameworkStatus::Live)
    }

    // Monday 2024-03-04 09:00 UTC
    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn rfx_data(sellers: &[Uuid]) -> Value {
        let sellers: Map<String, Value> = sellers
            .iter()
            .map(|id| (id.to_string(), json!({ "name": "Seller" })))
            .collect();
        json!({
            "title": "Cloud migration",
            "organisation": "Department of Things",
            "summary": "Move workloads to the cloud",
            "location": ["ACT"],
            "sellerCategory": Uuid::new_v4().to_string(),
            "sellers": sellers,
            "startDate": "ASAP",
            "contractLength": "6 months",
            "evaluationCriteria": [{ "criteria": "Experience" }],
            "evaluationType": ["Written proposal"],
            "requirementsDocument": ["requirements.pdf"],
            "workingArrangements": "Onsite",
            "contactNumber": "02 6123 4567",
            "closedAt": "2024-03-15"
        })
    }

    fn specialist_data(seller: Uuid, number_of_suppliers: u32) -> Value {
        json!({
            "title": "Senior developer",
            "organisation": "Department of Things",
            "summary": "Build services",
            "location": ["NSW"],
            "openTo": "selected",
            "sellerCategory": Uuid::new_v4().to_string(),
            "sellers": { (seller.to_string()): { "name": "Seller" } },
            "numberOfSuppliers": number_of_suppliers,
            "essentialRequirements": [{ "criteria": "Rust" }],
            "maxRate": "1200",
            "startDate": "2024-04-01",
            "contractLength": "12 months",
            "securityClearance": "none",
            "contactNumber": "02 6123 4567",
            "closedAt": "2024-03-15"
        })
    }

    fn draft(lot: Lot, data: Value) -> Brief {
        let (brief, _) =
            Brief::new_draft(&live_framework(), lot, Uuid::new_v4(), None, data, monday()).unwrap();
        brief
    }

    fn live_rfx(sellers: &[Uuid]) -> Brief {
        let mut brief = draft(Lot::Rfx, rfx_data(sellers));
        brief
            .publish(&live_framework(), &DeadlineRules::default(), monday())
            .unwrap();
        brief
    }

    #[test]
    fn new_draft_requires_live_framework() {
        let result = Brief::new_draft(
            &framework(FrameworkStatus::Expired),
            Lot::Rfx,
            Uuid::new_v4(),
            None,
            json!({}),
            monday(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn new_draft_is_draft_and_emits_created() {
        let (brief, event) = Brief::new_draft(
            &live_framework(),
            Lot::Atm,
            Uuid::new_v4(),
            None,
            json!({ "title": "  Ask  " }),
            monday(),
        )
        .unwrap();

        assert_eq!(brief.status_at(monday()), BriefStatus::Draft);
        assert_eq!(brief.title(), "Ask");
        assert!(matches!(event, DomainEvent::BriefCreated { lot: Lot::Atm, .. }));
    }

    #[test]
    fn update_draft_merges_and_clears_with_null() {
        let mut brief = draft(Lot::Atm, json!({ "title": "Ask", "summary": "Old" }));

        brief
            .update_draft_data(json!({ "summary": null, "outcome": " Better " , "id": 99 }), monday())
            .unwrap();

        assert_eq!(brief.data()["title"], "Ask");
        assert_eq!(brief.data()["outcome"], "Better");
        assert!(brief.data().get("summary").is_none());
        assert!(brief.data().get("id").is_none());
    }

    #[test]
    fn update_draft_rejects_unknown_fields() {
        let mut brief = draft(Lot::Atm, json!({}));
        let err = brief
            .update_draft_data(json!({ "madeUp": true }), monday())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.get("madeUp") == Some(reason::UNEXPECTED_FIELD)));
    }

    #[test]
    fn seller_selector_follows_invited_sellers() {
        let one = draft(Lot::Rfx, rfx_data(&[Uuid::new_v4()]));
        let two = draft(Lot::Rfx, rfx_data(&[Uuid::new_v4(), Uuid::new_v4()]));
        let open = draft(Lot::Atm, json!({ "openTo": "all" }));

        assert_eq!(one.seller_selector(), Some(SellerSelector::OneSeller));
        assert_eq!(two.seller_selector(), Some(SellerSelector::SomeSellers));
        assert_eq!(open.seller_selector(), Some(SellerSelector::AllSellers));
    }

    #[test]
    fn publish_sets_dates_and_goes_live() {
        let brief = live_rfx(&[Uuid::new_v4()]);

        assert_eq!(brief.status_at(monday()), BriefStatus::Live);
        assert_eq!(brief.published_at(), Some(monday()));
        assert_eq!(
            brief.closed_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap())
        );
        assert!(brief.questions_closed_at() <= brief.closed_at());
    }

    #[test]
    fn publish_requires_live_framework() {
        let mut brief = draft(Lot::Rfx, rfx_data(&[Uuid::new_v4()]));
        let result = brief.publish(
            &framework(FrameworkStatus::Standstill),
            &DeadlineRules::default(),
            monday(),
        );

        assert!(result.is_err());
        assert_eq!(brief.status_at(monday()), BriefStatus::Draft);
    }

    #[test]
    fn publish_incomplete_reports_fields() {
        let mut brief = draft(Lot::Rfx, json!({ "title": "Only a title" }));
        let err = brief
            .publish(&live_framework(), &DeadlineRules::default(), monday())
            .unwrap_err();

        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.get("summary"), Some(reason::ANSWER_REQUIRED));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(brief.published_at().is_none());
    }

    #[test]
    fn publish_without_closing_date_uses_requirements_length() {
        let mut data = rfx_data(&[Uuid::new_v4()]);
        data.as_object_mut().unwrap().remove("closedAt");
        data["requirementsLength"] = json!("1 week");
        let mut brief = draft(Lot::Rfx, data);

        brief
            .publish(&live_framework(), &DeadlineRules::default(), monday())
            .unwrap();

        assert_eq!(
            brief.closed_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 11, 18, 0, 0).unwrap())
        );
        assert_eq!(brief.data()["closedAt"], "2024-03-11");
    }

    #[test]
    fn live_brief_closes_after_closing_time() {
        let brief = live_rfx(&[Uuid::new_v4()]);
        let after = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();

        assert_eq!(brief.status_at(after), BriefStatus::Closed);
    }

    #[test]
    fn publishing_twice_fails() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);
        let err = brief
            .publish(&live_framework(), &DeadlineRules::default(), monday())
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Cannot change opportunity status from 'live' to 'live'"
        );
    }

    #[test]
    fn live_brief_rejects_draft_edits() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);
        assert!(brief
            .update_draft_data(json!({ "title": "New" }), monday())
            .is_err());
    }

    #[test]
    fn withdraw_requires_reason() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);

        let err = brief.withdraw("   ", monday()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        brief.withdraw("Funding cut", monday()).unwrap();
        assert_eq!(brief.status_at(monday()), BriefStatus::Withdrawn);
        assert_eq!(brief.data()["reasonToWithdraw"], "Funding cut");
    }

    #[test]
    fn withdrawn_brief_is_terminal() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);
        brief.withdraw("Funding cut", monday()).unwrap();

        assert!(brief.withdraw("Again", monday()).is_err());
        assert!(brief
            .update_draft_data(json!({ "title": "x" }), monday())
            .is_err());
        assert!(brief
            .publish(&live_framework(), &DeadlineRules::default(), monday())
            .is_err());
        assert!(brief
            .edit_live(
                LiveEdits {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
                Uuid::new_v4(),
                &DeadlineRules::default(),
                monday()
            )
            .is_err());
    }

    #[test]
    fn withdrawing_a_draft_fails() {
        let mut brief = draft(Lot::Rfx, rfx_data(&[Uuid::new_v4()]));
        let err = brief.withdraw("reason", monday()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot change opportunity status from 'draft' to 'withdrawn'"
        );
    }

    #[test]
    fn set_status_honours_only_forward_paths() {
        let framework = live_framework();
        let rules = DeadlineRules::default();
        let mut brief = draft(Lot::Rfx, rfx_data(&[Uuid::new_v4()]));

        let err = brief
            .set_status(BriefStatus::Closed, &framework, &rules, monday())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot change opportunity status from 'draft' to 'closed'"
        );

        assert!(brief
            .set_status(BriefStatus::Live, &framework, &rules, monday())
            .unwrap()
            .is_some());
        assert!(brief
            .set_status(BriefStatus::Live, &framework, &rules, monday())
            .unwrap()
            .is_none());
        assert!(brief
            .set_status(BriefStatus::Draft, &framework, &rules, monday())
            .is_err());
        assert!(brief
            .set_status(BriefStatus::Withdrawn, &framework, &rules, monday())
            .unwrap()
            .is_some());
        assert_eq!(brief.status_at(monday()), BriefStatus::Withdrawn);
    }

    #[test]
    fn close_early_single_rfx_seller_after_response() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);
        let later = monday() + Duration::hours(2);

        assert!(!brief.can_close_early(0, later));
        assert!(brief.close_early(0, later).is_err());

        brief.close_early(1, later).unwrap();

        assert_eq!(brief.status_at(later), BriefStatus::Closed);
        assert_eq!(brief.closed_at(), Some(later));
        assert!(brief.questions_closed_at().unwrap() < later);
        assert!(brief.data().get("originalClosedAt").is_some());
        assert_eq!(brief.data()["closedAt"], "2024-03-04");
    }

    #[test]
    fn close_early_not_for_several_sellers() {
        let brief = live_rfx(&[Uuid::new_v4(), Uuid::new_v4()]);
        assert!(!brief.can_close_early(2, monday()));
    }

    #[test]
    fn close_early_specialist_needs_all_responses() {
        let mut brief = draft(Lot::Specialist, specialist_data(Uuid::new_v4(), 2));
        brief
            .publish(&live_framework(), &DeadlineRules::default(), monday())
            .unwrap();

        assert!(!brief.can_close_early(1, monday()));
        assert!(brief.can_close_early(2, monday()));
    }

    #[test]
    fn edit_live_records_history() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);
        let editor = Uuid::new_v4();
        let original = brief.data().clone();

        let (history, event) = brief
            .edit_live(
                LiveEdits {
                    title: Some("Cloud migration phase 2".to_string()),
                    closed_on: NaiveDate::from_ymd_opt(2024, 3, 22),
                    sellers: Some(
                        [(Uuid::new_v4().to_string(), json!({ "name": "New" }))]
                            .into_iter()
                            .collect(),
                    ),
                    ..Default::default()
                },
                editor,
                &DeadlineRules::default(),
                monday(),
            )
            .unwrap();

        assert_eq!(history.user_id, editor);
        assert_eq!(history.data["title"], original["title"]);
        assert_eq!(brief.title(), "Cloud migration phase 2");
        assert_eq!(brief.sellers().len(), 2);
        assert_eq!(brief.seller_selector(), Some(SellerSelector::SomeSellers));
        assert_eq!(
            brief.closed_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 22, 18, 0, 0).unwrap())
        );
        match event {
            DomainEvent::BriefEdited { changed, .. } => {
                assert_eq!(changed, vec!["title", "closedAt", "sellers"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn edit_live_cannot_bring_closing_forward() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);
        let before = brief.clone();

        let err = brief
            .edit_live(
                LiveEdits {
                    closed_on: NaiveDate::from_ymd_opt(2024, 3, 8),
                    ..Default::default()
                },
                Uuid::new_v4(),
                &DeadlineRules::default(),
                monday(),
            )
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(brief, before);
    }

    #[test]
    fn edit_live_without_changes_fails() {
        let mut brief = live_rfx(&[Uuid::new_v4()]);
        let result = brief.edit_live(
            LiveEdits {
                title: Some("Cloud migration".to_string()),
                ..Default::default()
            },
            Uuid::new_v4(),
            &DeadlineRules::default(),
            monday(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn copy_makes_a_fresh_draft() {
        let mut source = live_rfx(&[Uuid::new_v4()]);
        source.withdraw("Re-scoping", monday()).unwrap();
        let author = Uuid::new_v4();

        let (copy, event) = source
            .copy(&live_framework(), author, None, monday())
            .unwrap();

        assert_ne!(copy.id(), source.id());
        assert_eq!(copy.status_at(monday()), BriefStatus::Draft);
        assert_eq!(copy.author_id(), author);
        assert_eq!(copy.title(), source.title());
        assert!(copy.data().get("closedAt").is_none());
        assert!(copy.data().get("reasonToWithdraw").is_none());
        assert!(matches!(event, DomainEvent::BriefCopied { source_id, .. } if source_id == source.id()));
    }

    #[test]
    fn copy_requires_live_framework() {
        let source = draft(Lot::Rfx, json!({}));
        assert!(source
            .copy(&framework(FrameworkStatus::Expired), Uuid::new_v4(), None, monday())
            .is_err());
    }

    #[test]
    fn only_drafts_can_be_deleted() {
        assert!(draft(Lot::Atm, json!({})).delete(monday()).is_ok());
        assert!(live_rfx(&[Uuid::new_v4()]).delete(monday()).is_err());
    }

    #[test]
    fn number_of_suppliers_defaults_to_three() {
        assert_eq!(draft(Lot::Specialist, json!({})).number_of_suppliers(), 3);
        assert_eq!(
            draft(Lot::Specialist, json!({ "numberOfSuppliers": "5" })).number_of_suppliers(),
            5
        );
    }
}
