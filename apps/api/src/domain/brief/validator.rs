use chrono::NaiveDate;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::deadlines::REQUIREMENTS_LENGTHS;
use super::value_objects::OpenTo;
use crate::domain::framework::Lot;
use crate::domain::user::Email;
use crate::domain::validation::{is_blank, reason, FieldErrors};

/// Upper bound on `numberOfSuppliers` for specialist opportunities
pub const MAX_SPECIALIST_SUPPLIERS: u64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Saving a draft: shape checks only
    Draft,
    /// Publishing: shape checks plus completeness
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    List,
    Object,
    Bool,
    Number,
}

const COMMON_FIELDS: &[(&str, Kind)] = &[
    ("title", Kind::Text),
    ("organisation", Kind::Text),
    ("summary", Kind::Text),
    ("location", Kind::List),
    ("closedAt", Kind::Text),
    ("contactNumber", Kind::Text),
    ("sellerSelector", Kind::Text),
    ("sellers", Kind::Object),
    ("sellerCategory", Kind::Text),
    ("sellerEmail", Kind::Text),
    ("sellerEmailList", Kind::List),
    ("attachments", Kind::List),
    ("startDate", Kind::Text),
    ("contractLength", Kind::Text),
    ("contractExtensions", Kind::Text),
    ("budgetRange", Kind::Text),
    ("securityClearance", Kind::Text),
    ("evaluationCriteria", Kind::List),
    ("evaluationType", Kind::List),
    ("includeWeightings", Kind::Bool),
    ("areaOfExpertise", Kind::Text),
    ("requirementsLength", Kind::Text),
    ("industryBriefing", Kind::Text),
    ("internalReference", Kind::Text),
    ("comprehensiveTerms", Kind::Bool),
    ("reasonToWithdraw", Kind::Text),
    ("originalClosedAt", Kind::Text),
    ("originalQuestionsClosedAt", Kind::Text),
];

const RFX_FIELDS: &[(&str, Kind)] = &[
    ("workingArrangements", Kind::Text),
    ("requirementsDocument", Kind::List),
    ("responseTemplate", Kind::List),
    ("proposalType", Kind::List),
];

const ATM_FIELDS: &[(&str, Kind)] = &[
    ("openTo", Kind::Text),
    ("backgroundInformation", Kind::Text),
    ("outcome", Kind::Text),
    ("endUsers", Kind::Text),
    ("workAlreadyDone", Kind::Text),
    ("timeframeConstraints", Kind::Text),
    ("responseFormats", Kind::Object),
];

const SPECIALIST_FIELDS: &[(&str, Kind)] = &[
    ("openTo", Kind::Text),
    ("numberOfSuppliers", Kind::Number),
    ("essentialRequirements", Kind::List),
    ("niceToHaveRequirements", Kind::List),
    ("maxRate", Kind::Number),
    ("preferredFormatForRates", Kind::Text),
];

const RFX_REQUIRED: &[&str] = &[
    "title",
    "organisation",
    "summary",
    "location",
    "sellerCategory",
    "sellers",
    "startDate",
    "contractLength",
    "evaluationCriteria",
    "evaluationType",
    "requirementsDocument",
    "workingArrangements",
    "contactNumber",
];

const ATM_REQUIRED: &[&str] = &[
    "title",
    "organisation",
    "summary",
    "location",
    "openTo",
    "backgroundInformation",
    "outcome",
    "endUsers",
    "startDate",
    "evaluationCriteria",
    "contactNumber",
];

const SPECIALIST_REQUIRED: &[&str] = &[
    "title",
    "organisation",
    "summary",
    "location",
    "openTo",
    "sellerCategory",
    "numberOfSuppliers",
    "essentialRequirements",
    "maxRate",
    "startDate",
    "contractLength",
    "securityClearance",
    "contactNumber",
];

fn lot_fields(lot: Lot) -> &'static [(&'static str, Kind)] {
    match lot {
        Lot::Rfx | Lot::Training2 => RFX_FIELDS,
        Lot::Atm => ATM_FIELDS,
        Lot::Specialist => SPECIALIST_FIELDS,
    }
}

fn required_fields(lot: Lot) -> &'static [&'static str] {
    match lot {
        Lot::Rfx | Lot::Training2 => RFX_REQUIRED,
        Lot::Atm => ATM_REQUIRED,
        Lot::Specialist => SPECIALIST_REQUIRED,
    }
}

fn kind_of(lot: Lot, field: &str) -> Option<Kind> {
    COMMON_FIELDS
        .iter()
        .chain(lot_fields(lot))
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
}

fn has_kind(value: &Value, kind: Kind) -> bool {
    match kind {
        Kind::Text => value.is_string(),
        Kind::List => value.is_array(),
        Kind::Object => value.is_object(),
        Kind::Bool => value.is_boolean(),
        Kind::Number => {
            value.is_number()
                || value
                    .as_str()
                    .map_or(false, |s| s.trim().parse::<f64>().is_ok())
        }
    }
}

/// Reads a number that may have been submitted as text
pub fn as_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Parses a `closedAt` style calendar date
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Validates an opportunity document for a lot
///
/// # Returns
/// Field name to reason code for every failure; empty when valid.
///
/// # Business Rules
/// - Only fields known for the lot are accepted
/// - Each field must have the expected JSON type
/// - Publishing additionally requires every mandatory field for the lot,
///   a seller scope matching the audience and well-formed evaluation criteria
pub fn validate_brief_data(lot: Lot, data: &Value, mode: ValidationMode) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let Some(map) = data.as_object() else {
        errors.add("data", reason::INVALID_TYPE);
        return errors;
    };

    for (field, value) in map {
        match kind_of(lot, field) {
            None => errors.add(field.as_str(), reason::UNEXPECTED_FIELD),
            Some(kind) if !has_kind(value, kind) => errors.add(field.as_str(), reason::INVALID_TYPE),
            Some(_) => {}
        }
    }

    check_formats(lot, map, &mut errors);

    if mode == ValidationMode::Publish {
        for field in required_fields(lot) {
            if is_blank(map.get(*field)) {
                errors.add(*field, reason::ANSWER_REQUIRED);
            }
        }
        check_audience(lot, map, &mut errors);
        check_criteria(map, "evaluationCriteria", &mut errors);
        check_criteria(map, "essentialRequirements", &mut errors);
    }

    errors
}

fn check_formats(lot: Lot, map: &Map<String, Value>, errors: &mut FieldErrors) {
    if let Some(closed) = map.get("closedAt").and_then(Value::as_str) {
        if parse_day(closed).is_none() {
            errors.add("closedAt", reason::INVALID_DATE);
        }
    }

    if let Some(length) = map.get("requirementsLength").and_then(Value::as_str) {
        if !REQUIREMENTS_LENGTHS.contains(&length) {
            errors.add("requirementsLength", reason::INVALID_VALUE);
        }
    }

    if let Some(category) = map.get("sellerCategory").and_then(Value::as_str) {
        if !category.is_empty() && Uuid::parse_str(category).is_err() {
            errors.add("sellerCategory", reason::INVALID_VALUE);
        }
    }

    if let Some(sellers) = map.get("sellers").and_then(Value::as_object) {
        if sellers.keys().any(|id| Uuid::parse_str(id).is_err()) {
            errors.add("sellers", reason::INVALID_VALUE);
        }
    }

    if let Some(open_to) = map.get("openTo").and_then(Value::as_str) {
        let allowed = match lot {
            Lot::Atm => matches!(OpenTo::parse(open_to), Some(OpenTo::All | OpenTo::Category)),
            Lot::Specialist => {
                matches!(OpenTo::parse(open_to), Some(OpenTo::All | OpenTo::Selected))
            }
            Lot::Rfx | Lot::Training2 => false,
        };
        if !allowed {
            errors.add("openTo", reason::INVALID_VALUE);
        }
    }

    if let Some(count) = map.get("numberOfSuppliers").and_then(as_number) {
        if count < 1.0 || count > MAX_SPECIALIST_SUPPLIERS as f64 || count.fract() != 0.0 {
            errors.add("numberOfSuppliers", reason::INVALID_VALUE);
        }
    }

    if let Some(email) = map.get("sellerEmail").and_then(Value::as_str) {
        if !Email::is_valid(&email.to_lowercase()) {
            errors.add("sellerEmail", reason::INVALID_EMAIL);
        }
    }

    if let Some(list) = map.get("sellerEmailList").and_then(Value::as_array) {
        let all_valid = list
            .iter()
            .all(|e| e.as_str().map_or(false, |s| Email::is_valid(&s.to_lowercase())));
        if !all_valid {
            errors.add("sellerEmailList", reason::INVALID_EMAIL);
        }
    }
}

fn check_audience(lot: Lot, map: &Map<String, Value>, errors: &mut FieldErrors) {
    let open_to = map.get("openTo").and_then(Value::as_str).and_then(OpenTo::parse);
    match (lot, open_to) {
        (Lot::Atm, Some(OpenTo::Category)) => {
            if is_blank(map.get("sellerCategory")) {
                errors.add("sellerCategory", reason::ANSWER_REQUIRED);
            }
        }
        (Lot::Specialist, Some(OpenTo::Selected)) => {
            if is_blank(map.get("sellers")) {
                errors.add("sellers", reason::ANSWER_REQUIRED);
            }
        }
        _ => {}
    }
}

fn check_criteria(map: &Map<String, Value>, field: &str, errors: &mut FieldErrors) {
    let Some(items) = map.get(field).and_then(Value::as_array) else {
        return;
    };

    let complete = items.iter().all(|item| !is_blank(item.get("criteria")));
    if !complete {
        errors.add(field, reason::ANSWER_REQUIRED);
        return;
    }

    let weighted = map
        .get("includeWeightings")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if field == "evaluationCriteria" && weighted {
        let weights: Option<Vec<f64>> = items
            .iter()
            .map(|item| item.get("weighting").and_then(as_number))
            .collect();
        let valid = weights.map_or(false, |w| {
            w.iter().all(|x| *x > 0.0) && (w.iter().sum::<f64>() - 100.0).abs() < 0.001
        });
        if !valid {
            errors.add(field, reason::WEIGHTINGS_MUST_TOTAL_100);
        }
    }
}
