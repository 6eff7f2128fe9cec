use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Reason codes reported per field when a JSON document fails validation.
pub mod reason {
    pub const ANSWER_REQUIRED: &str = "answer_required";
    pub const INVALID_TYPE: &str = "invalid_type";
    pub const UNEXPECTED_FIELD: &str = "unexpected_field";
    pub const INVALID_DATE: &str = "invalid_date";
    pub const CLOSING_DATE_TOO_SOON: &str = "closing_date_too_soon";
    pub const CLOSING_DATE_TOO_LATE: &str = "closing_date_too_late";
    pub const INVALID_EMAIL: &str = "invalid_email";
    pub const INVALID_VALUE: &str = "invalid_value";
    pub const UNDER_CHARACTER_LIMIT: &str = "under_character_limit";
    pub const WEIGHTINGS_MUST_TOTAL_100: &str = "weightings_must_total_100";
}

/// Field name to reason code mapping, e.g. `title -> answer_required`.
///
/// Serialises as a flat JSON object so it can be returned to clients as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `field`. The first reason recorded for a field wins.
    pub fn add(&mut self, field: impl Into<String>, reason: &str) {
        self.0.entry(field.into()).or_insert_with(|| reason.to_string());
    }

    pub fn single(field: impl Into<String>, reason: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, reason);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, reason) in other.0 {
            self.0.entry(field).or_insert(reason);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A step-oriented validation message, as shown to users filling in
/// multi-step forms (team setup, supplier profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub id: String,
    pub message: String,
    pub step: String,
    pub severity: Severity,
}

impl ValidationMessage {
    pub fn error(id: &str, step: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            message: message.into(),
            step: step.to_string(),
            severity: Severity::Error,
        }
    }

    pub fn warning(id: &str, step: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            message: message.into(),
            step: step.to_string(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Keeps only the messages with error severity.
pub fn errors_only(messages: Vec<ValidationMessage>) -> Vec<ValidationMessage> {
    messages.into_iter().filter(ValidationMessage::is_error).collect()
}

/// Normalises a free-form JSON document before it is stored.
///
/// Top-level keys in `drop_keys` are removed, strings are trimmed and nulls are
/// purged at every depth. Anything that is not an object becomes an empty object.
pub fn normalise_document(data: Value, drop_keys: &[&str]) -> Value {
    let Value::Object(map) = data else {
        return Value::Object(Map::new());
    };

    let cleaned = map
        .into_iter()
        .filter(|(key, _)| !drop_keys.contains(&key.as_str()))
        .filter_map(|(key, value)| normalise_value(value).map(|v| (key, v)))
        .collect();

    Value::Object(cleaned)
}

fn normalise_value(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Value::String(s.trim().to_string())),
        Value::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(normalise_value).collect(),
        )),
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| normalise_value(v).map(|v| (k, v)))
                .collect(),
        )),
        other => Some(other),
    }
}

/// True when the value is absent, null, blank text, or an empty list/object.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_reason_for_a_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("title", reason::ANSWER_REQUIRED);
        errors.add("title", reason::INVALID_TYPE);

        assert_eq!(errors.get("title"), Some("answer_required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn field_errors_serialise_flat() {
        let errors = FieldErrors::single("summary", reason::UNDER_CHARACTER_LIMIT);
        let value = serde_json::to_value(&errors).unwrap();

        assert_eq!(value, json!({ "summary": "under_character_limit" }));
    }

    #[test]
    fn normalise_trims_and_purges_nulls() {
        let data = json!({
            "title": "  Build a thing ",
            "links": null,
            "nested": { "a": null, "b": " x " },
            "list": [" y ", null],
            "id": 10
        });

        let cleaned = normalise_document(data, &["id"]);

        assert_eq!(
            cleaned,
            json!({ "title": "Build a thing", "nested": { "b": "x" }, "list": ["y"] })
        );
    }

    #[test]
    fn normalise_non_object_becomes_empty() {
        assert_eq!(normalise_document(json!([1, 2]), &[]), json!({}));
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!("   "))));
        assert!(is_blank(Some(&json!([]))));
        assert!(!is_blank(Some(&json!(false))));
        assert!(!is_blank(Some(&json!("x"))));
    }

    #[test]
    fn errors_only_drops_warnings() {
        let messages = vec![
            ValidationMessage::error("T001", "about", "A team name is required."),
            ValidationMessage::warning("S014", "recruiter", "Licence expired"),
        ];

        let errors = errors_only(messages);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, "T001");
    }
}
