use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use uuid::Uuid;

use super::framework::Domain;
use super::user::Email;
use super::validation::{is_blank, ValidationMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "supplier_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Limited,
    Complete,
    Deleted,
}

/// Assessment state of a supplier in one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "supplier_domain_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SupplierDomainStatus {
    Unassessed,
    Assessed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "price_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PriceStatus {
    Approved,
    Rejected,
    Unassessed,
}

/// `data.recruiter`: whether a supplier is a recruiter, a consultancy, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecruiterKind {
    Yes,
    No,
    Both,
}

impl FromStr for RecruiterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(RecruiterKind::Yes),
            "no" => Ok(RecruiterKind::No),
            "both" => Ok(RecruiterKind::Both),
            other => Err(format!("Unknown recruiter value: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierDomain {
    pub domain_id: Uuid,
    pub domain_name: String,
    pub status: SupplierDomainStatus,
    pub price_status: PriceStatus,
}

/// Seller organisation
#[derive(Debug, Clone, PartialEq)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub status: SupplierStatus,
    pub data: Value,
    pub domains: Vec<SupplierDomain>,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    /// Builds a new supplier from approved application data
    ///
    /// New suppliers start `limited` until their profile is completed.
    pub fn from_application(data: &Value, now: DateTime<Utc>) -> Self {
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            id: Uuid::new_v4(),
            name,
            status: SupplierStatus::Limited,
            data: data.clone(),
            domains: Vec::new(),
            created_at: now,
        }
    }

    /// Merges approved edit data into the profile; keys present in `data` overwrite
    pub fn merge_profile(&mut self, data: &Value) {
        if let Some(name) = data.get("name").and_then(Value::as_str) {
            if !name.trim().is_empty() {
                self.name = name.to_string();
            }
        }

        let mut merged = self.data.as_object().cloned().unwrap_or_default();
        if let Some(incoming) = data.as_object() {
            merged.extend(incoming.clone());
        }
        self.data = Value::Object(merged);
    }

    pub fn recruiter(&self) -> Option<RecruiterKind> {
        self.data
            .get("recruiter")
            .and_then(Value::as_str)
            .and_then(|r| r.parse().ok())
    }

    pub fn is_recruiter_only(&self) -> bool {
        self.recruiter() == Some(RecruiterKind::Yes)
    }

    pub fn is_deleted(&self) -> bool {
        self.status == SupplierStatus::Deleted
    }

    pub fn domain(&self, domain_id: Uuid) -> Option<&SupplierDomain> {
        self.domains.iter().find(|d| d.domain_id == domain_id)
    }

    pub fn is_assessed_for(&self, domain_id: Uuid) -> bool {
        self.domain(domain_id)
            .map_or(false, |d| d.status == SupplierDomainStatus::Assessed)
    }

    /// Names of the domains the supplier is assessed in, sorted
    pub fn assessed_domains(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .domains
            .iter()
            .filter(|d| d.status == SupplierDomainStatus::Assessed)
            .map(|d| d.domain_name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn has_assessed_domain(&self) -> bool {
        !self.assessed_domains().is_empty()
    }

    /// Maximum daily price the supplier charges in a domain (`data.pricing`)
    pub fn max_price_for(&self, domain_name: &str) -> Option<Decimal> {
        let price = self
            .data
            .get("pricing")?
            .get(domain_name)?
            .get("maxPrice")?;
        match price {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.to_string().parse().ok(),
            _ => None,
        }
    }

    /// Marks a domain assessed with an approved price and records that price
    pub fn record_domain_approval(&mut self, domain: &Domain, max_daily_rate: Option<Decimal>) {
        match self.domains.iter_mut().find(|d| d.domain_id == domain.id) {
            Some(existing) => {
                existing.status = SupplierDomainStatus::Assessed;
                existing.price_status = PriceStatus::Approved;
            }
            None => self.domains.push(SupplierDomain {
                domain_id: domain.id,
                domain_name: domain.name.clone(),
                status: SupplierDomainStatus::Assessed,
                price_status: PriceStatus::Approved,
            }),
        }

        if let Some(rate) = max_daily_rate {
            let mut data = self.data.as_object().cloned().unwrap_or_default();
            let mut pricing = data
                .get("pricing")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_else(Map::new);
            pricing.insert(domain.name.clone(), json!({ "maxPrice": rate.to_string() }));
            data.insert("pricing".to_string(), Value::Object(pricing));
            self.data = Value::Object(data);
        }
    }

    /// Starts tracking a domain the supplier has applied for
    pub fn add_unassessed_domain(&mut self, domain: &Domain) {
        if self.domain(domain.id).is_none() {
            self.domains.push(SupplierDomain {
                domain_id: domain.id,
                domain_name: domain.name.clone(),
                status: SupplierDomainStatus::Unassessed,
                price_status: PriceStatus::Unassessed,
            });
        }
    }
}

/// Profile checks for a supplier
///
/// Errors block responding to opportunities; warnings are informational.
pub struct SupplierValidator<'a> {
    supplier: &'a Supplier,
    now: DateTime<Utc>,
}

impl<'a> SupplierValidator<'a> {
    pub fn new(supplier: &'a Supplier, now: DateTime<Utc>) -> Self {
        Self { supplier, now }
    }

    pub fn validate_all(&self) -> Vec<ValidationMessage> {
        let mut messages = self.validate_basics();
        messages.extend(self.validate_representative());
        messages.extend(self.validate_labour_hire());
        messages
    }

    pub fn errors(&self) -> Vec<ValidationMessage> {
        super::validation::errors_only(self.validate_all())
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.supplier.data.get(key)
    }

    fn validate_basics(&self) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();
        if self.supplier.name.trim().is_empty() {
            messages.push(ValidationMessage::error(
                "S001",
                "business-details",
                "Business name is required",
            ));
        }
        messages
    }

    fn validate_representative(&self) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();

        if is_blank(self.field("representative")) {
            messages.push(ValidationMessage::error(
                "S002",
                "your-info",
                "Authorised representative name is required",
            ));
        }

        match self.field("phone").and_then(Value::as_str) {
            Some(phone) if is_valid_phone(phone) => {}
            Some(_) => messages.push(ValidationMessage::error(
                "S003",
                "your-info",
                "Authorised representative phone number is invalid",
            )),
            None => messages.push(ValidationMessage::error(
                "S003",
                "your-info",
                "Authorised representative phone number is required",
            )),
        }

        match self.field("email").and_then(Value::as_str) {
            Some(email) if Email::is_valid(&email.trim().to_lowercase()) => {}
            Some(_) => messages.push(ValidationMessage::error(
                "S004",
                "your-info",
                "Authorised representative email is invalid",
            )),
            None => messages.push(ValidationMessage::error(
                "S004",
                "your-info",
                "Authorised representative email is required",
            )),
        }

        messages
    }

    fn validate_labour_hire(&self) -> Vec<ValidationMessage> {
        let Some(labour_hire) = self.field("labourHire").and_then(Value::as_object) else {
            return Vec::new();
        };

        let today = self.now.date_naive();
        labour_hire
            .iter()
            .filter_map(|(state, licence)| {
                let expiry = licence.get("expiry").and_then(Value::as_str)?;
                let expiry = chrono::NaiveDate::parse_from_str(expiry, "%Y-%m-%d").ok()?;
                (expiry < today).then(|| {
                    ValidationMessage::warning(
                        "S005",
                        "recruiter",
                        format!("Labour hire licence for {} has expired", state.to_uppercase()),
                    )
                })
            })
            .collect()
    }
}

fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    digits >= 10
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier(data: Value) -> Supplier {
        Supplier {
            id: Uuid::new_v4(),
            name: "Acme Digital".to_string(),
            status: SupplierStatus::Complete,
            data,
            domains: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn valid_profile() -> Value {
        json!({
            "representative": "Ada Lovelace",
            "phone": "(02) 6123 4567",
            "email": "ada@acme.com",
            "recruiter": "no"
        })
    }

    fn domain(name: &str) -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn valid_profile_has_no_errors() {
        let s = supplier(valid_profile());
        assert!(SupplierValidator::new(&s, Utc::now()).errors().is_empty());
    }

    #[test]
    fn missing_representative_details() {
        let s = supplier(json!({ "phone": "123", "email": "nope" }));
        let ids: Vec<String> = SupplierValidator::new(&s, Utc::now())
            .errors()
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(ids, vec!["S002", "S003", "S004"]);
    }

    #[test]
    fn expired_labour_hire_is_a_warning() {
        let mut data = valid_profile();
        data["labourHire"] = json!({ "vic": { "licenceNumber": "L1", "expiry": "2000-01-01" } });
        let s = supplier(data);
        let validator = SupplierValidator::new(&s, Utc::now());

        assert!(validator.errors().is_empty());
        assert_eq!(validator.validate_all().len(), 1);
    }

    #[test]
    fn phone_rules() {
        assert!(is_valid_phone("+61 2 6123 4567"));
        assert!(is_valid_phone("(02) 61234567"));
        assert!(!is_valid_phone("6123 4567"));
        assert!(!is_valid_phone("02-6123-4567"));
    }

    #[test]
    fn recruiter_kind() {
        let mut data = valid_profile();
        data["recruiter"] = json!("yes");
        assert!(supplier(data).is_recruiter_only());
        assert!(!supplier(valid_profile()).is_recruiter_only());
        assert_eq!(supplier(json!({})).recruiter(), None);
    }

    #[test]
    fn domain_approval_sets_status_and_price() {
        let mut s = supplier(valid_profile());
        let software = domain("Software engineering and development");
        s.add_unassessed_domain(&software);
        assert!(!s.is_assessed_for(software.id));

        s.record_domain_approval(&software, Some(Decimal::new(1200, 0)));

        assert!(s.is_assessed_for(software.id));
        assert_eq!(s.domains.len(), 1);
        assert_eq!(s.domains[0].price_status, PriceStatus::Approved);
        assert_eq!(
            s.max_price_for("Software engineering and development"),
            Some(Decimal::new(1200, 0))
        );
    }

    #[test]
    fn assessed_domains_sorted() {
        let mut s = supplier(valid_profile());
        s.record_domain_approval(&domain("Zeta"), None);
        s.record_domain_approval(&domain("Alpha"), None);
        s.add_unassessed_domain(&domain("Beta"));

        assert_eq!(s.assessed_domains(), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn merge_profile_overwrites_given_keys() {
        let mut s = supplier(valid_profile());
        s.merge_profile(&json!({ "name": "Acme Pty Ltd", "summary": "We build" }));

        assert_eq!(s.name, "Acme Pty Ltd");
        assert_eq!(s.data["summary"], "We build");
        assert_eq!(s.data["representative"], "Ada Lovelace");
    }
}
