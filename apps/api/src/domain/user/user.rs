use super::value_objects::Email;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Buyer,
    Supplier,
    Applicant,
    Admin,
    Assessor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Buyer => "buyer",
            UserRole::Supplier => "supplier",
            UserRole::Applicant => "applicant",
            UserRole::Admin => "admin",
            UserRole::Assessor => "assessor",
        }
    }

    /// Roles allowed to make assessment decisions
    pub fn can_assess(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Assessor)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User account
///
/// Suppliers carry `supplier_id`; applicants carry the `application_id` of
/// the seller application they are working on.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: Email,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub supplier_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: Email, password_hash: String, name: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            role,
            supplier_id: None,
            application_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Turns an applicant into a supplier user once their application is approved
    pub fn promote_to_supplier(&mut self, supplier_id: Uuid) {
        self.role = UserRole::Supplier;
        self.supplier_id = Some(supplier_id);
    }

    pub fn is_buyer(&self) -> bool {
        self.role == UserRole::Buyer
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
