// Repository interfaces (ports)
// Adapters in infrastructure implement these for Postgres and in-memory storage

pub mod application_repository;
pub mod audit_repository;
pub mod brief_repository;
pub mod brief_response_repository;
pub mod catalogue_repository;
pub mod evidence_repository;
pub mod supplier_repository;
pub mod team_repository;
pub mod user_claim_repository;
pub mod user_repository;

pub use application_repository::ApplicationRepository;
pub use audit_repository::AuditRepository;
pub use brief_repository::BriefRepository;
pub use brief_response_repository::BriefResponseRepository;
pub use catalogue_repository::CatalogueRepository;
pub use evidence_repository::EvidenceRepository;
pub use supplier_repository::SupplierRepository;
pub use team_repository::TeamRepository;
pub use user_claim_repository::{ClaimAttempt, UserClaimRepository};
pub use user_repository::UserRepository;

use thiserror::Error;

/// Failures surfaced by repository adapters
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
