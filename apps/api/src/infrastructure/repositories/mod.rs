// Repository implementations (data access layer)
// PostgreSQL adapters for the domain repository ports

pub mod postgres_application_repository;
pub mod postgres_audit_repository;
pub mod postgres_brief_repository;
pub mod postgres_brief_response_repository;
pub mod postgres_catalogue_repository;
pub mod postgres_evidence_repository;
pub mod postgres_supplier_repository;
pub mod postgres_team_repository;
pub mod postgres_user_claim_repository;
pub mod postgres_user_repository;

pub use postgres_application_repository::PostgresApplicationRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_brief_repository::PostgresBriefRepository;
pub use postgres_brief_response_repository::PostgresBriefResponseRepository;
pub use postgres_catalogue_repository::PostgresCatalogueRepository;
pub use postgres_evidence_repository::PostgresEvidenceRepository;
pub use postgres_supplier_repository::PostgresSupplierRepository;
pub use postgres_team_repository::PostgresTeamRepository;
pub use postgres_user_claim_repository::PostgresUserClaimRepository;
pub use postgres_user_repository::PostgresUserRepository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::repositories::RepositoryError;
use crate::services::Repositories;

/// Wires every Postgres adapter onto one pool
pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        applications: Arc::new(PostgresApplicationRepository::new(pool.clone())),
        audit: Arc::new(PostgresAuditRepository::new(pool.clone())),
        briefs: Arc::new(PostgresBriefRepository::new(pool.clone())),
        responses: Arc::new(PostgresBriefResponseRepository::new(pool.clone())),
        catalogue: Arc::new(PostgresCatalogueRepository::new(pool.clone())),
        evidence: Arc::new(PostgresEvidenceRepository::new(pool.clone())),
        suppliers: Arc::new(PostgresSupplierRepository::new(pool.clone())),
        teams: Arc::new(PostgresTeamRepository::new(pool.clone())),
        claims: Arc::new(PostgresUserClaimRepository::new(pool.clone())),
        users: Arc::new(PostgresUserRepository::new(pool)),
    }
}

/// A stored value that no longer parses into its domain type
pub(crate) fn decode_error(message: String) -> RepositoryError {
    RepositoryError::Database(sqlx::Error::Decode(message.into()))
}
