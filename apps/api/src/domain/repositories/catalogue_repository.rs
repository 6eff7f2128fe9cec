use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::framework::{Domain, Framework};

/// Read access to frameworks and assessment domains
#[async_trait]
pub trait CatalogueRepository: Send + Sync {
    async fn find_framework(&self, id: Uuid) -> RepositoryResult<Option<Framework>>;

    async fn find_framework_by_slug(&self, slug: &str) -> RepositoryResult<Option<Framework>>;

    async fn find_domain(&self, id: Uuid) -> RepositoryResult<Option<Domain>>;

    async fn list_domains(&self) -> RepositoryResult<Vec<Domain>>;
}
