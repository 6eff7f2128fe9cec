use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::supplier::Supplier;

/// Repository trait for suppliers and their domains
#[async_trait]
pub trait SupplierRepository: Send + Sync {
    /// Save a supplier and replace its domain rows
    async fn save(&self, supplier: &Supplier) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Supplier>>;
}
