use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::framework::{Domain, Framework, FrameworkStatus};
use crate::domain::repositories::{CatalogueRepository, RepositoryResult};

/// PostgreSQL implementation of CatalogueRepository
pub struct PostgresCatalogueRepository {
    pool: PgPool,
}

impl PostgresCatalogueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FrameworkRow {
    id: Uuid,
    slug: String,
    name: String,
    status: FrameworkStatus,
}

impl From<FrameworkRow> for Framework {
    fn from(r: FrameworkRow) -> Self {
        Framework {
            id: r.id,
            slug: r.slug,
            name: r.name,
            status: r.status,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DomainRow {
    id: Uuid,
    name: String,
}

#[async_trait]
impl CatalogueRepository for PostgresCatalogueRepository {
    async fn find_framework(&self, id: Uuid) -> RepositoryResult<Option<Framework>> {
        let row = sqlx::query_as::<_, FrameworkRow>(
            "SELECT id, slug, name, status FROM frameworks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Framework::from))
    }

    async fn find_framework_by_slug(&self, slug: &str) -> RepositoryResult<Option<Framework>> {
        let row = sqlx::query_as::<_, FrameworkRow>(
            "SELECT id, slug, name, status FROM frameworks WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Framework::from))
    }

    async fn find_domain(&self, id: Uuid) -> RepositoryResult<Option<Domain>> {
        let row = sqlx::query_as::<_, DomainRow>("SELECT id, name FROM domains WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Domain {
            id: r.id,
            name: r.name,
        }))
    }

    async fn list_domains(&self) -> RepositoryResult<Vec<Domain>> {
        let rows = sqlx::query_as::<_, DomainRow>("SELECT id, name FROM domains ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Domain {
                id: r.id,
                name: r.name,
            })
            .collect())
    }
}
