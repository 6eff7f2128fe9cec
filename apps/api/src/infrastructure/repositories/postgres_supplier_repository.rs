use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::repositories::{RepositoryResult, SupplierRepository};
use crate::domain::supplier::{
    PriceStatus, Supplier, SupplierDomain, SupplierDomainStatus, SupplierStatus,
};

/// PostgreSQL implementation of SupplierRepository
pub struct PostgresSupplierRepository {
    pool: PgPool,
}

impl PostgresSupplierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    status: SupplierStatus,
    data: Value,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SupplierDomainRow {
    domain_id: Uuid,
    domain_name: String,
    status: SupplierDomainStatus,
    price_status: PriceStatus,
}

/// Upserts a supplier and replaces its domain rows
pub(crate) async fn save_supplier(conn: &mut PgConnection, supplier: &Supplier) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO suppliers (id, name, status, data, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            status = EXCLUDED.status,
            data = EXCLUDED.data
        "#,
    )
    .bind(supplier.id)
    .bind(&supplier.name)
    .bind(supplier.status)
    .bind(&supplier.data)
    .bind(supplier.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM supplier_domains WHERE supplier_id = $1")
        .bind(supplier.id)
        .execute(&mut *conn)
        .await?;

    for domain in &supplier.domains {
        sqlx::query(
            r#"
            INSERT INTO supplier_domains (supplier_id, domain_id, status, price_status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(supplier.id)
        .bind(domain.domain_id)
        .bind(domain.status)
        .bind(domain.price_status)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl SupplierRepository for PostgresSupplierRepository {
    async fn save(&self, supplier: &Supplier) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        save_supplier(&mut tx, supplier).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Supplier>> {
        let Some(row) = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, status, data, created_at FROM suppliers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let domains = sqlx::query_as::<_, SupplierDomainRow>(
            r#"
            SELECT sd.domain_id, d.name AS domain_name, sd.status, sd.price_status
            FROM supplier_domains sd
            JOIN domains d ON d.id = sd.domain_id
            WHERE sd.supplier_id = $1
            ORDER BY d.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Supplier {
            id: row.id,
            name: row.name,
            status: row.status,
            data: row.data,
            domains: domains
                .into_iter()
                .map(|d| SupplierDomain {
                    domain_id: d.domain_id,
                    domain_name: d.domain_name,
                    status: d.status,
                    price_status: d.price_status,
                })
                .collect(),
            created_at: row.created_at,
        }))
    }
}
