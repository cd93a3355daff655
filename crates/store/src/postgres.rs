use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Result, Sale, SaleId, StoreError,
    store::{IdempotencyStore, SaleStore},
};

/// Applies the workspace migrations to the given pool.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed sale store.
#[derive(Clone)]
pub struct PostgresSaleStore {
    pool: PgPool,
}

impl PostgresSaleStore {
    /// Creates a new PostgreSQL sale store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_sale(row: PgRow) -> Result<Sale> {
        Ok(Sale {
            id: SaleId::from(row.try_get::<String, _>("id")?),
            product: row.try_get("product")?,
            amount: row.try_get("amount")?,
            processed: row.try_get("processed")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

#[async_trait]
impl SaleStore for PostgresSaleStore {
    async fn put(&self, sale: &Sale) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sales (id, product, amount, processed, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET product = EXCLUDED.product,
                amount = EXCLUDED.amount,
                processed = EXCLUDED.processed,
                timestamp = EXCLUDED.timestamp
            "#,
        )
        .bind(sale.id.as_str())
        .bind(&sale.product)
        .bind(sale.amount)
        .bind(sale.processed)
        .bind(sale.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &SaleId) -> Result<Option<Sale>> {
        let row = sqlx::query(
            r#"
            SELECT id, product, amount, processed, timestamp
            FROM sales
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_sale).transpose()
    }

    async fn delete(&self, id: &SaleId) -> Result<()> {
        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(sale_id = %id))]
    async fn mark_processed(&self, id: &SaleId) -> Result<()> {
        let result = sqlx::query("UPDATE sales SET processed = TRUE WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }

        metrics::counter!("store_sales_marked_processed_total").increment(1);
        Ok(())
    }
}

/// PostgreSQL-backed idempotency store.
#[derive(Clone)]
pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    /// Creates a new PostgreSQL idempotency store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn exists(&self, id: &SaleId) -> Result<bool> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales_idempotency WHERE id = $1)")
                .bind(id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }

    async fn put(&self, id: &SaleId) -> Result<()> {
        sqlx::query("INSERT INTO sales_idempotency (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &SaleId) -> Result<()> {
        sqlx::query("DELETE FROM sales_idempotency WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
