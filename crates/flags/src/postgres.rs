use async_trait::async_trait;
use sqlx::PgPool;

use crate::{FlagError, Result, source::FlagSource};

/// Flag source backed by the `site_flags` table.
#[derive(Clone)]
pub struct PostgresFlagSource {
    pool: PgPool,
}

impl PostgresFlagSource {
    /// Creates a new PostgreSQL flag source.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sets a flag value, creating it if needed.
    pub async fn set(&self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO site_flags (name, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl FlagSource for PostgresFlagSource {
    async fn get(&self, name: &str) -> Result<String> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM site_flags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        value.ok_or_else(|| FlagError::NotFound(name.to_string()))
    }
}
