//! Beta opt-in repository: names in the `beta_opt_ins` table.

use async_trait::async_trait;
use rewind_core::AppError;
use sqlx::PgPool;

use super::BetaRepository;

#[derive(Clone)]
pub struct PgBetaRepository {
    pool: PgPool,
}

impl PgBetaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BetaRepository for PgBetaRepository {
    #[tracing::instrument(skip(self), fields(db.table = "beta_opt_ins"))]
    async fn is_opted_in(&self, name: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM beta_opt_ins WHERE name = $1)")
                .bind(name.to_lowercase())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    #[tracing::instrument(skip(self), fields(db.table = "beta_opt_ins"))]
    async fn set_opt_in(&self, name: &str, opted_in: bool) -> Result<(), AppError> {
        let name = name.to_lowercase();
        if opted_in {
            sqlx::query("INSERT INTO beta_opt_ins (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(&name)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM beta_opt_ins WHERE name = $1")
                .bind(&name)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}
