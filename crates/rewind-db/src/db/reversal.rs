//! Reversal repository: dedup records in the `reversals` table.

use async_trait::async_trait;
use chrono::NaiveDate;
use rewind_core::{AppError, CacheHit, DedupRecord, HostedId};
use sqlx::{PgPool, Postgres};

use super::DedupRepository;

const RECORD_COLUMNS: &str = "id, origin_host, origin_id, reversed_host, reversed_id, \
     created_on, total_requests, last_requested_on, sensitive";

/// Row type for reversals table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct ReversalRow {
    pub id: i64,
    pub origin_host: String,
    pub origin_id: String,
    pub reversed_host: String,
    pub reversed_id: String,
    pub created_on: NaiveDate,
    pub total_requests: i64,
    pub last_requested_on: NaiveDate,
    pub sensitive: bool,
}

impl ReversalRow {
    pub fn to_record(self) -> DedupRecord {
        DedupRecord {
            id: self.id,
            origin: HostedId::new(self.origin_host, self.origin_id),
            reversed: HostedId::new(self.reversed_host, self.reversed_id),
            created_on: self.created_on,
            total_requests: self.total_requests,
            last_requested_on: self.last_requested_on,
            sensitive: self.sensitive,
        }
    }
}

/// Side of the pairing a lookup matched on.
#[derive(Debug, Clone, Copy)]
enum Side {
    Origin,
    Reversed,
}

impl Side {
    fn where_clause(&self) -> &'static str {
        match self {
            Side::Origin => "origin_host = $1 AND origin_id = $2",
            Side::Reversed => "reversed_host = $1 AND reversed_id = $2",
        }
    }
}

#[derive(Clone)]
pub struct PgDedupRepository {
    pool: PgPool,
}

impl PgDedupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count a request against the record matching `key` on `side`.
    async fn touch(
        &self,
        side: Side,
        key: &HostedId,
        today: NaiveDate,
    ) -> Result<Option<ReversalRow>, AppError> {
        let sql = format!(
            r#"
            UPDATE reversals
            SET total_requests = total_requests + 1, last_requested_on = $3
            WHERE {}
            RETURNING {}
            "#,
            side.where_clause(),
            RECORD_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, ReversalRow>(&sql)
            .bind(&key.host)
            .bind(&key.id)
            .bind(today)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_where(&self, side: Side, key: &HostedId) -> Result<u64, AppError> {
        let sql = format!("DELETE FROM reversals WHERE {}", side.where_clause());
        let result = sqlx::query(&sql)
            .bind(&key.host)
            .bind(&key.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DedupRepository for PgDedupRepository {
    #[tracing::instrument(skip(self), fields(db.table = "reversals", key = %key))]
    async fn lookup(
        &self,
        key: &HostedId,
        today: NaiveDate,
    ) -> Result<Option<CacheHit>, AppError> {
        if let Some(row) = self.touch(Side::Origin, key, today).await? {
            return Ok(Some(CacheHit {
                reference: HostedId::new(row.reversed_host, row.reversed_id),
                sensitive: row.sensitive,
                total_requests: row.total_requests - 1,
            }));
        }

        if let Some(row) = self.touch(Side::Reversed, key, today).await? {
            return Ok(Some(CacheHit {
                reference: HostedId::new(row.origin_host, row.origin_id),
                sensitive: row.sensitive,
                total_requests: row.total_requests - 1,
            }));
        }

        Ok(None)
    }

    #[tracing::instrument(skip(self), fields(db.table = "reversals", origin = %origin, reversed = %reversed))]
    async fn insert(
        &self,
        origin: &HostedId,
        reversed: &HostedId,
        sensitive: bool,
        today: NaiveDate,
    ) -> Result<DedupRecord, AppError> {
        let sql = format!(
            r#"
            INSERT INTO reversals
                (origin_host, origin_id, reversed_host, reversed_id,
                 created_on, total_requests, last_requested_on, sensitive)
            VALUES ($1, $2, $3, $4, $5, 1, $5, $6)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            RECORD_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, ReversalRow>(&sql)
            .bind(&origin.host)
            .bind(&origin.id)
            .bind(&reversed.host)
            .bind(&reversed.id)
            .bind(today)
            .bind(sensitive)
            .fetch_optional(&self.pool)
            .await?;

        // Either unique key taken.
        row.map(ReversalRow::to_record).ok_or_else(|| {
            AppError::AlreadyExists(format!("reversal for {} or to {}", origin, reversed))
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "reversals", key = %key))]
    async fn delete(&self, key: &HostedId) -> Result<bool, AppError> {
        if self.delete_where(Side::Origin, key).await? > 0 {
            return Ok(true);
        }
        Ok(self.delete_where(Side::Reversed, key).await? > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "reversals"))]
    async fn list_stale(
        &self,
        host: &str,
        cutoff: NaiveDate,
    ) -> Result<Vec<DedupRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM reversals
            WHERE reversed_host = $1 AND last_requested_on < $2
            ORDER BY last_requested_on ASC, id ASC
            "#,
            RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, ReversalRow>(&sql)
            .bind(host)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ReversalRow::to_record).collect())
    }
}
