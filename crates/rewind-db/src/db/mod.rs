//! Repository traits and their implementations.

mod beta;
mod memory;
mod reversal;

use async_trait::async_trait;
use chrono::NaiveDate;
use rewind_core::{AppError, CacheHit, DedupRecord, HostedId};

pub use beta::PgBetaRepository;
pub use memory::{InMemoryBetaRepository, InMemoryDedupRepository};
pub use reversal::PgDedupRepository;

/// Storage contract for origin/reversed pairings.
///
/// At most one record exists per origin key. Every lookup tries the origin key before
/// the reversed key.
#[async_trait]
pub trait DedupRepository: Send + Sync {
    /// Find the record addressed by `key`, count the request and stamp `today` on it.
    async fn lookup(&self, key: &HostedId, today: NaiveDate)
        -> Result<Option<CacheHit>, AppError>;

    /// Store a new pairing with a usage count of 1.
    ///
    /// Fails with [`AppError::AlreadyExists`] when the origin key or the reversed key is
    /// already taken.
    async fn insert(
        &self,
        origin: &HostedId,
        reversed: &HostedId,
        sensitive: bool,
        today: NaiveDate,
    ) -> Result<DedupRecord, AppError>;

    /// Remove the record matching `key` as origin, else as reversed. Returns whether
    /// anything was removed.
    async fn delete(&self, key: &HostedId) -> Result<bool, AppError>;

    /// Records uploaded to `host` whose last request is strictly before `cutoff`,
    /// oldest first.
    async fn list_stale(&self, host: &str, cutoff: NaiveDate)
        -> Result<Vec<DedupRecord>, AppError>;
}

/// Users or communities that get the preview host instead of a regular upload.
#[async_trait]
pub trait BetaRepository: Send + Sync {
    async fn is_opted_in(&self, name: &str) -> Result<bool, AppError>;

    async fn set_opt_in(&self, name: &str, opted_in: bool) -> Result<(), AppError>;
}
