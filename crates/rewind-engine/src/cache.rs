//! Dedup cache
//!
//! Front of the dedup store for the pipeline. Dates are stamped here, and callers that
//! go on to insert hold the per-origin lock from their lookup to their insert so two
//! requests for the same source never both upload.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use chrono::{NaiveDate, Utc};
use rewind_core::{AppError, CacheHit, DedupRecord, HostedId};
use rewind_db::DedupRepository;
use tokio::sync::OwnedMutexGuard;

type OriginLock = tokio::sync::Mutex<()>;

pub struct DedupCache {
    repository: Arc<dyn DedupRepository>,
    locks: Mutex<HashMap<HostedId, Weak<OriginLock>>>,
}

impl DedupCache {
    pub fn new(repository: Arc<dyn DedupRepository>) -> Self {
        Self {
            repository,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Exclusive section for one origin key. Released when the guard drops.
    pub async fn lock_origin(&self, key: &HostedId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, weak| weak.strong_count() > 0);
            match locks.get(key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(OriginLock::new(()));
                    locks.insert(key.clone(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Paired reference for `key` as origin, else as reversed. Counts the request.
    pub async fn lookup(&self, key: &HostedId) -> Result<Option<CacheHit>, AppError> {
        let hit = self.repository.lookup(key, Self::today()).await?;
        if let Some(hit) = &hit {
            tracing::debug!(
                key = %key,
                paired = %hit.reference,
                total_requests = hit.total_requests,
                "Dedup cache hit"
            );
        }
        Ok(hit)
    }

    pub async fn insert(
        &self,
        origin: &HostedId,
        reversed: &HostedId,
        sensitive: bool,
    ) -> Result<DedupRecord, AppError> {
        let record = self
            .repository
            .insert(origin, reversed, sensitive, Self::today())
            .await?;
        tracing::info!(origin = %origin, reversed = %reversed, "Dedup record stored");
        Ok(record)
    }

    pub async fn delete(&self, key: &HostedId) -> Result<bool, AppError> {
        let removed = self.repository.delete(key).await?;
        if removed {
            tracing::info!(key = %key, "Dedup record deleted");
        }
        Ok(removed)
    }

    pub async fn list_stale(
        &self,
        host: &str,
        cutoff: NaiveDate,
    ) -> Result<Vec<DedupRecord>, AppError> {
        self.repository.list_stale(host, cutoff).await
    }
}
