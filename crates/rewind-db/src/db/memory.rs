//! In-memory repositories used when no database is configured, and in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rewind_core::{AppError, CacheHit, DedupRecord, HostedId};
use tokio::sync::{Mutex, RwLock};

use super::{BetaRepository, DedupRepository};

#[derive(Default)]
struct DedupState {
    next_id: i64,
    records: HashMap<i64, DedupRecord>,
    by_origin: HashMap<HostedId, i64>,
    by_reversed: HashMap<HostedId, i64>,
}

impl DedupState {
    fn remove(&mut self, id: i64) -> bool {
        match self.records.remove(&id) {
            Some(record) => {
                self.by_origin.remove(&record.origin);
                self.by_reversed.remove(&record.reversed);
                true
            }
            None => false,
        }
    }
}

/// Dedup store backed by a record map plus one index per key side.
#[derive(Clone, Default)]
pub struct InMemoryDedupRepository {
    state: Arc<Mutex<DedupState>>,
}

impl InMemoryDedupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Current stored record for an origin key, without counting a request.
    pub async fn get_by_origin(&self, origin: &HostedId) -> Option<DedupRecord> {
        let state = self.state.lock().await;
        state
            .by_origin
            .get(origin)
            .and_then(|id| state.records.get(id))
            .cloned()
    }
}

#[async_trait]
impl DedupRepository for InMemoryDedupRepository {
    async fn lookup(
        &self,
        key: &HostedId,
        today: NaiveDate,
    ) -> Result<Option<CacheHit>, AppError> {
        let mut state = self.state.lock().await;

        let (id, origin_side) = match state.by_origin.get(key) {
            Some(id) => (*id, true),
            None => match state.by_reversed.get(key) {
                Some(id) => (*id, false),
                None => return Ok(None),
            },
        };

        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| AppError::Internal(format!("dangling dedup index for {}", key)))?;

        let previous = record.total_requests;
        record.total_requests += 1;
        record.last_requested_on = today;

        let reference = if origin_side {
            record.reversed.clone()
        } else {
            record.origin.clone()
        };

        Ok(Some(CacheHit {
            reference,
            sensitive: record.sensitive,
            total_requests: previous,
        }))
    }

    async fn insert(
        &self,
        origin: &HostedId,
        reversed: &HostedId,
        sensitive: bool,
        today: NaiveDate,
    ) -> Result<DedupRecord, AppError> {
        let mut state = self.state.lock().await;

        if state.by_origin.contains_key(origin) {
            return Err(AppError::AlreadyExists(format!("reversal for {}", origin)));
        }
        if state.by_reversed.contains_key(reversed) {
            return Err(AppError::AlreadyExists(format!("reversal to {}", reversed)));
        }

        state.next_id += 1;
        let record = DedupRecord {
            id: state.next_id,
            origin: origin.clone(),
            reversed: reversed.clone(),
            created_on: today,
            total_requests: 1,
            last_requested_on: today,
            sensitive,
        };

        state.by_origin.insert(origin.clone(), record.id);
        state.by_reversed.insert(reversed.clone(), record.id);
        state.records.insert(record.id, record.clone());

        Ok(record)
    }

    async fn delete(&self, key: &HostedId) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let id = match state.by_origin.get(key).or_else(|| state.by_reversed.get(key)) {
            Some(id) => *id,
            None => return Ok(false),
        };
        Ok(state.remove(id))
    }

    async fn list_stale(
        &self,
        host: &str,
        cutoff: NaiveDate,
    ) -> Result<Vec<DedupRecord>, AppError> {
        let state = self.state.lock().await;
        let mut stale: Vec<DedupRecord> = state
            .records
            .values()
            .filter(|r| r.reversed.host == host && r.last_requested_on < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|r| (r.last_requested_on, r.id));
        Ok(stale)
    }
}

/// Beta list held in a set of lower-cased names.
#[derive(Clone, Default)]
pub struct InMemoryBetaRepository {
    names: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryBetaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names.into_iter().map(|n| n.as_ref().to_lowercase()).collect();
        Self {
            names: Arc::new(RwLock::new(names)),
        }
    }
}

#[async_trait]
impl BetaRepository for InMemoryBetaRepository {
    async fn is_opted_in(&self, name: &str) -> Result<bool, AppError> {
        Ok(self.names.read().await.contains(&name.to_lowercase()))
    }

    async fn set_opt_in(&self, name: &str, opted_in: bool) -> Result<(), AppError> {
        let mut names = self.names.write().await;
        if opted_in {
            names.insert(name.to_lowercase());
        } else {
            names.remove(&name.to_lowercase());
        }
        Ok(())
    }
}
