use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::media::HostedId;

/// Pairing of a source artifact with its reversed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    pub id: i64,
    pub origin: HostedId,
    pub reversed: HostedId,
    pub created_on: NaiveDate,
    pub total_requests: i64,
    pub last_requested_on: NaiveDate,
    pub sensitive: bool,
}

impl DedupRecord {
    /// Which side of this record `key` names, if any. Origin wins when both match.
    pub fn other_side(&self, key: &HostedId) -> Option<&HostedId> {
        if &self.origin == key {
            Some(&self.reversed)
        } else if &self.reversed == key {
            Some(&self.origin)
        } else {
            None
        }
    }
}

/// Result of a successful cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    /// The opposite side of the matched record.
    pub reference: HostedId,
    pub sensitive: bool,
    /// Usage count before this lookup was recorded.
    pub total_requests: i64,
}
