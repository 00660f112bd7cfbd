//! Shared logic for the rewind maintenance binaries.

use chrono::{Duration, NaiveDate};
use rewind_core::AppError;
use rewind_db::DedupRepository;
use rewind_hosts::UploadHost;
use serde::Serialize;

/// Last request date a record may have and still be kept.
pub fn prune_cutoff(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PruneReport {
    pub host: String,
    pub cutoff: NaiveDate,
    pub stale: usize,
    pub deleted: usize,
    pub failed: usize,
    pub dry_run: bool,
}

/// Delete uploads on `host` that nobody requested since `cutoff`, then forget them.
///
/// A record is only dropped after its upload is gone, so failures are retried on the
/// next run.
pub async fn prune_stale(
    repository: &dyn DedupRepository,
    host: &dyn UploadHost,
    cutoff: NaiveDate,
    dry_run: bool,
) -> Result<PruneReport, AppError> {
    let stale = repository.list_stale(host.name(), cutoff).await?;
    let mut report = PruneReport {
        host: host.name().to_string(),
        cutoff,
        stale: stale.len(),
        deleted: 0,
        failed: 0,
        dry_run,
    };

    tracing::info!(host = %report.host, %cutoff, stale = report.stale, dry_run, "Pruning stale uploads");

    if dry_run {
        for record in &stale {
            tracing::info!(
                origin = %record.origin,
                reversed = %record.reversed,
                last_requested_on = %record.last_requested_on,
                "Would prune"
            );
        }
        return Ok(report);
    }

    for record in stale {
        if let Err(e) = host.delete(&record.reversed.id).await {
            tracing::warn!(error = %e, reversed = %record.reversed, "Failed to delete upload");
            report.failed += 1;
            continue;
        }

        match repository.delete(&record.origin).await {
            Ok(_) => report.deleted += 1,
            Err(e) => {
                tracing::warn!(error = %e, origin = %record.origin, "Failed to delete dedup record");
                report.failed += 1;
            }
        }
    }

    tracing::info!(deleted = report.deleted, failed = report.failed, "Pruning finished");
    Ok(report)
}
