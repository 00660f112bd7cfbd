//! Host routing
//!
//! Matches probed encoding candidates against the host registry and drives the upload
//! attempts. Candidate order from the probe always wins over host priority; priority
//! only orders hosts for the same candidate.

pub mod registry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rewind_core::{EncodingCandidate, HostCapability, MediaDescriptor, UploadOutcome, UploadedRef};

pub use registry::{HostRegistry, RegisteredHost};

/// Attempts per (candidate, host) pair before moving on.
pub const MAX_ATTEMPTS_PER_PAIR: u32 = 2;

/// One admissible (candidate, host) pair.
#[derive(Debug, Clone)]
pub struct PlannedUpload {
    /// Position of the candidate in the descriptor.
    pub candidate_index: usize,
    pub candidate: EncodingCandidate,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Uploaded(UploadedRef),
    /// The request can never be served. Not retried.
    UserFailure(String),
    /// Every pair ran out of attempts on transient failures.
    UploadFailure(String),
}

/// Produces the bytes for a pair the first time the upload loop reaches it.
#[async_trait]
pub trait PayloadSource: Send {
    /// `None` skips the pair.
    async fn payload(&mut self, pair: &PlannedUpload) -> Option<Bytes>;
}

/// Uploads the bytes already carried by each planned candidate.
pub struct PlannedPayload;

#[async_trait]
impl PayloadSource for PlannedPayload {
    async fn payload(&mut self, pair: &PlannedUpload) -> Option<Bytes> {
        Some(pair.candidate.data.clone())
    }
}

/// Whether `capability` can take `candidate` for a request with the given sensitivity.
pub fn is_admissible(
    capability: &HostCapability,
    candidate: &EncodingCandidate,
    sensitive: bool,
) -> bool {
    let Some(limits) = capability.limits_for(candidate.encoding) else {
        return false;
    };

    let within_duration = limits
        .max_duration
        .map_or(true, |max| candidate.duration <= max);
    let within_size = limits
        .max_size_bytes
        .map_or(true, |max| candidate.size_bytes <= max);
    // An unknown frame count cannot exceed a ceiling.
    let within_frames = match (limits.max_frames, candidate.frames) {
        (Some(max), Some(frames)) => frames <= max,
        _ => true,
    };

    within_duration
        && within_size
        && within_frames
        && (!candidate.has_audio || capability.audio)
        && capability.sensitivity.accepts(sensitive)
}

pub struct HostRouter {
    registry: Arc<HostRegistry>,
    retry_delay: Duration,
}

impl HostRouter {
    pub fn new(registry: Arc<HostRegistry>, retry_delay: Duration) -> Self {
        Self {
            registry,
            retry_delay,
        }
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// Admissible pairs in attempt order. Empty when nothing can take the media.
    pub fn select_candidates(
        &self,
        descriptor: &MediaDescriptor,
        sensitive: bool,
    ) -> Vec<PlannedUpload> {
        let mut plan = Vec::new();

        for (candidate_index, candidate) in descriptor.candidates.iter().enumerate() {
            let mut hosts: Vec<&RegisteredHost> = self
                .registry
                .hosts()
                .iter()
                .filter(|h| !self.registry.is_disabled(&h.capability.name))
                .filter(|h| is_admissible(&h.capability, candidate, sensitive))
                .collect();
            hosts.sort_by_key(|h| h.capability.priority);

            plan.extend(hosts.into_iter().map(|h| PlannedUpload {
                candidate_index,
                candidate: candidate.clone(),
                host: h.capability.name.clone(),
            }));
        }

        tracing::debug!(
            candidates = descriptor.candidates.len(),
            pairs = plan.len(),
            sensitive,
            "Upload plan selected"
        );
        plan
    }

    /// Try the plan in order until one upload sticks.
    pub async fn attempt_upload(&self, plan: &[PlannedUpload], sensitive: bool) -> RouteOutcome {
        self.attempt_upload_with(plan, sensitive, &mut PlannedPayload)
            .await
    }

    /// Like [`HostRouter::attempt_upload`], asking `payloads` for each pair's bytes right
    /// before its first attempt. Pairs without a payload are skipped.
    #[tracing::instrument(skip(self, plan, payloads), fields(pairs = plan.len()))]
    pub async fn attempt_upload_with(
        &self,
        plan: &[PlannedUpload],
        sensitive: bool,
        payloads: &mut dyn PayloadSource,
    ) -> RouteOutcome {
        if plan.is_empty() {
            return RouteOutcome::UserFailure(
                "File too large or unsupported for every upload host".to_string(),
            );
        }

        let mut attempted = false;

        for pair in plan {
            if self.registry.is_disabled(&pair.host) {
                continue;
            }
            let Some(host) = self.registry.get(&pair.host) else {
                tracing::warn!(host = %pair.host, "Planned host is not registered");
                continue;
            };
            let Some(data) = payloads.payload(pair).await else {
                continue;
            };
            attempted = true;

            for attempt in 1..=MAX_ATTEMPTS_PER_PAIR {
                let outcome = host
                    .client
                    .upload(
                        data.clone(),
                        pair.candidate.encoding,
                        sensitive,
                        pair.candidate.has_audio,
                    )
                    .await;

                match outcome {
                    UploadOutcome::Uploaded(uploaded) => {
                        tracing::info!(
                            host = %pair.host,
                            encoding = %pair.candidate.encoding,
                            attempt,
                            url = %uploaded.url,
                            "Upload succeeded"
                        );
                        return RouteOutcome::Uploaded(uploaded);
                    }
                    UploadOutcome::Rejected(reason) => {
                        tracing::info!(host = %pair.host, reason = %reason, "Upload rejected");
                        return RouteOutcome::UserFailure(reason);
                    }
                    UploadOutcome::Failed(reason) => {
                        tracing::warn!(
                            host = %pair.host,
                            encoding = %pair.candidate.encoding,
                            attempt,
                            reason = %reason,
                            "Upload attempt failed"
                        );
                        if attempt < MAX_ATTEMPTS_PER_PAIR {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }
        }

        if !attempted {
            return RouteOutcome::UploadFailure("No candidate could be prepared for upload".to_string());
        }
        RouteOutcome::UploadFailure("All upload hosts failed".to_string())
    }
}
