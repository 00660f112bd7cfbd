//! Request queue: bounded channel, worker pool and fixed-delay re-queue.
//!
//! Shutdown: [`JobQueue::shutdown`] signals the pool to stop taking jobs; it does not
//! wait for in-flight jobs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use rewind_core::{AppError, Config, MediaReference, RequestOutcome};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Semaphore};

use crate::context::JobHandler;

/// Optional sender notified with the terminal outcome of each job.
pub type JobFinishedSender = mpsc::Sender<(u64, RequestOutcome)>;

/// Hand-off target for resolved requests.
#[async_trait]
pub trait RequestQueue: Send + Sync {
    async fn enqueue(
        &self,
        context: Map<String, Value>,
        reference: MediaReference,
    ) -> Result<(), AppError>;
}

/// A resolved request waiting for a worker.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    /// Flattened request context.
    pub context: Map<String, Value>,
    pub reference: MediaReference,
    /// Number of earlier runs of this job.
    pub attempt: u32,
}

#[derive(Clone, Debug)]
pub struct JobQueueConfig {
    pub max_workers: usize,
    pub queue_size: usize,
    /// Re-queues allowed after an upload failure.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_size: 1000,
            max_retries: 3,
            retry_delay: Duration::from_secs(90),
        }
    }
}

impl From<&Config> for JobQueueConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_workers: config.queue_max_workers,
            max_retries: config.queue_max_retries,
            retry_delay: config.queue_retry_delay(),
            ..Self::default()
        }
    }
}

pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    shutdown_tx: mpsc::Sender<()>,
    next_id: Arc<AtomicU64>,
}

impl JobQueue {
    /// Create the queue and spawn its worker pool.
    pub fn new(
        config: JobQueueConfig,
        handler: Weak<dyn JobHandler>,
        job_finished_tx: Option<JobFinishedSender>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let requeue_tx = tx.clone();
        tokio::spawn(async move {
            Self::worker_pool(rx, requeue_tx, config, handler, shutdown_rx, job_finished_tx).await;
        });

        Self {
            tx,
            shutdown_tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<Job>,
        requeue_tx: mpsc::Sender<Job>,
        config: JobQueueConfig,
        handler: Weak<dyn JobHandler>,
        mut shutdown_rx: mpsc::Receiver<()>,
        job_finished_tx: Option<JobFinishedSender>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            max_retries = config.max_retries,
            retry_delay_secs = config.retry_delay.as_secs_f64(),
            "Job queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Job queue worker pool shutting down");
                    break;
                }
                job = rx.recv() => {
                    let Some(job) = job else { break };
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let handler = handler.clone();
                    let requeue_tx = requeue_tx.clone();
                    let config = config.clone();
                    let finished_tx = job_finished_tx.clone();

                    tokio::spawn(async move {
                        let _permit = permit;
                        Self::process_job_with_retry(job, handler, requeue_tx, config, finished_tx)
                            .await;
                    });
                }
            }
        }

        tracing::info!("Job queue worker pool stopped");
    }

    #[tracing::instrument(skip_all, fields(job.id = job.id, job.attempt = job.attempt))]
    async fn process_job_with_retry(
        job: Job,
        handler: Weak<dyn JobHandler>,
        requeue_tx: mpsc::Sender<Job>,
        config: JobQueueConfig,
        finished_tx: Option<JobFinishedSender>,
    ) {
        let Some(handler) = handler.upgrade() else {
            tracing::error!(job_id = job.id, "JobHandler was dropped, cannot process job");
            if let Some(tx) = finished_tx {
                let outcome = RequestOutcome::upload_failure("Job handler is no longer running");
                let _ = tx.send((job.id, outcome)).await;
            }
            return;
        };

        let outcome = handler.handle_job(&job).await;

        if outcome.is_retryable() && job.attempt < config.max_retries {
            tracing::info!(
                job_id = job.id,
                retry_count = job.attempt + 1,
                delay_secs = config.retry_delay.as_secs_f64(),
                "Re-queuing job after upload failure"
            );
            // Sleep on a detached task so this worker's permit is released now.
            let mut retried = job;
            retried.attempt += 1;
            tokio::spawn(async move {
                tokio::time::sleep(config.retry_delay).await;
                if let Err(e) = requeue_tx.send(retried).await {
                    tracing::error!(error = %e, "Failed to re-queue job");
                }
            });
            return;
        }

        match &outcome {
            RequestOutcome::Success => {
                tracing::info!(job_id = job.id, "Job completed successfully");
            }
            RequestOutcome::UserFailure(reason) => {
                tracing::info!(job_id = job.id, reason = %reason, "Job dropped: unusable request");
            }
            RequestOutcome::UploadFailure(reason) => {
                tracing::error!(job_id = job.id, reason = %reason, "Job failed after max retries");
            }
        }

        if let Some(tx) = finished_tx {
            let _ = tx.send((job.id, outcome)).await;
        }
    }

    /// Signals the worker pool to stop taking jobs. Returns without waiting.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating job queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[async_trait]
impl RequestQueue for JobQueue {
    #[tracing::instrument(skip(self, context), fields(media.host = %reference.host, media.id = %reference.id))]
    async fn enqueue(
        &self,
        context: Map<String, Value>,
        reference: MediaReference,
    ) -> Result<(), AppError> {
        let job = Job {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            context,
            reference,
            attempt: 0,
        };
        let id = job.id;
        self.tx
            .send(job)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to submit job: {}", e)))?;
        tracing::info!(job_id = id, "Job submitted to queue");
        Ok(())
    }
}

impl Clone for JobQueue {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            next_id: self.next_id.clone(),
        }
    }
}
