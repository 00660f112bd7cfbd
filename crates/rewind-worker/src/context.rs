//! Job handler trait
//!
//! The request pipeline implements this trait. The worker holds a weak reference and
//! calls `handle_job` for every job it takes off the channel.

use std::sync::Arc;

use async_trait::async_trait;
use rewind_core::RequestOutcome;

use crate::queue::Job;

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one queued request to a terminal outcome.
    async fn handle_job(self: Arc<Self>, job: &Job) -> RequestOutcome;
}
