//! Rewind worker
//!
//! Resolved requests can be handed to a [`JobQueue`]; its worker pool calls back into a
//! [`JobHandler`] (the request pipeline) and re-queues requests that ended in an
//! upload failure.

pub mod context;
pub mod queue;

pub use context::JobHandler;
pub use queue::{Job, JobFinishedSender, JobQueue, JobQueueConfig, RequestQueue};
