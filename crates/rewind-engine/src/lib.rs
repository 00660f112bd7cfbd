//! Rewind engine
//!
//! Resolves what a summon refers to, routes the reversed media to an upload host,
//! remembers what was already reversed and replies with the result.

pub mod cache;
pub mod pipeline;
pub mod platform;
pub mod reply;
pub mod resolver;
pub mod router;

pub use cache::DedupCache;
pub use pipeline::{PipelineSettings, RequestPipeline, RequestPipelineBuilder};
pub use platform::PlatformClient;
pub use reply::ReplyComposer;
pub use resolver::{ContextResolver, MediaMatch, MediaUrlExtractor, Walk, WalkState};
pub use router::{HostRegistry, HostRouter, PayloadSource, PlannedUpload, RouteOutcome};
