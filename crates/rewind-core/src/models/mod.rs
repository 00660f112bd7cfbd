//! Data models shared by the engine and its collaborators
//!
//! Organised by concern: media artifacts, upload host capabilities, dedup records,
//! request context, platform threads and terminal outcomes.

mod context;
mod dedup;
mod host;
mod media;
mod outcome;
mod thread;

pub use context::*;
pub use dedup::*;
pub use host::*;
pub use media::*;
pub use outcome::*;
pub use thread::*;
