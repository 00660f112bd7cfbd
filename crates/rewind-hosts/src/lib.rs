//! Rewind upload hosts
//!
//! Clients for the external hosts reversed media is uploaded to, and the HTTP fetcher
//! that downloads source media.

pub mod catbox;
pub mod fetch;
pub mod traits;

pub use catbox::CatboxHost;
pub use fetch::HttpMediaFetcher;
pub use traits::{MediaFetcher, UploadHost};
