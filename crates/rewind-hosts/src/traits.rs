//! Seams between the engine and the network.

use async_trait::async_trait;
use bytes::Bytes;
use rewind_core::{AppError, Encoding, HostCapability, MediaReference, UploadOutcome};

/// An external host that stores reversed media.
#[async_trait]
pub trait UploadHost: Send + Sync {
    fn name(&self) -> &str;

    /// Static limits of this host, read once when the registry is built.
    fn capability(&self) -> HostCapability;

    /// Public URL of an uploaded item.
    fn url_for(&self, id: &str) -> String;

    /// Upload one artifact. Never errors: transport and protocol faults come back
    /// as [`UploadOutcome::Failed`], refusals as [`UploadOutcome::Rejected`].
    async fn upload(
        &self,
        data: Bytes,
        encoding: Encoding,
        sensitive: bool,
        has_audio: bool,
    ) -> UploadOutcome;

    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

/// Downloads the source media a reference points at.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, reference: &MediaReference) -> Result<Bytes, AppError>;
}
