//! Core traits for media processing
//!
//! The engine only sees these two seams; the ffmpeg family implements both.

use async_trait::async_trait;
use bytes::Bytes;
use rewind_core::{AppError, EncodingCandidate, MediaDescriptor, MediaReference};

/// Measures downloaded media and lists the encodings it can be delivered in.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// An empty candidate list means the media could not be analysed.
    async fn probe(
        &self,
        reference: &MediaReference,
        data: Bytes,
    ) -> Result<MediaDescriptor, AppError>;
}

/// Produces the time-reversed artifact for one candidate.
#[async_trait]
pub trait MediaTransform: Send + Sync {
    async fn reverse(&self, candidate: &EncodingCandidate) -> Result<Bytes, AppError>;
}
