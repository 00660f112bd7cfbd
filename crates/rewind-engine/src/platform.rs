//! Social platform seam.

use async_trait::async_trait;
use rewind_core::{Comment, PlatformError, Submission, Thing, ThingRef};

/// Reads and writes the bot performs against the social platform.
///
/// Calls are never retried by the engine; a failure ends the current step.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn fetch_comment(&self, id: &str) -> Result<Comment, PlatformError>;

    async fn fetch_submission(&self, id: &str) -> Result<Submission, PlatformError>;

    /// Parent comment, or the submission for a top-level comment.
    async fn parent(&self, comment: &Comment) -> Result<Thing, PlatformError>;

    /// Whether the bot account moderates `subreddit`.
    async fn is_moderator(&self, subreddit: &str) -> Result<bool, PlatformError>;

    async fn remove_comment(&self, comment_id: &str) -> Result<(), PlatformError>;

    /// Post a reply and return the new comment's id.
    async fn post_reply(&self, target: &ThingRef, text: &str) -> Result<String, PlatformError>;

    async fn distinguish(&self, comment_id: &str, sticky: bool) -> Result<(), PlatformError>;

    async fn send_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), PlatformError>;
}
