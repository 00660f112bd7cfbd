//! Reply composition and delivery.

use std::sync::Arc;

use rewind_core::constants::{
    fill, BOT_FOOTER, NSFW_REPLY_TEMPLATE, REPLY_BAN_SUBJECT, REPLY_BAN_TEMPLATE, REPLY_TEMPLATE,
    UNNECESSARY_MANUAL_MESSAGE,
};
use rewind_core::{Context, PlatformError, RequestOutcome};

use crate::platform::PlatformClient;

pub struct ReplyComposer {
    platform: Arc<dyn PlatformClient>,
}

impl ReplyComposer {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }

    /// Reply text for a finished request.
    pub fn compose(url: &str, sensitive: bool, unnecessary_manual: bool) -> String {
        let mut message = url.to_string();
        if unnecessary_manual {
            message.push_str(UNNECESSARY_MANUAL_MESSAGE);
        }
        let template = if sensitive {
            NSFW_REPLY_TEMPLATE
        } else {
            REPLY_TEMPLATE
        };
        let mut text = fill(template, &message);
        text.push_str(BOT_FOOTER);
        text
    }

    /// Post the result under the context's reply target.
    ///
    /// When the bot is banned from the community the result goes to the requester as a
    /// private message instead.
    #[tracing::instrument(skip(self, ctx), fields(trigger.id = %ctx.trigger_id, reply_target = %ctx.reply_target))]
    pub async fn send(&self, ctx: &Context, url: &str, sensitive: bool) -> RequestOutcome {
        let text = Self::compose(url, sensitive, ctx.unnecessary_manual);

        match self.platform.post_reply(&ctx.reply_target, &text).await {
            Ok(reply_id) => {
                if ctx.distinguish {
                    if let Err(e) = self.platform.distinguish(&reply_id, true).await {
                        tracing::warn!(error = %e, reply.id = %reply_id, "Failed to distinguish reply");
                    }
                }
                tracing::info!(reply.id = %reply_id, "Reply posted");
                RequestOutcome::Success
            }
            Err(PlatformError::Forbidden(reason)) => {
                tracing::info!(reason = %reason, "Reply forbidden, falling back to private message");
                self.send_private(ctx, url).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to post reply");
                RequestOutcome::upload_failure(format!("Reply failed: {}", e))
            }
        }
    }

    async fn send_private(&self, ctx: &Context, url: &str) -> RequestOutcome {
        let Some(author) = ctx.author.as_deref() else {
            return RequestOutcome::user_failure("Banned from community and requester is unknown");
        };

        let mut body = fill(REPLY_BAN_TEMPLATE, url);
        body.push_str(BOT_FOOTER);

        match self
            .platform
            .send_message(author, REPLY_BAN_SUBJECT, &body)
            .await
        {
            Ok(()) => RequestOutcome::Success,
            Err(e) => {
                tracing::warn!(error = %e, recipient = %author, "Failed to send private message");
                RequestOutcome::upload_failure(format!("Private message failed: {}", e))
            }
        }
    }
}
