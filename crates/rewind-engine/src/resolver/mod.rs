//! Context resolution
//!
//! Walks from the summon comment up through its ancestors until a media URL turns up.
//! All flags gathered on the way travel in an explicit [`WalkState`] that each step
//! takes by value and hands back, so a layer can be exercised in isolation.

pub mod extract;

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rewind_core::constants::AUTOMOD_AUTHOR;
use rewind_core::{AppError, Comment, Context, PlatformError, Thing, ThingRef};

pub use extract::{source_url, MediaMatch, MediaUrlExtractor};

use crate::platform::PlatformClient;

/// Accumulator threaded through the ancestry walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkState {
    pub sensitive: bool,
    pub rereverse: bool,
    pub reupload: bool,
    pub unnecessary_manual: bool,
    pub distinguish: bool,
    /// Set when the reply has to go somewhere other than the trigger.
    pub reply_target: Option<ThingRef>,
    /// Lookahead mode: only searches, never changes flags or the thread.
    pub checking_manual: bool,
}

impl WalkState {
    fn checking(&self) -> Self {
        Self {
            checking_manual: true,
            ..self.clone()
        }
    }
}

/// Where a walk ended.
#[derive(Debug, Clone)]
pub struct Walk {
    pub found: Option<MediaMatch>,
    /// Layer of the node the walk ended on. The trigger is layer 0.
    pub layer: u32,
    pub state: WalkState,
}

pub struct ContextResolver {
    platform: Arc<dyn PlatformClient>,
    extractor: MediaUrlExtractor,
    bot_username: String,
}

impl ContextResolver {
    pub fn new(platform: Arc<dyn PlatformClient>, bot_username: &str) -> Result<Self, AppError> {
        Ok(Self {
            platform,
            extractor: MediaUrlExtractor::new(bot_username)?,
            bot_username: bot_username.to_string(),
        })
    }

    pub fn extractor(&self) -> &MediaUrlExtractor {
        &self.extractor
    }

    /// Build the request context for a summon comment.
    #[tracing::instrument(skip(self, trigger), fields(trigger.id = %trigger.id, subreddit = %trigger.subreddit))]
    pub async fn resolve(&self, trigger: &Comment) -> Result<Context, AppError> {
        let submission = self.platform.fetch_submission(&trigger.submission_id).await?;

        let state = WalkState {
            sensitive: submission.over_18
                || submission.subreddit_over_18
                || self.extractor.is_sensitive_text(&submission.title)
                || (submission.is_self && self.extractor.is_sensitive_text(&submission.selftext)),
            reupload: self.extractor.is_reupload(&trigger.body),
            ..WalkState::default()
        };

        let walk = self.walk(Thing::Comment(trigger.clone()), 0, state).await?;
        let state = walk.state;

        let mut ctx = Context::new(&trigger.id, &trigger.subreddit);
        ctx.reply_target = state.reply_target.unwrap_or_else(|| trigger.thing_ref());
        ctx.author = trigger.author.clone();
        ctx.reference = walk
            .found
            .map(|m| m.into_reference(state.sensitive, walk.layer));
        ctx.sensitive = state.sensitive;
        ctx.rereverse = state.rereverse;
        ctx.reupload = state.reupload;
        ctx.unnecessary_manual = state.unnecessary_manual;
        ctx.distinguish = state.distinguish;

        match &ctx.reference {
            Some(reference) => tracing::debug!(
                media.host = %reference.host,
                media.id = %reference.id,
                depth = reference.depth,
                sensitive = ctx.sensitive,
                rereverse = ctx.rereverse,
                "Context resolved"
            ),
            None => tracing::debug!(layers = walk.layer, "No media found in ancestry"),
        }

        Ok(ctx)
    }

    /// Ascend from `node` until media is found or the submission has been examined.
    pub fn walk(
        &self,
        node: Thing,
        layer: u32,
        state: WalkState,
    ) -> BoxFuture<'_, Result<Walk, AppError>> {
        async move {
            let mut node = node;
            let mut layer = layer;
            let mut state = state;
            let mut refetched = false;

            loop {
                let comment = match node {
                    Thing::Submission(submission) => {
                        if !state.checking_manual
                            && (self.extractor.is_sensitive_text(&submission.title)
                                || (submission.is_self
                                    && self.extractor.is_sensitive_text(&submission.selftext)))
                        {
                            state.sensitive = true;
                        }

                        let found = if submission.is_self {
                            self.extractor.extract(&submission.selftext)
                        } else if self.extractor.is_textpost(&submission.url) {
                            None
                        } else {
                            self.extractor.extract(&submission.url)
                        };
                        return Ok(Walk {
                            found,
                            layer,
                            state,
                        });
                    }
                    Thing::Comment(comment) => comment,
                };

                if !state.checking_manual && self.extractor.is_sensitive_text(&comment.body) {
                    state.sensitive = true;
                }

                if comment.is_authored_by(&self.bot_username)
                    && !state.rereverse
                    && !state.checking_manual
                    && !state.reupload
                {
                    state.rereverse = true;
                    node = self.ascend(&comment, &mut refetched).await?;
                    layer += 1;
                    continue;
                }

                if comment.is_authored_by(AUTOMOD_AUTHOR) {
                    if layer == 0
                        && !state.checking_manual
                        && self.platform.is_moderator(&comment.subreddit).await?
                    {
                        if comment.removed {
                            tracing::debug!(comment.id = %comment.id, "AutoModerator comment already removed");
                        } else {
                            self.platform.remove_comment(&comment.id).await?;
                            tracing::info!(comment.id = %comment.id, "Removed AutoModerator summon");
                        }
                        state.distinguish |= comment.stickied;
                        state.reply_target = Some(comment.parent.clone());
                        node = self.ascend(&comment, &mut refetched).await?;
                        layer += 1;
                        continue;
                    }

                    if state.rereverse && self.extractor.mentions_bot(&comment.body) {
                        tracing::warn!(comment.id = %comment.id, "Summon loop detected");
                        return Ok(Walk {
                            found: None,
                            layer,
                            state,
                        });
                    }
                }

                if let Some(found) = self.extractor.extract(&comment.body) {
                    if layer == 0 && !state.checking_manual {
                        state.unnecessary_manual = self.is_redundant(&comment, &found, &state).await;
                    }
                    return Ok(Walk {
                        found: Some(found),
                        layer,
                        state,
                    });
                }

                node = self.ascend(&comment, &mut refetched).await?;
                layer += 1;
            }
        }
        .boxed()
    }

    /// Whether the ancestry above `comment` already leads to `found`.
    async fn is_redundant(&self, comment: &Comment, found: &MediaMatch, state: &WalkState) -> bool {
        let mut refetched = false;
        let lookahead = match self.ascend(comment, &mut refetched).await {
            Ok(parent) => self.walk(parent, 1, state.checking()).await,
            Err(e) => Err(e),
        };

        match lookahead {
            Ok(walk) => walk.found.is_some_and(|m| m.key() == found.key()),
            Err(e) => {
                tracing::debug!(error = %e, "Manual URL lookahead failed");
                false
            }
        }
    }

    /// Parent of `comment`. A structural fault is answered once per walk by loading
    /// the submission fresh and continuing from there.
    async fn ascend(&self, comment: &Comment, refetched: &mut bool) -> Result<Thing, AppError> {
        match self.platform.parent(comment).await {
            Ok(parent) => Ok(parent),
            Err(PlatformError::Structural(reason)) if !*refetched => {
                tracing::warn!(
                    comment.id = %comment.id,
                    reason = %reason,
                    "Ancestry fault, re-fetching submission"
                );
                *refetched = true;
                let submission = self
                    .platform
                    .fetch_submission(&comment.submission_id)
                    .await?;
                Ok(Thing::Submission(submission))
            }
            Err(e) => Err(e.into()),
        }
    }
}
