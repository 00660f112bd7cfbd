//! Request pipeline
//!
//! resolve -> (re-reverse | beta | queue hand-off) -> cache check -> fetch -> probe ->
//! select -> reverse -> upload -> cache insert -> reply
//!
//! Every request ends in exactly one [`RequestOutcome`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rewind_core::constants::{fill, AUTOMOD_AUTHOR};
use rewind_core::{AppError, Comment, Config, Context, ErrorMetadata, LogLevel, RequestOutcome};
use rewind_db::{BetaRepository, DedupRepository, InMemoryBetaRepository};
use rewind_hosts::MediaFetcher;
use rewind_processing::{MediaProbe, MediaTransform};
use rewind_worker::{Job, JobHandler, RequestQueue};

use crate::cache::DedupCache;
use crate::platform::PlatformClient;
use crate::reply::ReplyComposer;
use crate::resolver::{source_url, ContextResolver};
use crate::router::{HostRegistry, HostRouter, PayloadSource, PlannedUpload, RouteOutcome};

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub bot_username: String,
    /// Sleep between the two attempts against one host.
    pub upload_retry_delay: Duration,
    /// Beta preview link; `{}` receives the source media id.
    pub preview_url_template: String,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            bot_username: config.bot_username.clone(),
            upload_retry_delay: config.upload_retry_delay(),
            preview_url_template: config.preview_url_template.clone(),
        }
    }
}

/// Map a collaborator error onto a terminal outcome.
fn classify(stage: &str, err: &AppError) -> RequestOutcome {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(stage, error_code = code, error = %err, "Request stage failed"),
        LogLevel::Warn => tracing::warn!(stage, error_code = code, error = %err, "Request stage failed"),
        LogLevel::Error => tracing::error!(stage, error_code = code, error = %err, "Request stage failed"),
    }

    let reason = format!("{} failed: {}", stage, err);
    if err.is_recoverable() {
        RequestOutcome::upload_failure(reason)
    } else {
        RequestOutcome::user_failure(reason)
    }
}

pub struct RequestPipeline {
    resolver: ContextResolver,
    cache: DedupCache,
    router: HostRouter,
    beta: Arc<dyn BetaRepository>,
    fetcher: Arc<dyn MediaFetcher>,
    probe: Arc<dyn MediaProbe>,
    transform: Arc<dyn MediaTransform>,
    reply: ReplyComposer,
    settings: PipelineSettings,
}

impl RequestPipeline {
    pub fn builder() -> RequestPipelineBuilder {
        RequestPipelineBuilder::default()
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    pub fn router(&self) -> &HostRouter {
        &self.router
    }

    /// Handle one summon comment.
    ///
    /// With a queue, the resolved request is handed off and the call returns
    /// immediately; the queue consumer later re-enters through [`JobHandler`].
    #[tracing::instrument(skip(self, trigger, queue), fields(trigger.id = %trigger.id, subreddit = %trigger.subreddit))]
    pub async fn process(
        &self,
        trigger: &Comment,
        queue: Option<&dyn RequestQueue>,
    ) -> RequestOutcome {
        let outcome = self.run(trigger, queue).await;
        match &outcome {
            RequestOutcome::Success => tracing::info!(outcome = outcome.as_str(), "Request finished"),
            RequestOutcome::UserFailure(reason) | RequestOutcome::UploadFailure(reason) => {
                tracing::info!(outcome = outcome.as_str(), reason = %reason, "Request finished")
            }
        }
        outcome
    }

    async fn run(&self, trigger: &Comment, queue: Option<&dyn RequestQueue>) -> RequestOutcome {
        let Some(author) = trigger.author.as_deref() else {
            return RequestOutcome::user_failure("Summon author was deleted");
        };

        let beta = self.is_beta(author, &trigger.subreddit).await;

        let mut ctx = match self.resolver.resolve(trigger).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(error = %e, "Context resolution failed");
                return RequestOutcome::user_failure(format!("Could not resolve context: {}", e));
            }
        };

        let Some(reference) = ctx.reference.clone() else {
            return RequestOutcome::user_failure("No media found");
        };

        if ctx.rereverse && !ctx.reupload {
            tracing::debug!(url = %reference.url, "Re-reverse, replying with the original");
            return self.reply.send(&ctx, &reference.url, ctx.sensitive).await;
        }

        ctx.beta = beta;

        if let Some(queue) = queue {
            return match queue.enqueue(ctx.to_map(), reference).await {
                Ok(()) => RequestOutcome::Success,
                Err(e) => classify("Enqueue", &e),
            };
        }

        self.process_context(ctx).await
    }

    async fn is_beta(&self, author: &str, subreddit: &str) -> bool {
        let name = if author.eq_ignore_ascii_case(AUTOMOD_AUTHOR) {
            format!("/r/{}", subreddit)
        } else {
            author.to_string()
        };

        match self.beta.is_opted_in(&name).await {
            Ok(opted_in) => opted_in,
            Err(e) => {
                tracing::warn!(error = %e, name = %name, "Beta lookup failed");
                false
            }
        }
    }

    /// Run a resolved context to its outcome.
    #[tracing::instrument(skip(self, ctx), fields(trigger.id = %ctx.trigger_id))]
    pub async fn process_context(&self, ctx: Context) -> RequestOutcome {
        let Some(reference) = ctx.reference.clone() else {
            return RequestOutcome::user_failure("No media found");
        };

        if ctx.beta {
            let url = fill(&self.settings.preview_url_template, &reference.id);
            return self.reply.send(&ctx, &url, ctx.sensitive).await;
        }

        let key = reference.key();
        let guard = self.cache.lock_origin(&key).await;

        // A reupload keeps the current pairing until its replacement is uploaded.
        if !ctx.reupload {
            match self.cache.lookup(&key).await {
                Ok(Some(hit)) => {
                    let url = self
                        .router
                        .registry()
                        .url_for(&hit.reference)
                        .or_else(|| source_url(&hit.reference.host, &hit.reference.id));
                    match url {
                        Some(url) => {
                            drop(guard);
                            return self.reply.send(&ctx, &url, hit.sensitive || ctx.sensitive).await;
                        }
                        None => {
                            tracing::warn!(paired = %hit.reference, "Cached host is unknown, dropping record");
                            if let Err(e) = self.cache.delete(&key).await {
                                return classify("Cache delete", &e);
                            }
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => return classify("Cache lookup", &e),
            }
        }

        let data = match self.fetcher.fetch(&reference).await {
            Ok(data) => data,
            Err(e) => return classify("Download", &e),
        };

        let descriptor = match self.probe.probe(&reference, data).await {
            Ok(descriptor) => descriptor,
            Err(e) => return classify("Probe", &e),
        };
        if !descriptor.is_analyzable() {
            return RequestOutcome::user_failure("Media could not be analyzed");
        }

        let plan = self.router.select_candidates(&descriptor, ctx.sensitive);
        if plan.is_empty() {
            return RequestOutcome::user_failure("File too large or unsupported for every upload host");
        }

        let mut reversals = LazyReversal::new(self.transform.as_ref());
        match self
            .router
            .attempt_upload_with(&plan, ctx.sensitive, &mut reversals)
            .await
        {
            RouteOutcome::Uploaded(uploaded) => {
                if ctx.reupload {
                    if let Err(e) = self.cache.delete(&key).await {
                        tracing::error!(error = %e, origin = %key, "Failed to drop replaced dedup record");
                    }
                }
                if let Err(e) = self.cache.insert(&key, &uploaded.key(), ctx.sensitive).await {
                    tracing::error!(error = %e, origin = %key, "Failed to store dedup record");
                }
                drop(guard);
                self.reply.send(&ctx, &uploaded.url, ctx.sensitive).await
            }
            RouteOutcome::UserFailure(reason) => RequestOutcome::UserFailure(reason),
            RouteOutcome::UploadFailure(reason) => RequestOutcome::UploadFailure(reason),
        }
    }
}

/// Reverses each candidate once, on first use. A candidate that fails to reverse is
/// skipped for every host.
struct LazyReversal<'a> {
    transform: &'a dyn MediaTransform,
    reversed: HashMap<usize, Option<Bytes>>,
}

impl<'a> LazyReversal<'a> {
    fn new(transform: &'a dyn MediaTransform) -> Self {
        Self {
            transform,
            reversed: HashMap::new(),
        }
    }
}

#[async_trait]
impl<'a> PayloadSource for LazyReversal<'a> {
    async fn payload(&mut self, pair: &PlannedUpload) -> Option<Bytes> {
        if let Some(data) = self.reversed.get(&pair.candidate_index) {
            return data.clone();
        }

        let data = match self.transform.reverse(&pair.candidate).await {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    encoding = %pair.candidate.encoding,
                    "Reversal failed, dropping candidate"
                );
                None
            }
        };
        self.reversed.insert(pair.candidate_index, data.clone());
        data
    }
}

#[async_trait]
impl JobHandler for RequestPipeline {
    async fn handle_job(self: Arc<Self>, job: &Job) -> RequestOutcome {
        let mut ctx = match Context::from_map(job.context.clone()) {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!(error = %e, job_id = job.id, "Unreadable queued context");
                return RequestOutcome::user_failure(format!("Unreadable queued context: {}", e));
            }
        };
        if ctx.reference.is_none() {
            ctx.reference = Some(job.reference.clone());
        }
        self.process_context(ctx).await
    }
}

#[derive(Default)]
pub struct RequestPipelineBuilder {
    platform: Option<Arc<dyn PlatformClient>>,
    registry: Option<Arc<HostRegistry>>,
    dedup: Option<Arc<dyn DedupRepository>>,
    beta: Option<Arc<dyn BetaRepository>>,
    fetcher: Option<Arc<dyn MediaFetcher>>,
    probe: Option<Arc<dyn MediaProbe>>,
    transform: Option<Arc<dyn MediaTransform>>,
    settings: Option<PipelineSettings>,
}

impl RequestPipelineBuilder {
    pub fn platform(mut self, platform: Arc<dyn PlatformClient>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn registry(mut self, registry: Arc<HostRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn dedup_repository(mut self, repository: Arc<dyn DedupRepository>) -> Self {
        self.dedup = Some(repository);
        self
    }

    /// Optional. Defaults to an empty opt-in list.
    pub fn beta_repository(mut self, repository: Arc<dyn BetaRepository>) -> Self {
        self.beta = Some(repository);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn transform(mut self, transform: Arc<dyn MediaTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn build(self) -> Result<RequestPipeline, AppError> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T, AppError> {
            value.ok_or_else(|| AppError::Config(format!("Pipeline requires a {}", name)))
        }

        let platform = required(self.platform, "platform client")?;
        let registry = required(self.registry, "host registry")?;
        let settings = required(self.settings, "settings")?;

        Ok(RequestPipeline {
            resolver: ContextResolver::new(platform.clone(), &settings.bot_username)?,
            cache: DedupCache::new(required(self.dedup, "dedup repository")?),
            router: HostRouter::new(registry, settings.upload_retry_delay),
            beta: self
                .beta
                .unwrap_or_else(|| Arc::new(InMemoryBetaRepository::new())),
            fetcher: required(self.fetcher, "media fetcher")?,
            probe: required(self.probe, "media probe")?,
            transform: required(self.transform, "media transform")?,
            reply: ReplyComposer::new(platform),
            settings,
        })
    }
}
