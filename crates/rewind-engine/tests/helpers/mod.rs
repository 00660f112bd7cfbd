//! Test helpers: thread fixtures and a pipeline wired to in-memory fakes.
//!
//! Run with `cargo test -p rewind-engine`.

#![allow(dead_code)]

pub mod fakes;
pub mod platform;

use std::sync::Arc;
use std::time::Duration;

use rewind_core::{Comment, Submission, ThingRef};
use rewind_db::{InMemoryBetaRepository, InMemoryDedupRepository};
use rewind_engine::{HostRegistry, PipelineSettings, RequestPipeline};

use fakes::{FakeFetcher, FakeProbe, FakeTransform, FakeUploadHost};
use platform::FakePlatform;

pub const BOT: &str = "vredditreverse";
pub const SUB: &str = "videos";
pub const POST: &str = "post1";

pub fn link_post(id: &str, url: &str, title: &str) -> Submission {
    Submission {
        id: id.to_string(),
        author: Some("op".to_string()),
        title: title.to_string(),
        is_self: false,
        selftext: String::new(),
        url: url.to_string(),
        over_18: false,
        subreddit_over_18: false,
        subreddit: SUB.to_string(),
    }
}

pub fn self_post(id: &str, title: &str, selftext: &str) -> Submission {
    Submission {
        is_self: true,
        selftext: selftext.to_string(),
        url: format!("https://www.reddit.com/r/{}/comments/{}/post/", SUB, id),
        ..link_post(id, "", title)
    }
}

pub fn comment(id: &str, author: &str, body: &str, parent: ThingRef) -> Comment {
    Comment {
        id: id.to_string(),
        author: Some(author.to_string()),
        body: body.to_string(),
        subreddit: SUB.to_string(),
        stickied: false,
        removed: false,
        parent,
        submission_id: POST.to_string(),
    }
}

pub fn summon() -> String {
    format!("u/{}", BOT)
}

pub fn on_post() -> ThingRef {
    ThingRef::Submission(POST.to_string())
}

pub fn on_comment(id: &str) -> ThingRef {
    ThingRef::Comment(id.to_string())
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        bot_username: BOT.to_string(),
        upload_retry_delay: Duration::from_millis(1),
        preview_url_template: "https://preview.example/{}".to_string(),
    }
}

pub struct Harness {
    pub platform: Arc<FakePlatform>,
    pub dedup: Arc<InMemoryDedupRepository>,
    pub beta: Arc<InMemoryBetaRepository>,
    pub fetcher: Arc<FakeFetcher>,
    pub probe: Arc<FakeProbe>,
    pub transform: Arc<FakeTransform>,
    pub hosts: Vec<Arc<FakeUploadHost>>,
    pub disabled: Vec<String>,
}

impl Harness {
    /// Platform with a link post; one unlimited upload host.
    pub fn new(post: Submission) -> Self {
        let platform = FakePlatform::new();
        platform.add_submission(post);
        Self {
            platform: Arc::new(platform),
            dedup: Arc::new(InMemoryDedupRepository::new()),
            beta: Arc::new(InMemoryBetaRepository::new()),
            fetcher: Arc::new(FakeFetcher::new()),
            probe: Arc::new(FakeProbe::single_video()),
            transform: Arc::new(FakeTransform::new()),
            hosts: vec![Arc::new(FakeUploadHost::new("primary", 1))],
            disabled: Vec::new(),
        }
    }

    pub fn with_hosts(mut self, hosts: Vec<FakeUploadHost>) -> Self {
        self.hosts = hosts.into_iter().map(Arc::new).collect();
        self
    }

    pub fn with_probe(mut self, probe: FakeProbe) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn with_transform(mut self, transform: FakeTransform) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    pub fn with_fetcher(mut self, fetcher: FakeFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_beta(mut self, names: &[&str]) -> Self {
        self.beta = Arc::new(InMemoryBetaRepository::with_names(names.iter().copied()));
        self
    }

    pub fn registry(&self) -> HostRegistry {
        self.hosts.iter().fold(
            HostRegistry::new(self.disabled.clone()),
            |registry, host| registry.with_host(host.clone()),
        )
    }

    pub fn pipeline(&self) -> RequestPipeline {
        RequestPipeline::builder()
            .platform(self.platform.clone())
            .registry(Arc::new(self.registry()))
            .dedup_repository(self.dedup.clone())
            .beta_repository(self.beta.clone())
            .fetcher(self.fetcher.clone())
            .probe(self.probe.clone())
            .transform(self.transform.clone())
            .settings(settings())
            .build()
            .expect("pipeline builds")
    }

    pub fn upload_calls(&self) -> usize {
        self.hosts.iter().map(|h| h.calls()).sum()
    }
}
