//! End-to-end request pipeline tests with in-memory collaborators.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use helpers::fakes::{candidate, FakeFetcher, FakeProbe, FakeTransform, FakeUploadHost, RecordingQueue};
use helpers::*;
use rewind_core::constants::BOT_FOOTER;
use rewind_core::{
    AppError, Encoding, EncodingLimits, HostCapability, HostedId, PlatformError, RequestOutcome,
    SensitivityPolicy, ThingRef, UploadOutcome,
};
use rewind_db::DedupRepository;
use rewind_worker::{Job, JobHandler, JobQueue, JobQueueConfig, RequestQueue};

fn harness() -> Harness {
    Harness::new(link_post(POST, "https://v.redd.it/abc123", "Funny cat"))
}

fn add_trigger(harness: &Harness, id: &str, body: &str) {
    harness
        .platform
        .add_comment(comment(id, "bob", body, on_post()));
}

fn source_key() -> HostedId {
    HostedId::new("vreddit", "abc123")
}

#[tokio::test]
async fn test_nsfw_reupload_direct_link_end_to_end() {
    let harness = harness();
    add_trigger(
        &harness,
        "t",
        &format!("{} NSFW reupload https://example.com/video.mp4", summon()),
    );
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);

    assert_eq!(harness.dedup.len().await, 1);
    let record = harness
        .dedup
        .get_by_origin(&HostedId::new("link", "https://example.com/video.mp4"))
        .await
        .expect("record stored");
    assert!(record.sensitive);
    assert_eq!(record.total_requests, 1);
    assert_eq!(record.reversed.host, "primary");

    let replies = harness.platform.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, ThingRef::Comment("t".into()));
    assert!(replies[0].1.starts_with("##NSFW\n\nhttps://primary.example/"));
    assert!(replies[0].1.ends_with(BOT_FOOTER));
    assert_eq!(harness.upload_calls(), 1);
}

#[tokio::test]
async fn test_cache_hit_replies_without_uploading() {
    let harness = harness();
    add_trigger(&harness, "t", &summon());
    harness
        .dedup
        .insert(
            &source_key(),
            &HostedId::new("primary", "r9.mp4"),
            false,
            Utc::now().date_naive(),
        )
        .await
        .unwrap();
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 0);
    assert_eq!(harness.fetcher.calls(), 0);

    let replies = harness.platform.replies();
    assert!(replies[0].1.starts_with("https://primary.example/r9.mp4"));
    let record = harness.dedup.get_by_origin(&source_key()).await.unwrap();
    assert_eq!(record.total_requests, 2);
}

#[tokio::test]
async fn test_repeat_request_reuses_first_upload() {
    let harness = harness();
    add_trigger(&harness, "t1", &summon());
    add_trigger(&harness, "t2", &summon());
    let pipeline = harness.pipeline();

    pipeline.process(&harness.platform.comment("t1"), None).await;
    pipeline.process(&harness.platform.comment("t2"), None).await;

    assert_eq!(harness.upload_calls(), 1);
    let replies = harness.platform.replies();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].1, replies[1].1);
}

#[tokio::test]
async fn test_concurrent_requests_for_same_source_upload_once() {
    let harness = harness();
    add_trigger(&harness, "t1", &summon());
    add_trigger(&harness, "t2", &summon());
    let pipeline = Arc::new(harness.pipeline());

    let first = {
        let pipeline = pipeline.clone();
        let trigger = harness.platform.comment("t1");
        tokio::spawn(async move { pipeline.process(&trigger, None).await })
    };
    let second = {
        let pipeline = pipeline.clone();
        let trigger = harness.platform.comment("t2");
        tokio::spawn(async move { pipeline.process(&trigger, None).await })
    };

    assert_eq!(first.await.unwrap(), RequestOutcome::Success);
    assert_eq!(second.await.unwrap(), RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 1);
    assert_eq!(harness.dedup.len().await, 1);
}

#[tokio::test]
async fn test_rereverse_replies_with_original() {
    let harness = harness();
    harness
        .platform
        .add_comment(comment("c1", "alice", &summon(), on_post()));
    harness.platform.add_comment(comment(
        "b1",
        BOT,
        "https://primary.example/r1.mp4",
        on_comment("c1"),
    ));
    harness
        .platform
        .add_comment(comment("t", "bob", &summon(), on_comment("b1")));
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 0);
    assert_eq!(harness.fetcher.calls(), 0);
    assert!(harness.platform.replies()[0]
        .1
        .starts_with("https://v.redd.it/abc123"));
}

#[tokio::test]
async fn test_reupload_replaces_cached_record() {
    let harness = harness();
    add_trigger(&harness, "t", &format!("{} renew", summon()));
    harness
        .dedup
        .insert(
            &source_key(),
            &HostedId::new("primary", "expired.mp4"),
            false,
            Utc::now().date_naive(),
        )
        .await
        .unwrap();
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 1);

    let record = harness.dedup.get_by_origin(&source_key()).await.unwrap();
    assert_ne!(record.reversed.id, "expired.mp4");
    assert_eq!(record.total_requests, 1);
}

#[tokio::test]
async fn test_failed_reupload_keeps_cached_record() {
    let failing = (0..2)
        .map(|_| UploadOutcome::Failed("503".into()))
        .collect();
    let harness = harness().with_hosts(vec![FakeUploadHost::new("primary", 1).scripted(failing)]);
    add_trigger(&harness, "t", &format!("{} renew", summon()));
    harness
        .dedup
        .insert(
            &source_key(),
            &HostedId::new("primary", "good.mp4"),
            false,
            Utc::now().date_naive(),
        )
        .await
        .unwrap();
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert!(outcome.is_retryable());
    assert_eq!(harness.upload_calls(), 2);

    let record = harness.dedup.get_by_origin(&source_key()).await.unwrap();
    assert_eq!(record.reversed, HostedId::new("primary", "good.mp4"));
}

#[tokio::test]
async fn test_beta_user_gets_preview_link() {
    let harness = harness().with_beta(&["Bob"]);
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 0);
    assert!(harness.dedup.is_empty().await);
    assert!(harness.platform.replies()[0]
        .1
        .starts_with("https://preview.example/abc123\n"));
}

#[tokio::test]
async fn test_beta_community_for_automod_summons() {
    let harness = harness().with_beta(&["/r/videos"]);
    harness
        .platform
        .add_comment(comment("am", "AutoModerator", &summon(), on_post()));
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("am"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 0);
}

#[tokio::test]
async fn test_queue_hand_off_then_worker_completes() {
    let harness = harness();
    add_trigger(&harness, "t", &format!("nsfw {}", summon()));
    let pipeline = Arc::new(harness.pipeline());
    let queue = RecordingQueue::default();

    let outcome = pipeline
        .process(&harness.platform.comment("t"), Some(&queue as &dyn RequestQueue))
        .await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.fetcher.calls(), 0);
    assert!(harness.platform.replies().is_empty());

    let jobs = queue.jobs();
    assert_eq!(jobs.len(), 1);
    let (context, reference) = jobs[0].clone();
    assert_eq!(reference.key(), source_key());

    let job = Job {
        id: 1,
        context,
        reference,
        attempt: 0,
    };
    let outcome = pipeline.clone().handle_job(&job).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 1);
    assert!(harness.platform.replies()[0].1.starts_with("##NSFW"));
}

#[tokio::test]
async fn test_job_queue_runs_handed_off_request() {
    let harness = harness();
    add_trigger(&harness, "t", &summon());
    let pipeline = Arc::new(harness.pipeline());
    let handler: Arc<dyn JobHandler> = pipeline.clone();
    let (finished_tx, mut finished_rx) = tokio::sync::mpsc::channel(1);
    let queue = JobQueue::new(
        JobQueueConfig {
            max_workers: 1,
            queue_size: 4,
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
        },
        Arc::downgrade(&handler),
        Some(finished_tx),
    );

    let outcome = pipeline
        .process(&harness.platform.comment("t"), Some(&queue as &dyn RequestQueue))
        .await;
    assert_eq!(outcome, RequestOutcome::Success);

    let (_, finished) = tokio::time::timeout(Duration::from_secs(5), finished_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(finished, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 1);
    assert_eq!(harness.platform.replies().len(), 1);
    queue.shutdown().await;
}

#[tokio::test]
async fn test_banned_reply_falls_back_to_private_message() {
    let harness = harness();
    add_trigger(&harness, "t", &summon());
    harness
        .platform
        .fail_replies_with(PlatformError::Forbidden("banned".into()));
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);

    let messages = harness.platform.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "bob");
    assert!(messages[0].2.contains("https://primary.example/"));
}

#[tokio::test]
async fn test_rate_limited_reply_is_upload_failure() {
    let harness = harness();
    add_trigger(&harness, "t", &summon());
    harness
        .platform
        .fail_replies_with(PlatformError::RateLimited("try again in 9 minutes".into()));
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert!(outcome.is_retryable());
    // The upload is remembered so a retry only replies.
    assert_eq!(harness.dedup.len().await, 1);
}

#[tokio::test]
async fn test_no_media_is_user_failure() {
    let harness = Harness::new(self_post(POST, "Question", "what song is this?"));
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert!(matches!(outcome, RequestOutcome::UserFailure(_)));
    assert!(harness.platform.replies().is_empty());
}

#[tokio::test]
async fn test_deleted_author_is_user_failure() {
    let harness = harness();
    let mut trigger = comment("t", "bob", &summon(), on_post());
    trigger.author = None;
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&trigger, None).await;
    assert!(matches!(outcome, RequestOutcome::UserFailure(_)));
}

#[tokio::test]
async fn test_unanalyzable_media_is_user_failure() {
    let harness = harness().with_probe(FakeProbe::new(Vec::new()));
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert!(matches!(outcome, RequestOutcome::UserFailure(_)));
    assert_eq!(harness.upload_calls(), 0);
}

#[tokio::test]
async fn test_too_large_for_every_host_is_user_failure() {
    let small = FakeUploadHost::with_capability(HostCapability {
        name: "small".into(),
        limits: vec![EncodingLimits {
            encoding: Encoding::Mp4,
            max_duration: None,
            max_size_bytes: Some(10),
            max_frames: None,
        }],
        audio: true,
        sensitivity: SensitivityPolicy::AllowSensitive,
        priority: 1,
    });
    let harness = harness().with_hosts(vec![small]);
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert!(matches!(outcome, RequestOutcome::UserFailure(_)));
    assert_eq!(harness.transform.calls(), 0);
}

#[tokio::test]
async fn test_later_candidates_are_not_reversed_after_success() {
    let harness = harness().with_probe(FakeProbe::new(vec![
        candidate(Encoding::Mp4, 1_000),
        candidate(Encoding::Gif, 5_000),
    ]));
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.transform.calls(), 1);
    assert_eq!(harness.hosts[0].uploads()[0].0, Encoding::Mp4);
}

#[tokio::test]
async fn test_candidate_is_reversed_once_across_hosts() {
    let failing = (0..2)
        .map(|_| UploadOutcome::Failed("503".into()))
        .collect();
    let harness = harness().with_hosts(vec![
        FakeUploadHost::new("flaky", 1).scripted(failing),
        FakeUploadHost::new("backup", 2),
    ]);
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);
    assert_eq!(harness.upload_calls(), 3);
    assert_eq!(harness.transform.calls(), 1);
}

#[tokio::test]
async fn test_failed_reversal_drops_only_that_candidate() {
    let harness = harness()
        .with_probe(FakeProbe::new(vec![
            candidate(Encoding::Mp4, 1_000),
            candidate(Encoding::Gif, 5_000),
        ]))
        .with_transform(FakeTransform::failing_for(&[Encoding::Mp4]));
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(outcome, RequestOutcome::Success);

    let uploads = harness.hosts[0].uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, Encoding::Gif);
    assert!(harness.platform.replies()[0].1.contains(".gif"));
}

#[tokio::test]
async fn test_every_reversal_failing_is_upload_failure() {
    let harness = harness().with_transform(FakeTransform::failing_for(&[Encoding::Mp4]));
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert!(outcome.is_retryable());
    assert_eq!(harness.upload_calls(), 0);
}

#[tokio::test]
async fn test_all_hosts_failing_is_upload_failure_without_record() {
    let failing = (0..2)
        .map(|_| UploadOutcome::Failed("503".into()))
        .collect();
    let harness = harness().with_hosts(vec![FakeUploadHost::new("primary", 1).scripted(failing)]);
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert!(outcome.is_retryable());
    assert!(harness.dedup.is_empty().await);
    assert!(harness.platform.replies().is_empty());
}

#[tokio::test]
async fn test_host_rejection_is_user_failure() {
    let harness = harness().with_hosts(vec![FakeUploadHost::new("primary", 1)
        .scripted(vec![UploadOutcome::Rejected("file type not allowed".into())])]);
    add_trigger(&harness, "t", &summon());
    let pipeline = harness.pipeline();

    let outcome = pipeline.process(&harness.platform.comment("t"), None).await;
    assert_eq!(
        outcome,
        RequestOutcome::UserFailure("file type not allowed".into())
    );
}

#[tokio::test]
async fn test_download_errors_are_classified() {
    let harness = harness().with_fetcher(FakeFetcher::failing(AppError::Fetch(
        "connection reset".into(),
    )));
    add_trigger(&harness, "t", &summon());
    let outcome = harness
        .pipeline()
        .process(&harness.platform.comment("t"), None)
        .await;
    assert!(outcome.is_retryable());

    let harness = harness.with_fetcher(FakeFetcher::failing(AppError::InvalidInput(
        "too big".into(),
    )));
    let outcome = harness
        .pipeline()
        .process(&harness.platform.comment("t"), None)
        .await;
    assert!(matches!(outcome, RequestOutcome::UserFailure(_)));
}
