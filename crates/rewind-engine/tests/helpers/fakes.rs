//! Scriptable stand-ins for hosts, fetcher, probe, transform and queue.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use rewind_core::{
    AppError, Encoding, EncodingCandidate, EncodingLimits, HostCapability, MediaDescriptor,
    MediaReference, SensitivityPolicy, UploadOutcome, UploadedRef,
};
use rewind_hosts::{MediaFetcher, UploadHost};
use rewind_processing::{MediaProbe, MediaTransform};
use rewind_worker::RequestQueue;
use serde_json::{Map, Value};

pub struct FakeUploadHost {
    capability: HostCapability,
    script: Mutex<VecDeque<UploadOutcome>>,
    calls: AtomicUsize,
    pub uploads: Mutex<Vec<(Encoding, Bytes)>>,
}

impl FakeUploadHost {
    /// Host that takes every encoding, audio and sensitive media without limits.
    pub fn new(name: &str, priority: u32) -> Self {
        Self::with_capability(HostCapability {
            name: name.to_string(),
            limits: [Encoding::Mp4, Encoding::Webm, Encoding::Gif]
                .into_iter()
                .map(EncodingLimits::unbounded)
                .collect(),
            audio: true,
            sensitivity: SensitivityPolicy::AllowSensitive,
            priority,
        })
    }

    pub fn with_capability(capability: HostCapability) -> Self {
        Self {
            capability,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes returned in order; once exhausted every upload succeeds.
    pub fn scripted(self, outcomes: Vec<UploadOutcome>) -> Self {
        *self.script.lock().unwrap() = outcomes.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<(Encoding, Bytes)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadHost for FakeUploadHost {
    fn name(&self) -> &str {
        &self.capability.name
    }

    fn capability(&self) -> HostCapability {
        self.capability.clone()
    }

    fn url_for(&self, id: &str) -> String {
        format!("https://{}.example/{}", self.capability.name, id)
    }

    async fn upload(
        &self,
        data: Bytes,
        encoding: Encoding,
        _sensitive: bool,
        _has_audio: bool,
    ) -> UploadOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.uploads.lock().unwrap().push((encoding, data));

        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }

        let id = format!("r{}.{}", call, encoding.extension());
        UploadOutcome::Uploaded(UploadedRef {
            host: self.capability.name.clone(),
            url: self.url_for(&id),
            id,
        })
    }

    async fn delete(&self, _id: &str) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    calls: AtomicUsize,
    error: Mutex<Option<AppError>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: AppError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            error: Mutex::new(Some(error)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, reference: &MediaReference) -> Result<Bytes, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(Bytes::from(format!("source:{}", reference.url)))
    }
}

/// Reports the configured candidates for every input.
pub struct FakeProbe {
    candidates: Vec<EncodingCandidate>,
}

impl FakeProbe {
    pub fn new(candidates: Vec<EncodingCandidate>) -> Self {
        Self { candidates }
    }

    /// One short silent mp4 candidate.
    pub fn single_video() -> Self {
        Self::new(vec![candidate(Encoding::Mp4, 1_000_000)])
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(
        &self,
        reference: &MediaReference,
        data: Bytes,
    ) -> Result<MediaDescriptor, AppError> {
        Ok(MediaDescriptor {
            reference: reference.clone(),
            candidates: self
                .candidates
                .iter()
                .cloned()
                .map(|c| c.with_data(data.clone()))
                .collect(),
        })
    }
}

/// Reverses the bytes themselves. Encodings in `failing` error out.
#[derive(Default)]
pub struct FakeTransform {
    failing: HashSet<Encoding>,
    calls: AtomicUsize,
}

impl FakeTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(encodings: &[Encoding]) -> Self {
        Self {
            failing: encodings.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTransform for FakeTransform {
    async fn reverse(&self, candidate: &EncodingCandidate) -> Result<Bytes, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&candidate.encoding) {
            return Err(AppError::Transform(format!(
                "cannot encode {}",
                candidate.encoding
            )));
        }
        let mut data = candidate.data.to_vec();
        data.reverse();
        Ok(Bytes::from(data))
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub jobs: Mutex<Vec<(Map<String, Value>, MediaReference)>>,
}

impl RecordingQueue {
    pub fn jobs(&self) -> Vec<(Map<String, Value>, MediaReference)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequestQueue for RecordingQueue {
    async fn enqueue(
        &self,
        context: Map<String, Value>,
        reference: MediaReference,
    ) -> Result<(), AppError> {
        self.jobs.lock().unwrap().push((context, reference));
        Ok(())
    }
}

pub fn candidate(encoding: Encoding, size_bytes: u64) -> EncodingCandidate {
    EncodingCandidate {
        encoding,
        duration: 4.5,
        width: 640,
        height: 360,
        frames: Some(135),
        size_bytes,
        has_audio: false,
        data: Bytes::new(),
    }
}
