use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reel_core::{
    Artifact, ErrorKind, GenerationRequest, JobError, JobId, JobOutcome, JobState, Platform,
    ProgressEvent, RenderParams, Resolution, STATUS_COMPLETED,
};
use reel_engine::{
    ApiSettings, ChannelHandle, ChannelWatcher, DeliveryStatus, FileSink, JobCoordinator, JobSubmitter,
    ProgressChannel, ProgressSink, ResultSink, SinkError, NETWORK_FAILURE_MESSAGE,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Log = Arc<Mutex<Vec<String>>>;

/// Channel whose events are pushed by the test.
#[derive(Default)]
struct FakeChannel {
    log: Log,
    open: Mutex<HashMap<JobId, (Arc<dyn ProgressSink>, ChannelWatcher)>>,
}

impl FakeChannel {
    fn with_log(log: Log) -> Self {
        Self {
            log,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Emits like a live stream would: nothing once the channel is closed.
    fn emit(&self, job_id: JobId, event: ProgressEvent) {
        let open = self.open.lock().unwrap();
        let (sink, watcher) = open.get(&job_id).expect("channel was opened");
        if !watcher.is_closed() {
            sink.emit(event);
        }
    }

    fn is_closed(&self, job_id: JobId) -> bool {
        let open = self.open.lock().unwrap();
        open.get(&job_id).expect("channel was opened").1.is_closed()
    }
}

#[async_trait::async_trait]
impl ProgressChannel for FakeChannel {
    async fn open(&self, job_id: JobId, sink: Arc<dyn ProgressSink>) -> ChannelHandle {
        self.log.lock().unwrap().push(format!("open {job_id}"));
        let handle = ChannelHandle::new(job_id);
        self.open
            .lock()
            .unwrap()
            .insert(job_id, (sink, handle.watcher()));
        handle
    }
}

/// Submitter whose responses are released by the test.
#[derive(Default)]
struct FakeSubmitter {
    log: Log,
    pending: Mutex<HashMap<JobId, oneshot::Sender<JobOutcome>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeSubmitter {
    fn with_log(log: Log) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    async fn resolve(&self, job_id: JobId, outcome: JobOutcome) {
        for _ in 0..200 {
            if let Some(tx) = self.pending.lock().unwrap().remove(&job_id) {
                let _ = tx.send(outcome);
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no request in flight for job {job_id}");
    }
}

#[async_trait::async_trait]
impl JobSubmitter for FakeSubmitter {
    async fn send(&self, request: &GenerationRequest) -> JobOutcome {
        let job_id = request.job_id();
        self.log.lock().unwrap().push(format!("send {job_id}"));
        self.requests.lock().unwrap().push(request.clone());
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(job_id, tx);
        rx.await.unwrap_or_else(|_| {
            JobOutcome::Error(JobError::new(ErrorKind::Network, NETWORK_FAILURE_MESSAGE))
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<(JobId, u16, usize)>>,
}

impl ResultSink for RecordingSink {
    fn deliver(
        &self,
        job_id: JobId,
        params: &RenderParams,
        artifact: &Artifact,
    ) -> Result<(), SinkError> {
        self.delivered
            .lock()
            .unwrap()
            .push((job_id, params.surah, artifact.len()));
        Ok(())
    }
}

struct Harness {
    log: Log,
    channel: Arc<FakeChannel>,
    submitter: Arc<FakeSubmitter>,
    sink: Arc<RecordingSink>,
    coordinator: JobCoordinator,
}

fn harness() -> Harness {
    let log = Log::default();
    let channel = Arc::new(FakeChannel::with_log(log.clone()));
    let submitter = Arc::new(FakeSubmitter::with_log(log.clone()));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = JobCoordinator::new(channel.clone(), submitter.clone())
        .with_sink(sink.clone());
    Harness {
        log,
        channel,
        submitter,
        sink,
        coordinator,
    }
}

fn params(surah: u16) -> RenderParams {
    RenderParams {
        surah,
        ..RenderParams::default()
    }
}

fn video(bytes: &[u8]) -> JobOutcome {
    JobOutcome::Artifact(Artifact::new(bytes.to_vec(), "video/mp4"))
}

fn progress(percentage: u8, status: &str) -> ProgressEvent {
    ProgressEvent::Progress {
        percentage,
        status_key: Some(status.to_string()),
    }
}

#[tokio::test]
async fn channel_opens_before_request_is_sent() {
    let mut h = harness();
    let job_id = h.coordinator.submit(params(1)).await;

    assert_eq!(h.log.lock().unwrap()[0], format!("open {job_id}"));
    assert_eq!(h.coordinator.open_channel_count(), 1);

    h.submitter.resolve(job_id, video(b"mp4")).await;
    assert_eq!(
        h.log.lock().unwrap().clone(),
        vec![format!("open {job_id}"), format!("send {job_id}")]
    );

    let requests = h.submitter.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].job_id(), job_id);
}

#[tokio::test]
async fn submit_starts_running_at_zero() {
    let mut h = harness();
    let job_id = h.coordinator.submit(params(1)).await;

    let view = h.coordinator.view();
    assert_eq!(view.job_id, Some(job_id));
    assert_eq!(view.percentage(), 0);
    assert_eq!(view.status_key(), Some("status_starting"));
}

#[tokio::test]
async fn progress_then_success_delivers_artifact_once() {
    let mut h = harness();
    let job_id = h.coordinator.submit(params(36)).await;

    h.channel.emit(job_id, progress(30, "rendering"));
    let view = h.coordinator.next_update().await;
    assert!(view.dirty);
    assert_eq!(view.percentage(), 30);
    assert_eq!(view.status_key(), Some("rendering"));

    h.channel.emit(job_id, ProgressEvent::Completed);
    let view = h.coordinator.next_update().await;
    assert_eq!(view.percentage(), 100);
    assert_eq!(view.status_key(), Some(STATUS_COMPLETED));
    assert!(view.state.is_running());

    h.submitter.resolve(job_id, video(b"mp4 bytes")).await;
    let state = h.coordinator.wait_for_outcome().await;
    assert!(matches!(state, JobState::Succeeded { .. }));

    assert!(h.channel.is_closed(job_id));
    assert_eq!(h.coordinator.open_channel_count(), 0);
    assert_eq!(
        h.sink.delivered.lock().unwrap().clone(),
        vec![(job_id, 36, 9)]
    );
    assert_eq!(h.coordinator.delivery(), Some(&DeliveryStatus::Delivered));

    // A new job starts with no delivery recorded.
    h.coordinator.submit(params(37)).await;
    assert_eq!(h.coordinator.delivery(), None);
}

#[tokio::test]
async fn request_error_wins_over_stream_completion() {
    let mut h = harness();
    let job_id = h.coordinator.submit(params(1)).await;

    h.channel.emit(job_id, ProgressEvent::Completed);
    h.coordinator.next_update().await;
    h.submitter
        .resolve(
            job_id,
            JobOutcome::Error(JobError::new(
                ErrorKind::Server { status: 500 },
                "render failed",
            )),
        )
        .await;

    let state = h.coordinator.wait_for_outcome().await;
    match state {
        JobState::Failed { error } => {
            assert_eq!(error.kind, ErrorKind::Server { status: 500 });
            assert_eq!(error.message, "render failed");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(h.channel.is_closed(job_id));
    assert!(h.sink.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stream_failure_is_only_a_notice() {
    let mut h = harness();
    let job_id = h.coordinator.submit(params(1)).await;

    h.channel.emit(
        job_id,
        ProgressEvent::Failed {
            message: "ffmpeg crashed".to_string(),
        },
    );
    let view = h.coordinator.next_update().await;
    assert!(view.state.is_running());
    assert_eq!(h.coordinator.take_notices(), vec!["ffmpeg crashed".to_string()]);
    assert!(h.coordinator.take_notices().is_empty());

    h.submitter.resolve(job_id, video(b"ok")).await;
    let state = h.coordinator.wait_for_outcome().await;
    assert!(matches!(state, JobState::Succeeded { .. }));
}

#[tokio::test]
async fn resubmit_ignores_previous_job() {
    let mut h = harness();
    let job_a = h.coordinator.submit(params(1)).await;
    let job_b = h.coordinator.submit(params(2)).await;
    assert_ne!(job_a, job_b);

    // The old subscription is gone before the new one is opened.
    assert!(h.channel.is_closed(job_a));
    assert_eq!(h.coordinator.open_channel_count(), 1);
    assert_eq!(
        h.log.lock().unwrap()[..2],
        [format!("open {job_a}"), format!("open {job_b}")]
    );

    h.submitter.resolve(job_a, video(b"stale")).await;
    let view = h.coordinator.next_update().await;
    assert_eq!(view.job_id, Some(job_b));
    assert!(view.state.is_running());

    h.submitter
        .resolve(
            job_b,
            JobOutcome::Error(JobError::new(ErrorKind::Server { status: 500 }, "boom")),
        )
        .await;
    let state = h.coordinator.wait_for_outcome().await;
    assert!(matches!(state, JobState::Failed { .. }));
    assert!(h.sink.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reset_drops_interest_in_running_job() {
    let mut h = harness();
    let job_id = h.coordinator.submit(params(1)).await;

    h.coordinator.reset().await;
    assert!(h.channel.is_closed(job_id));
    assert_eq!(h.coordinator.view().state, JobState::Idle);
    assert_eq!(h.coordinator.current_job_id(), None);

    h.submitter.resolve(job_id, video(b"late")).await;
    let view = h.coordinator.next_update().await;
    assert_eq!(view.state, JobState::Idle);
    assert!(h.sink.delivered.lock().unwrap().is_empty());

    // Nothing running, so this returns straight away.
    assert_eq!(h.coordinator.wait_for_outcome().await, JobState::Idle);
}

#[tokio::test]
async fn dropping_coordinator_closes_channel() {
    let h = harness();
    let Harness {
        channel,
        mut coordinator,
        ..
    } = h;
    let job_id = coordinator.submit(params(1)).await;
    assert!(!channel.is_closed(job_id));

    drop(coordinator);
    assert!(channel.is_closed(job_id));
}

fn example_request_params() -> RenderParams {
    RenderParams {
        surah: 1,
        ayah_start: 1,
        ayah_end: 1,
        reciter_id: "ar.alafasy".to_string(),
        platform: Platform::Reel,
        resolution: Resolution::P720,
        background_url: Some("https://example.com/v.mp4".to_string()),
        ..RenderParams::default()
    }
}

async fn mount_progress(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/progress/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            concat!(
                "data: {\"percentage\": 30, \"status\": \"rendering\"}\n\n",
                "data: {\"percentage\": 100}\n\n",
            ),
            "text/event-stream",
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn end_to_end_success_stores_video() {
    let server = MockServer::start().await;
    mount_progress(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate-video"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"fake mp4".to_vec(), "video/mp4"))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let settings = ApiSettings::with_base_url(&server.uri()).unwrap();
    let mut coordinator = JobCoordinator::from_settings(settings)
        .with_sink(Arc::new(FileSink::new(out.path())));

    let job_id = coordinator.submit(example_request_params()).await;
    let state = coordinator.wait_for_outcome().await;
    assert!(matches!(state, JobState::Succeeded { .. }));
    assert_eq!(coordinator.view().percentage(), 100);
    assert_eq!(coordinator.open_channel_count(), 0);

    let stored = std::fs::read(out.path().join("quran_reels_1.mp4")).unwrap();
    assert_eq!(stored, b"fake mp4");
    assert_eq!(coordinator.delivery(), Some(&DeliveryStatus::Delivered));

    let posted = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|request| request.method.as_str() == "POST")
        .expect("generation request");
    let body: serde_json::Value = serde_json::from_slice(&posted.body).unwrap();
    assert_eq!(body["request_id"], json!(job_id.to_string()));
    assert_eq!(body["reciter_id"], json!("ar.alafasy"));
}

#[tokio::test]
async fn end_to_end_server_error_fails_job() {
    let server = MockServer::start().await;
    mount_progress(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate-video"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "render failed"})))
        .mount(&server)
        .await;

    let settings = ApiSettings::with_base_url(&server.uri()).unwrap();
    let mut coordinator = JobCoordinator::from_settings(settings);
    coordinator.submit(example_request_params()).await;

    let view = loop {
        let view = coordinator.next_update().await;
        if !view.state.is_running() {
            break view;
        }
    };
    assert_eq!(view.error_message(), Some("render failed"));
    assert_eq!(view.percentage(), 0);
    assert_eq!(coordinator.open_channel_count(), 0);
}

#[tokio::test]
async fn unavailable_progress_stream_does_not_block_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/progress/.+$"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate-video"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"mp4".to_vec(), "video/mp4"))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ApiSettings::with_base_url(&server.uri()).unwrap();
    let mut coordinator = JobCoordinator::from_settings(settings);
    coordinator.submit(params(1)).await;
    let state = coordinator.wait_for_outcome().await;
    assert!(matches!(state, JobState::Succeeded { .. }));
}

#[tokio::test]
async fn failed_delivery_is_reported_despite_leftover_file() {
    let server = MockServer::start().await;
    mount_progress(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate-video"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "video/mp4"))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let leftover = out.path().join("quran_reels_1.mp4");
    std::fs::write(&leftover, b"previous run").unwrap();

    let settings = ApiSettings::with_base_url(&server.uri()).unwrap();
    let mut coordinator = JobCoordinator::from_settings(settings)
        .with_sink(Arc::new(FileSink::new(out.path())));
    coordinator.submit(example_request_params()).await;

    let state = coordinator.wait_for_outcome().await;
    assert!(matches!(state, JobState::Succeeded { .. }));
    assert!(matches!(
        coordinator.delivery(),
        Some(DeliveryStatus::Failed(reason)) if reason.contains("empty artifact")
    ));
    assert_eq!(coordinator.take_notices().len(), 1);
    assert_eq!(std::fs::read(&leftover).unwrap(), b"previous run");
}

#[tokio::test]
async fn no_sink_means_no_delivery() {
    let log = Log::default();
    let channel = Arc::new(FakeChannel::with_log(log.clone()));
    let submitter = Arc::new(FakeSubmitter::with_log(log));
    let mut coordinator = JobCoordinator::new(channel, submitter.clone());

    let job_id = coordinator.submit(params(1)).await;
    submitter.resolve(job_id, video(b"mp4")).await;

    let state = coordinator.wait_for_outcome().await;
    assert!(matches!(state, JobState::Succeeded { .. }));
    assert_eq!(coordinator.delivery(), None);
}
