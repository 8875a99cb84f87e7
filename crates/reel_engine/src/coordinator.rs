use std::collections::HashMap;
use std::sync::Arc;

use reel_core::{
    update, CoordinatorState, Effect, JobId, JobState, JobView, Msg, ProgressEvent, RenderParams,
};
use reel_logging::{reel_debug, reel_error, reel_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::{ChannelHandle, ProgressChannel, ProgressSink, SseProgressChannel};
use crate::settings::ApiSettings;
use crate::sink::ResultSink;
use crate::submit::{JobSubmitter, ReqwestSubmitter};

/// What happened to the current job's artifact once it reached the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

/// Feeds one job's stream events back into the coordinator's inbox.
struct ForwardingSink {
    job_id: JobId,
    tx: mpsc::UnboundedSender<Msg>,
}

impl ProgressSink for ForwardingSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(Msg::ChannelEvent {
            job_id: self.job_id,
            event,
        });
    }
}

/// Runs one logical submission at a time: owns the coordinator state, the
/// progress subscriptions and the in-flight requests, and executes the
/// effects `update` asks for.
///
/// Everything happens on the task that calls into the coordinator; channel
/// events and request results come back through an inbox and are applied
/// one at a time by [`JobCoordinator::next_update`].
pub struct JobCoordinator {
    state: CoordinatorState,
    channel: Arc<dyn ProgressChannel>,
    submitter: Arc<dyn JobSubmitter>,
    sink: Option<Arc<dyn ResultSink>>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    msg_rx: mpsc::UnboundedReceiver<Msg>,
    channels: HashMap<JobId, ChannelHandle>,
    requests: HashMap<JobId, JoinHandle<()>>,
    notices: Vec<String>,
    delivery: Option<DeliveryStatus>,
}

impl JobCoordinator {
    pub fn new(channel: Arc<dyn ProgressChannel>, submitter: Arc<dyn JobSubmitter>) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        Self {
            state: CoordinatorState::new(),
            channel,
            submitter,
            sink: None,
            msg_tx,
            msg_rx,
            channels: HashMap::new(),
            requests: HashMap::new(),
            notices: Vec::new(),
            delivery: None,
        }
    }

    /// Coordinator talking to a real backend over HTTP.
    pub fn from_settings(settings: ApiSettings) -> Self {
        Self::new(
            Arc::new(SseProgressChannel::new(settings.clone())),
            Arc::new(ReqwestSubmitter::new(settings)),
        )
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Starts a new job, abandoning interest in any previous one. The
    /// progress channel is open (or has failed to open) before the
    /// generation request goes out.
    pub async fn submit(&mut self, params: RenderParams) -> JobId {
        self.delivery = None;
        self.dispatch(Msg::Submit(params)).await;
        self.state
            .current_job_id()
            .expect("submit always installs a current job")
    }

    /// Waits for the next channel event or request result and applies it.
    /// The returned view has `dirty` set when anything visible changed.
    ///
    /// Only call this while a job is running; otherwise nothing will arrive.
    pub async fn next_update(&mut self) -> JobView {
        // We hold a sender ourselves, so the inbox never closes.
        if let Some(msg) = self.msg_rx.recv().await {
            if let Msg::SubmitterResolved { job_id, .. } = &msg {
                self.requests.remove(job_id);
            }
            self.dispatch(msg).await;
        }
        let view = self.state.view();
        self.state.consume_dirty();
        view
    }

    /// Drives the current job until the generation request settles.
    /// Returns immediately when no job is running.
    pub async fn wait_for_outcome(&mut self) -> JobState {
        while self.state.job().is_running() {
            self.next_update().await;
        }
        self.state.job().clone()
    }

    /// Drops interest in the current job (teardown, navigating away).
    pub async fn reset(&mut self) {
        self.delivery = None;
        self.dispatch(Msg::Reset).await;
    }

    pub fn view(&self) -> JobView {
        self.state.view()
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        self.state.current_job_id()
    }

    /// Outcome of handing the current job's artifact to the sink. `None`
    /// until a successful job has been delivered, or when no sink is set.
    pub fn delivery(&self) -> Option<&DeliveryStatus> {
        self.delivery.as_ref()
    }

    /// Non-fatal messages surfaced since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Number of progress subscriptions still held.
    pub fn open_channel_count(&self) -> usize {
        self.channels
            .values()
            .filter(|handle| !handle.is_closed())
            .count()
    }

    async fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in effects {
            self.run_effect(effect).await;
        }
    }

    async fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::OpenChannel { job_id } => {
                let sink = Arc::new(ForwardingSink {
                    job_id,
                    tx: self.msg_tx.clone(),
                });
                let handle = self.channel.open(job_id, sink).await;
                self.channels.insert(job_id, handle);
            }
            Effect::SendRequest { request } => {
                let job_id = request.job_id();
                let submitter = self.submitter.clone();
                let tx = self.msg_tx.clone();
                let task = tokio::spawn(async move {
                    let outcome = submitter.send(&request).await;
                    let _ = tx.send(Msg::SubmitterResolved { job_id, outcome });
                });
                self.requests.insert(job_id, task);
            }
            Effect::CloseChannel { job_id } => match self.channels.remove(&job_id) {
                Some(handle) => {
                    handle.close();
                }
                None => reel_debug!("No progress channel held for job {}", job_id),
            },
            Effect::DeliverArtifact { job_id, artifact } => {
                let (Some(sink), Some(params)) = (&self.sink, self.state.current_params()) else {
                    return;
                };
                let status = match sink.deliver(job_id, params, &artifact) {
                    Ok(()) => DeliveryStatus::Delivered,
                    Err(err) => {
                        reel_error!("Delivering artifact for job {} failed: {}", job_id, err);
                        self.notices.push(err.to_string());
                        DeliveryStatus::Failed(err.to_string())
                    }
                };
                self.delivery = Some(status);
            }
            Effect::ShowNotice { job_id, message } => {
                reel_warn!("Job {} reported: {}", job_id, message);
                self.notices.push(message);
            }
        }
    }
}

impl Drop for JobCoordinator {
    fn drop(&mut self) {
        // Channel handles close themselves on drop; requests need aborting.
        for (_, task) in self.requests.drain() {
            task.abort();
        }
    }
}
