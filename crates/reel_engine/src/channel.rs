use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use reel_core::{JobId, ProgressEvent};
use reel_logging::{reel_debug, reel_info, reel_trace, reel_warn};
use reqwest::header::ACCEPT;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::progress::parse_progress_message;
use crate::settings::ApiSettings;
use crate::sse::SseDecoder;

/// Receives decoded progress events, in arrival order, while the channel is open.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

#[async_trait::async_trait]
pub trait ProgressChannel: Send + Sync {
    /// Subscribe to progress for `job_id`. Returns once the subscription is
    /// live, or has definitively failed; connection failures are logged and
    /// produce an already-closed handle rather than an error.
    async fn open(&self, job_id: JobId, sink: Arc<dyn ProgressSink>) -> ChannelHandle;
}

/// Why the progress stream could not be used. Only ever logged.
#[derive(Debug, Error)]
pub enum StreamTransportError {
    #[error("invalid progress url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("progress stream connection failed: {0}")]
    Connect(#[from] reqwest::Error),
    #[error("progress stream did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("progress stream returned http status {0}")]
    HttpStatus(u16),
}

#[derive(Debug)]
struct ChannelState {
    job_id: JobId,
    token: CancellationToken,
    closed: AtomicBool,
}

impl ChannelState {
    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }
}

/// Owner's side of an open progress subscription. Closing is idempotent,
/// and dropping the handle closes it.
#[derive(Debug)]
pub struct ChannelHandle {
    state: Arc<ChannelState>,
}

impl ChannelHandle {
    pub fn new(job_id: JobId) -> Self {
        Self {
            state: Arc::new(ChannelState {
                job_id,
                token: CancellationToken::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// A handle for a subscription that never came up.
    pub fn closed(job_id: JobId) -> Self {
        let handle = Self::new(job_id);
        handle.state.close();
        handle
    }

    pub fn job_id(&self) -> JobId {
        self.state.job_id
    }

    /// Returns `true` only for the call that actually closed the channel.
    pub fn close(&self) -> bool {
        let closed_now = self.state.close();
        if closed_now {
            reel_debug!("Closed progress channel for job {}", self.state.job_id);
        }
        closed_now
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// The reader side, for whatever task pumps events into the sink.
    pub fn watcher(&self) -> ChannelWatcher {
        ChannelWatcher {
            state: self.state.clone(),
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reader's side of a subscription: observes closure and may close the
/// channel itself once the stream is finished.
#[derive(Debug, Clone)]
pub struct ChannelWatcher {
    state: Arc<ChannelState>,
}

impl ChannelWatcher {
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    pub async fn cancelled(&self) {
        self.state.token.cancelled().await;
    }

    pub fn close(&self) -> bool {
        self.state.close()
    }
}

/// Server-sent-events subscription to `GET /api/v1/progress/{job_id}`.
#[derive(Debug, Clone)]
pub struct SseProgressChannel {
    settings: ApiSettings,
}

impl SseProgressChannel {
    pub fn new(settings: ApiSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, StreamTransportError> {
        // No overall timeout: the stream lives as long as the render.
        Ok(reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .user_agent(self.settings.user_agent.clone())
            .build()?)
    }

    async fn connect(&self, job_id: JobId) -> Result<reqwest::Response, StreamTransportError> {
        let url = self.settings.progress_url(job_id)?;
        let client = self.build_client()?;
        let request = client.get(url).header(ACCEPT, "text/event-stream").send();

        let wait = self.settings.progress_connect_timeout;
        let response = tokio::time::timeout(wait, request)
            .await
            .map_err(|_| StreamTransportError::Timeout(wait))??;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamTransportError::HttpStatus(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ProgressChannel for SseProgressChannel {
    async fn open(&self, job_id: JobId, sink: Arc<dyn ProgressSink>) -> ChannelHandle {
        match self.connect(job_id).await {
            Ok(response) => {
                reel_info!("Progress channel open for job {}", job_id);
                let handle = ChannelHandle::new(job_id);
                tokio::spawn(pump_events(job_id, response, handle.watcher(), sink));
                handle
            }
            Err(err) => {
                reel_warn!("Progress for job {} unavailable: {}", job_id, err);
                ChannelHandle::closed(job_id)
            }
        }
    }
}

async fn pump_events(
    job_id: JobId,
    response: reqwest::Response,
    watcher: ChannelWatcher,
    sink: Arc<dyn ProgressSink>,
) {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            _ = watcher.cancelled() => return,
            chunk = stream.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                reel_warn!(
                    "Progress stream for job {} dropped: {}",
                    job_id,
                    StreamTransportError::from(err)
                );
                return;
            }
            None => {
                reel_debug!("Progress stream for job {} ended", job_id);
                return;
            }
        };

        for data in decoder.feed(&bytes) {
            if watcher.is_closed() {
                return;
            }
            match parse_progress_message(&data) {
                Ok(Some(event)) => {
                    let terminal = event.is_terminal();
                    sink.emit(event);
                    if terminal {
                        watcher.close();
                        reel_debug!("Progress stream for job {} finished", job_id);
                        return;
                    }
                }
                Ok(None) => reel_trace!("Ignoring empty progress message for job {}", job_id),
                Err(err) => reel_warn!("Skipping progress message for job {}: {}", job_id, err),
            }
        }
    }
}
