use std::fmt;

use reel_logging::reel_debug;
use uuid::Uuid;

use crate::view_model::JobView;
use crate::{Artifact, GenerationRequest, JobError, ProgressEvent, RenderParams};

/// Status shown between submit and the first progress event.
pub const STATUS_STARTING: &str = "status_starting";
/// Status shown once the stream reports completion.
pub const STATUS_COMPLETED: &str = "status_completed";

/// Correlation key shared by the generation request and its progress stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(Uuid);

impl JobId {
    /// A fresh random id. Never returns an id handed out before.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    /// Request in flight. `percentage` never decreases within one job.
    Running {
        percentage: u8,
        status_key: Option<String>,
    },
    Succeeded {
        artifact: Artifact,
    },
    Failed {
        error: JobError,
    },
}

impl JobState {
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Failed { .. })
    }

    pub fn percentage(&self) -> u8 {
        match self {
            JobState::Idle | JobState::Failed { .. } => 0,
            JobState::Running { percentage, .. } => *percentage,
            JobState::Succeeded { .. } => 100,
        }
    }
}

/// Coordinator-local state. The current job id is the only field that
/// decides whether late events and results still apply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinatorState {
    current: Option<CurrentJob>,
    job: JobState,
    open_channel: Option<JobId>,
    notice: Option<String>,
    dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CurrentJob {
    id: JobId,
    params: RenderParams,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.current_job_id(),
            state: self.job.clone(),
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        self.current.as_ref().map(|job| job.id)
    }

    pub fn current_params(&self) -> Option<&RenderParams> {
        self.current.as_ref().map(|job| &job.params)
    }

    pub fn job(&self) -> &JobState {
        &self.job
    }

    pub fn open_channel(&self) -> Option<JobId> {
        self.open_channel
    }

    /// Returns whether the state changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_current_running(&self, job_id: JobId) -> bool {
        self.current_job_id() == Some(job_id) && self.job.is_running()
    }

    /// Replaces any previous job. Returns the new request and the channel
    /// that must be closed first, if one was still open.
    pub(crate) fn begin_job(
        &mut self,
        params: RenderParams,
    ) -> (GenerationRequest, Option<JobId>) {
        let stale_channel = self.open_channel.take();
        let job_id = JobId::generate();
        let request = GenerationRequest::new(job_id, params.clone());

        self.current = Some(CurrentJob { id: job_id, params });
        self.job = JobState::Running {
            percentage: 0,
            status_key: Some(STATUS_STARTING.to_string()),
        };
        self.open_channel = Some(job_id);
        self.notice = None;
        self.mark_dirty();

        (request, stale_channel)
    }

    /// Applies one stream event to the running job. Returns the notice to
    /// surface, if the event carried one.
    pub(crate) fn apply_event(&mut self, event: ProgressEvent) -> Option<String> {
        let JobState::Running {
            percentage,
            status_key,
        } = &mut self.job
        else {
            return None;
        };

        match event {
            ProgressEvent::Progress {
                percentage: received,
                status_key: received_status,
            } => {
                if received < *percentage {
                    reel_debug!(
                        "Ignoring progress regression {} -> {} for current job",
                        percentage,
                        received
                    );
                } else {
                    *percentage = received;
                }
                if let Some(status) = received_status {
                    *status_key = Some(status);
                }
                self.mark_dirty();
                None
            }
            ProgressEvent::Completed => {
                *percentage = 100;
                *status_key = Some(STATUS_COMPLETED.to_string());
                self.mark_dirty();
                None
            }
            ProgressEvent::Failed { message } => {
                self.notice = Some(message.clone());
                self.mark_dirty();
                Some(message)
            }
        }
    }

    /// Settles the current job. Returns the channel to close.
    pub(crate) fn finish_job(&mut self, job: JobState) -> Option<JobId> {
        self.job = job;
        self.mark_dirty();
        self.open_channel.take()
    }

    /// Forgets the current job entirely. Returns the channel to close.
    pub(crate) fn reset(&mut self) -> Option<JobId> {
        let open = self.open_channel.take();
        if self.current.is_some() || self.job != JobState::Idle || self.notice.is_some() {
            self.mark_dirty();
        }
        self.current = None;
        self.job = JobState::Idle;
        self.notice = None;
        open
    }
}
