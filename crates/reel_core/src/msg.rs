use crate::{JobId, JobOutcome, ProgressEvent, RenderParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted the form. Replaces any job still in flight.
    Submit(RenderParams),
    /// Progress stream delivered an event for a job.
    ChannelEvent { job_id: JobId, event: ProgressEvent },
    /// Generation request settled for a job.
    SubmitterResolved { job_id: JobId, outcome: JobOutcome },
    /// Teardown or navigation away: drop interest in the current job.
    Reset,
}
