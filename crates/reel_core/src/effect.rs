use crate::{Artifact, GenerationRequest, JobId};

/// Side effects requested by `update`, to be executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Subscribe to the job's progress stream. Must be initiated before the
    /// matching `SendRequest` is issued.
    OpenChannel { job_id: JobId },
    SendRequest { request: GenerationRequest },
    /// Release the job's progress stream. Safe to repeat.
    CloseChannel { job_id: JobId },
    DeliverArtifact { job_id: JobId, artifact: Artifact },
    /// Non-fatal message for the user; does not end the job.
    ShowNotice { job_id: JobId, message: String },
}
