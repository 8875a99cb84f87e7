use std::fmt;

use bytes::Bytes;

/// One decoded message from the progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Intermediate progress. `status_key` is a translation key or a
    /// human-readable status, whichever the backend sent.
    Progress {
        percentage: u8,
        status_key: Option<String>,
    },
    Completed,
    Failed { message: String },
}

impl ProgressEvent {
    /// Whether the backend sends nothing further after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Completed | ProgressEvent::Failed { .. })
    }
}

/// Rendered media returned by the generation endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl Artifact {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Videos run to megabytes; keep them out of debug output.
impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response reached us: connect failure, timeout, truncated body.
    Network,
    /// The backend answered with a failure status.
    Server { status: u16 },
    /// Rejected before submission. The submitter never produces this.
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Server { status } => write!(f, "server error {status}"),
            ErrorKind::Validation => write!(f, "validation error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Terminal result of the generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Artifact(Artifact),
    Error(JobError),
}

impl From<Result<Artifact, JobError>> for JobOutcome {
    fn from(result: Result<Artifact, JobError>) -> Self {
        match result {
            Ok(artifact) => JobOutcome::Artifact(artifact),
            Err(error) => JobOutcome::Error(error),
        }
    }
}
