use crate::{JobId, JobState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobView {
    pub job_id: Option<JobId>,
    pub state: JobState,
    pub notice: Option<String>,
    pub dirty: bool,
}

impl JobView {
    /// Percentage to draw on a progress bar.
    pub fn percentage(&self) -> u8 {
        self.state.percentage()
    }

    pub fn status_key(&self) -> Option<&str> {
        match &self.state {
            JobState::Running { status_key, .. } => status_key.as_deref(),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error } => Some(&error.message),
            _ => None,
        }
    }
}
