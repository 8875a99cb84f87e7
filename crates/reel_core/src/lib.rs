//! Reel core: pure job-coordination state machine and view-model helpers.
mod effect;
mod msg;
mod outcome;
mod request;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use outcome::{Artifact, ErrorKind, JobError, JobOutcome, ProgressEvent};
pub use request::{
    GenerationRequest, Platform, RenderParams, Resolution, DEFAULT_TRANSLATION_ID,
};
pub use state::{CoordinatorState, JobId, JobState, STATUS_COMPLETED, STATUS_STARTING};
pub use update::update;
pub use view_model::JobView;
