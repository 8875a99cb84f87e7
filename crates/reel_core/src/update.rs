use reel_logging::{reel_debug, reel_info};

use crate::{CoordinatorState, Effect, JobOutcome, JobState, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: CoordinatorState, msg: Msg) -> (CoordinatorState, Vec<Effect>) {
    let effects = match msg {
        Msg::Submit(params) => {
            let (request, stale_channel) = state.begin_job(params);
            let job_id = request.job_id();
            reel_info!("Submitting job {}", job_id);

            let mut effects = Vec::with_capacity(3);
            if let Some(stale) = stale_channel {
                effects.push(Effect::CloseChannel { job_id: stale });
            }
            // The listener goes first so early progress is not lost.
            effects.push(Effect::OpenChannel { job_id });
            effects.push(Effect::SendRequest { request });
            effects
        }
        Msg::ChannelEvent { job_id, event } => {
            if !state.is_current_running(job_id) {
                reel_debug!("Discarding progress event for stale job {}", job_id);
                return (state, Vec::new());
            }
            match state.apply_event(event) {
                Some(message) => vec![Effect::ShowNotice { job_id, message }],
                None => Vec::new(),
            }
        }
        Msg::SubmitterResolved { job_id, outcome } => {
            if !state.is_current_running(job_id) {
                reel_debug!("Discarding result for stale job {}", job_id);
                return (state, Vec::new());
            }

            let (next, delivery) = match outcome {
                JobOutcome::Artifact(artifact) => {
                    reel_info!("Job {} succeeded ({} bytes)", job_id, artifact.len());
                    let delivery = Effect::DeliverArtifact {
                        job_id,
                        artifact: artifact.clone(),
                    };
                    (JobState::Succeeded { artifact }, Some(delivery))
                }
                JobOutcome::Error(error) => {
                    reel_info!("Job {} failed: {}", job_id, error);
                    (JobState::Failed { error }, None)
                }
            };

            let mut effects = Vec::with_capacity(2);
            if let Some(channel) = state.finish_job(next) {
                effects.push(Effect::CloseChannel { job_id: channel });
            }
            effects.extend(delivery);
            effects
        }
        Msg::Reset => match state.reset() {
            Some(job_id) => vec![Effect::CloseChannel { job_id }],
            None => Vec::new(),
        },
    };

    (state, effects)
}
