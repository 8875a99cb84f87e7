use reel_core::ProgressEvent;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamParseError {
    #[error("malformed progress message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Wire shape of a progress message. Every field is optional; the
/// combination present decides the event.
#[derive(Debug, Default, Deserialize)]
struct ProgressPayload {
    percentage: Option<f64>,
    status: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Decode one `data` payload from the progress stream.
///
/// `Ok(None)` means the message was well formed but carried nothing we act
/// on (a heartbeat, for instance).
pub fn parse_progress_message(data: &str) -> Result<Option<ProgressEvent>, StreamParseError> {
    let payload: ProgressPayload = serde_json::from_str(data)?;

    let percentage = payload.percentage.map(clamp_percentage);
    if payload.status.as_deref() == Some("completed") || percentage == Some(100) {
        return Ok(Some(ProgressEvent::Completed));
    }
    if let Some(percentage) = percentage {
        return Ok(Some(ProgressEvent::Progress {
            percentage,
            status_key: payload.message.or(payload.status),
        }));
    }
    if let Some(message) = payload.error {
        return Ok(Some(ProgressEvent::Failed { message }));
    }
    Ok(None)
}

fn clamp_percentage(value: f64) -> u8 {
    // Truncate so 99.6 still reads as in progress.
    value.floor().clamp(0.0, 100.0) as u8
}
