use reel_core::{Artifact, ErrorKind, GenerationRequest, JobError, JobOutcome};
use reel_logging::{reel_error, reel_info, reel_warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::settings::ApiSettings;

pub const DEFAULT_ARTIFACT_MIME: &str = "video/mp4";

pub const GENERIC_FAILURE_MESSAGE: &str = "Video generation failed";
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";
pub const TIMEOUT_FAILURE_MESSAGE: &str =
    "Video generation is taking longer than expected. Please try with a shorter Ayah range.";

#[async_trait::async_trait]
pub trait JobSubmitter: Send + Sync {
    /// One request/response exchange. Every failure comes back as
    /// `JobOutcome::Error`; this never panics or returns early.
    async fn send(&self, request: &GenerationRequest) -> JobOutcome;
}

/// JSON body of `POST /api/v1/generate-video`.
#[derive(Debug, Serialize)]
struct GenerationPayload<'a> {
    surah: u16,
    ayah_start: u16,
    ayah_end: u16,
    reciter_id: &'a str,
    translation_id: &'a str,
    platform: &'static str,
    resolution: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    background_url: Option<&'a str>,
    request_id: String,
}

impl<'a> From<&'a GenerationRequest> for GenerationPayload<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        let params = request.params();
        Self {
            surah: params.surah,
            ayah_start: params.ayah_start,
            ayah_end: params.ayah_end,
            reciter_id: &params.reciter_id,
            translation_id: &params.translation_id,
            platform: params.platform.as_str(),
            resolution: params.resolution.height(),
            background_url: params.background_url.as_deref(),
            request_id: request.job_id().to_string(),
        }
    }
}

/// Error body the backend sends with a failure status. Revisions differ on
/// the field name.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestSubmitter {
    settings: ApiSettings,
}

impl ReqwestSubmitter {
    pub fn new(settings: ApiSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, JobError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .user_agent(self.settings.user_agent.clone())
            .build()
            .map_err(map_reqwest_error)
    }

    async fn exchange(&self, request: &GenerationRequest) -> Result<Artifact, JobError> {
        let url = self.settings.generate_url().map_err(|err| {
            reel_error!("Cannot build generation url: {}", err);
            JobError::new(ErrorKind::Network, NETWORK_FAILURE_MESSAGE)
        })?;
        let body = serde_json::to_vec(&GenerationPayload::from(request)).map_err(|err| {
            reel_error!("Cannot encode generation request: {}", err);
            JobError::new(ErrorKind::Network, GENERIC_FAILURE_MESSAGE)
        })?;
        let client = self.build_client()?;

        let response = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "video/*, application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            // The body is only a hint; an unreadable one still yields a server error.
            let text = response.text().await.unwrap_or_default();
            return Err(JobError::new(
                ErrorKind::Server {
                    status: status.as_u16(),
                },
                server_message(&text),
            ));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .unwrap_or_else(|| DEFAULT_ARTIFACT_MIME.to_string());
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(Artifact::new(bytes, mime_type))
    }
}

#[async_trait::async_trait]
impl JobSubmitter for ReqwestSubmitter {
    async fn send(&self, request: &GenerationRequest) -> JobOutcome {
        let job_id = request.job_id();
        reel_info!("Sending generation request for job {}", job_id);

        let result = self.exchange(request).await;
        if let Err(err) = &result {
            reel_warn!("Generation request for job {} failed: {}", job_id, err);
        }
        JobOutcome::from(result)
    }
}

/// Pulls the user-facing message out of an error body. Blank fields count as
/// missing; with no usable field the generic message is used.
fn server_message(body: &str) -> String {
    let Ok(body) = serde_json::from_str::<ErrorBody>(body) else {
        return GENERIC_FAILURE_MESSAGE.to_string();
    };
    body.error
        .filter(|message| !message.trim().is_empty())
        .or(body.detail.filter(|message| !message.trim().is_empty()))
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> JobError {
    reel_warn!("Generation transport error: {}", err);
    if err.is_timeout() {
        return JobError::new(ErrorKind::Network, TIMEOUT_FAILURE_MESSAGE);
    }
    JobError::new(ErrorKind::Network, NETWORK_FAILURE_MESSAGE)
}
