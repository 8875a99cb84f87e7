use std::time::Duration;

use reel_core::JobId;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

const GENERATE_PATH: &str = "api/v1/generate-video";
const PROGRESS_PATH: &str = "api/v1/progress/";
const BACKGROUNDS_PATH: &str = "api/v1/backgrounds";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    /// Upper bound for the whole generation exchange, rendering included.
    pub request_timeout: Duration,
    /// How long `open` waits for the progress stream to answer before giving
    /// up on it and letting the request go ahead anyway.
    pub progress_connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default api url"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(600),
            progress_connect_timeout: Duration::from_secs(10),
            user_agent: concat!("reelgen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiSettings {
    pub fn with_base_url(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            ..Self::default()
        })
    }

    pub fn generate_url(&self) -> Result<Url, url::ParseError> {
        self.endpoint(GENERATE_PATH)
    }

    pub fn progress_url(&self, job_id: JobId) -> Result<Url, url::ParseError> {
        self.endpoint(&format!("{PROGRESS_PATH}{job_id}"))
    }

    pub fn backgrounds_url(&self) -> Result<Url, url::ParseError> {
        self.endpoint(BACKGROUNDS_PATH)
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        // Keep any path prefix on the base, e.g. a reverse-proxy mount point.
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
    }
}
