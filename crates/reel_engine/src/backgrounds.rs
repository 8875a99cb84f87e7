use reel_logging::{reel_info, reel_warn};
use serde::Deserialize;
use thiserror::Error;

use crate::settings::ApiSettings;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackgroundVideo {
    pub id: u64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub user: Option<BackgroundAuthor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackgroundAuthor {
    pub name: String,
}

impl BackgroundVideo {
    /// URL the renderer downloads the clip from; this is what goes into
    /// `RenderParams::background_url`.
    pub fn download_url(&self) -> String {
        format!("https://www.pexels.com/download/video/{}/", self.id)
    }

    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.name.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct BackgroundListing {
    #[serde(default)]
    videos: Vec<BackgroundVideo>,
}

#[derive(Debug, Error)]
enum CatalogError {
    #[error("invalid backgrounds url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("http status {0}")]
    Status(u16),
    #[error("invalid listing: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client for `GET /api/v1/backgrounds`.
#[derive(Debug, Clone)]
pub struct BackgroundCatalog {
    settings: ApiSettings,
}

impl BackgroundCatalog {
    pub fn new(settings: ApiSettings) -> Self {
        Self { settings }
    }

    /// Available background clips. Any failure means "none available" and is
    /// only logged.
    pub async fn list(&self) -> Vec<BackgroundVideo> {
        match self.fetch().await {
            Ok(videos) => {
                reel_info!("Loaded {} background videos", videos.len());
                videos
            }
            Err(err) => {
                reel_warn!("Failed to fetch backgrounds: {}", err);
                Vec::new()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<BackgroundVideo>, CatalogError> {
        let url = self.settings.backgrounds_url()?;
        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.connect_timeout * 3)
            .user_agent(self.settings.user_agent.clone())
            .build()?;

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let listing: BackgroundListing = serde_json::from_slice(&body)?;
        Ok(listing.videos)
    }
}
