use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reel_engine::{ApiSettings, DEFAULT_API_URL};
use reel_logging::reel_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "reelgen.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("invalid api url {url:?}: {source}")]
    ApiUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Contents of `reelgen.ron`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub output_dir: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub progress_connect_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            output_dir: PathBuf::from("output"),
            connect_timeout_secs: api.connect_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.as_secs(),
            progress_connect_timeout_secs: api.progress_connect_timeout.as_secs(),
        }
    }
}

impl AppConfig {
    /// Reads `path`, or `./reelgen.ron` when no path is given. A missing
    /// default file means defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILENAME), false),
        };

        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        reel_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Engine settings, with `api_url_override` (flag or environment) taking
    /// precedence over the file.
    pub fn api_settings(&self, api_url_override: Option<&str>) -> Result<ApiSettings, ConfigError> {
        let url = api_url_override.unwrap_or(&self.api_url);
        let mut settings = ApiSettings::with_base_url(url).map_err(|source| ConfigError::ApiUrl {
            url: url.to_string(),
            source,
        })?;
        settings.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        settings.request_timeout = Duration::from_secs(self.request_timeout_secs);
        settings.progress_connect_timeout = Duration::from_secs(self.progress_connect_timeout_secs);
        Ok(settings)
    }
}
