use std::fmt;

use crate::JobId;

/// Translation rendered under the recitation unless the caller picks another.
pub const DEFAULT_TRANSLATION_ID: &str = "en.sahih";

/// Target platform; decides the aspect ratio of the rendered video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Vertical 9:16 short-form video.
    #[default]
    Reel,
    /// Horizontal 16:9 video.
    Youtube,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Reel => "reel",
            Platform::Youtube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    P360,
    P480,
    #[default]
    P720,
    P1080,
}

impl Resolution {
    pub fn height(self) -> u16 {
        match self {
            Resolution::P360 => 360,
            Resolution::P480 => 480,
            Resolution::P720 => 720,
            Resolution::P1080 => 1080,
        }
    }

    pub fn from_height(height: u16) -> Option<Self> {
        match height {
            360 => Some(Resolution::P360),
            480 => Some(Resolution::P480),
            720 => Some(Resolution::P720),
            1080 => Some(Resolution::P1080),
            _ => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

/// Rendering parameters chosen by the user, before a job id is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderParams {
    pub surah: u16,
    pub ayah_start: u16,
    pub ayah_end: u16,
    pub reciter_id: String,
    pub translation_id: String,
    pub platform: Platform,
    pub resolution: Resolution,
    pub background_url: Option<String>,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            surah: 1,
            ayah_start: 1,
            ayah_end: 1,
            reciter_id: "ar.alafasy".to_string(),
            translation_id: DEFAULT_TRANSLATION_ID.to_string(),
            platform: Platform::Reel,
            resolution: Resolution::P720,
            background_url: None,
        }
    }
}

/// One submission: the parameters plus the id correlating request and
/// progress stream. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    job_id: JobId,
    params: RenderParams,
}

impl GenerationRequest {
    pub fn new(job_id: JobId, params: RenderParams) -> Self {
        Self { job_id, params }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }
}
