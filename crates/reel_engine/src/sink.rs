use std::path::PathBuf;

use reel_core::{Artifact, JobId, RenderParams};
use reel_logging::reel_info;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to store artifact: {0}")]
    Persist(#[from] PersistError),
    #[error("artifact rejected: {0}")]
    Rejected(String),
}

/// Final consumer of a successful job's media.
pub trait ResultSink: Send + Sync {
    fn deliver(
        &self,
        job_id: JobId,
        params: &RenderParams,
        artifact: &Artifact,
    ) -> Result<(), SinkError>;
}

/// Writes each artifact as `quran_reels_{surah}.{ext}` into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn file_name(params: &RenderParams, artifact: &Artifact) -> String {
        format!(
            "quran_reels_{}.{}",
            params.surah,
            extension_for_mime(&artifact.mime_type)
        )
    }

    /// Where `deliver` puts the artifact for these parameters.
    pub fn target_path(&self, params: &RenderParams, artifact: &Artifact) -> PathBuf {
        self.output_dir.join(Self::file_name(params, artifact))
    }
}

impl ResultSink for FileSink {
    fn deliver(
        &self,
        job_id: JobId,
        params: &RenderParams,
        artifact: &Artifact,
    ) -> Result<(), SinkError> {
        if artifact.is_empty() {
            return Err(SinkError::Rejected("empty artifact".to_string()));
        }
        let writer = AtomicFileWriter::new(self.output_dir.clone());
        let path = writer.write(&Self::file_name(params, artifact), &artifact.bytes)?;
        reel_info!(
            "Stored artifact for job {} at {} ({} bytes)",
            job_id,
            path.display(),
            artifact.len()
        );
        Ok(())
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "image/gif" => "gif",
        _ => "mp4",
    }
}
