use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reel_core::{Platform, RenderParams, Resolution, DEFAULT_TRANSLATION_ID};

/// Generate Quran recitation videos on a remote renderer.
#[derive(Parser, Debug)]
#[command(name = "reelgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (RON). Defaults to ./reelgen.ron when present.
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "REELGEN_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Also write logs to a file (./reelgen.log when no path is given)
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = reel_logging::DEFAULT_LOG_FILE
    )]
    pub log_file: Option<PathBuf>,

    /// Log debug output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a video and save it locally
    Generate(GenerateArgs),
    /// List background clips offered by the backend
    Backgrounds,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(long)]
    pub surah: u16,

    #[arg(long)]
    pub ayah_start: u16,

    /// Last ayah (inclusive). Defaults to the start ayah.
    #[arg(long)]
    pub ayah_end: Option<u16>,

    #[arg(long, default_value = "ar.alafasy")]
    pub reciter: String,

    #[arg(long, default_value = DEFAULT_TRANSLATION_ID)]
    pub translation: String,

    #[arg(long, value_enum, default_value_t = PlatformArg::Reel)]
    pub platform: PlatformArg,

    /// Output height: 360, 480, 720 or 1080
    #[arg(long, default_value_t = 720, value_parser = parse_resolution)]
    pub resolution: u16,

    /// Background clip URL (see `reelgen backgrounds`)
    #[arg(long)]
    pub background_url: Option<String>,

    /// Where to save the video. Overrides the configured directory.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformArg {
    Reel,
    Youtube,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Reel => Platform::Reel,
            PlatformArg::Youtube => Platform::Youtube,
        }
    }
}

fn parse_resolution(value: &str) -> Result<u16, String> {
    let height: u16 = value
        .trim_end_matches('p')
        .parse()
        .map_err(|_| format!("not a resolution: {value}"))?;
    Resolution::from_height(height)
        .map(Resolution::height)
        .ok_or_else(|| format!("unsupported resolution {height}p"))
}

impl GenerateArgs {
    pub fn to_params(&self) -> RenderParams {
        RenderParams {
            surah: self.surah,
            ayah_start: self.ayah_start,
            ayah_end: self.ayah_end.unwrap_or(self.ayah_start),
            reciter_id: self.reciter.clone(),
            translation_id: self.translation.clone(),
            platform: self.platform.into(),
            resolution: Resolution::from_height(self.resolution).unwrap_or_default(),
            background_url: self.background_url.clone(),
        }
    }
}
