use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use reel_core::JobState;
use reel_engine::{
    ensure_output_dir, ApiSettings, BackgroundCatalog, DeliveryStatus, FileSink, JobCoordinator,
};
use reel_logging::{reel_info, reel_warn};

use super::cli::{Cli, Command, GenerateArgs};
use super::config::AppConfig;
use super::{logging, render};

const EXIT_INTERRUPTED: u8 = 130;

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::initialize(cli.log_file.clone(), cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    let settings = config.api_settings(cli.api_url.as_deref())?;
    reel_info!("Using backend at {}", settings.base_url);

    match &cli.command {
        Command::Generate(args) => generate(settings, &config, args).await,
        Command::Backgrounds => list_backgrounds(settings).await,
    }
}

async fn generate(
    settings: ApiSettings,
    config: &AppConfig,
    args: &GenerateArgs,
) -> anyhow::Result<ExitCode> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    // Fail before rendering rather than after.
    ensure_output_dir(&output_dir)
        .with_context(|| format!("output directory {}", output_dir.display()))?;

    let sink = FileSink::new(output_dir);
    let params = args.to_params();
    let mut coordinator =
        JobCoordinator::from_settings(settings).with_sink(Arc::new(sink.clone()));

    let job_id = coordinator.submit(params.clone()).await;
    println!(
        "Generating surah {} ayat {}-{} ({}, {})",
        params.surah, params.ayah_start, params.ayah_end, params.platform, params.resolution
    );
    reel_info!("Job {} submitted", job_id);
    if let Some(line) = render::progress_line(&coordinator.view()) {
        println!("{line}");
    }

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        let view = tokio::select! {
            view = coordinator.next_update() => view,
            _ = &mut interrupt => {
                reel_warn!("Interrupted, abandoning job {}", job_id);
                coordinator.reset().await;
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        };

        for notice in coordinator.take_notices() {
            eprintln!("warning: {notice}");
        }
        if view.dirty {
            if let Some(line) = render::progress_line(&view) {
                println!("{line}");
            }
        }

        match &view.state {
            JobState::Running { .. } => continue,
            JobState::Succeeded { artifact } => {
                let path = sink.target_path(&params, artifact);
                return Ok(report_saved(coordinator.delivery(), &path));
            }
            JobState::Failed { error } => {
                eprintln!("Video generation failed: {}", error.message);
                return Ok(ExitCode::FAILURE);
            }
            JobState::Idle => return Ok(ExitCode::FAILURE),
        }
    }
}

fn report_saved(delivery: Option<&DeliveryStatus>, path: &Path) -> ExitCode {
    match delivery {
        Some(DeliveryStatus::Delivered) => {
            println!("Saved {}", path.display());
            ExitCode::SUCCESS
        }
        Some(DeliveryStatus::Failed(reason)) => {
            eprintln!("Video was generated but could not be saved: {reason}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("Video was generated but never handed to the output directory");
            ExitCode::FAILURE
        }
    }
}

async fn list_backgrounds(settings: ApiSettings) -> anyhow::Result<ExitCode> {
    let videos = BackgroundCatalog::new(settings).list().await;
    if videos.is_empty() {
        println!("No background videos available.");
        return Ok(ExitCode::SUCCESS);
    }

    for video in &videos {
        println!(
            "{:>10}  {:<24}  {}",
            video.id,
            video.author().unwrap_or("-"),
            video.download_url()
        );
    }
    Ok(ExitCode::SUCCESS)
}
