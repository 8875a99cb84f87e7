//! Logger setup for the `reelgen` binary.
//!
//! Terminal output always; a log file as well when `--log-file` is given.

use std::path::PathBuf;

use log::LevelFilter;
use reel_logging::LogDestination;

pub fn initialize(log_file: Option<PathBuf>, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    reel_logging::initialize(destination(log_file), level);
}

fn destination(log_file: Option<PathBuf>) -> LogDestination {
    match log_file {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    }
}
