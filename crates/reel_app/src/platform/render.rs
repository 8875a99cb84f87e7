use reel_core::{JobState, JobView};

/// One progress line, e.g. `[ 42%] rendering`. `None` while idle.
pub fn progress_line(view: &JobView) -> Option<String> {
    match &view.state {
        JobState::Idle => None,
        JobState::Running {
            percentage,
            status_key,
        } => Some(format!(
            "[{:>3}%] {}",
            percentage,
            status_key.as_deref().unwrap_or("")
        )),
        JobState::Succeeded { artifact } => Some(format!(
            "[100%] done ({}, {})",
            format_size(artifact.len()),
            artifact.mime_type
        )),
        JobState::Failed { error } => Some(format!("[fail] {}", error)),
    }
}

fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= MIB {
        format!("{:.1} MiB", bytes_f / MIB)
    } else if bytes_f >= KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{} B", bytes)
    }
}
