//! Evenly-spaced frame sampling.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::probe::probe_video;
use crate::command::{path_arg, CommandRunner};
use crate::error::{CoreError, Result};

/// Default number of frames sampled from a video.
pub const DEFAULT_FRAME_COUNT: usize = 12;

/// Extract an evenly-spaced subset of frames from `video_path` into
/// `frames_dir`.
///
/// Probes the total frame count, derives a sampling interval of
/// `max(1, total / desired)` and selects every Nth frame into sequentially
/// numbered PNG files. Returns the sorted frame paths, truncated to
/// `desired_count` if extraction over-produces.
pub async fn sample_frames(
    runner: &dyn CommandRunner,
    video_path: &Path,
    frames_dir: &Path,
    desired_count: usize,
) -> Result<Vec<PathBuf>> {
    // A zero count would divide by zero below and truncate to nothing.
    let desired_count = desired_count.max(1);

    let info = probe_video(runner, video_path).await?;
    let total_frames = info.total_frame_count();
    let interval = std::cmp::max(1, total_frames / desired_count as u64);

    debug!(total_frames, interval, "sampling frames");

    let video = path_arg(video_path);
    let pattern = path_arg(&frames_dir.join("%03d.png"));
    let filter = format!("select='not(mod(n,{interval}))'");

    runner
        .run(
            "ffmpeg",
            &["-i", &video, "-vf", &filter, "-vsync", "vfr", &pattern],
        )
        .await?;

    let mut frames = list_files(frames_dir)?;
    frames.sort();
    frames.truncate(desired_count);

    if frames.is_empty() {
        return Err(CoreError::EmptyResult("no frames extracted".into()));
    }

    Ok(frames)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CoreError::Workspace(format!("unable to list {}: {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| CoreError::Workspace(format!("unable to list {}: {e}", dir.display())))?;
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}
