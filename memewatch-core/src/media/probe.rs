//! Stream metadata probing.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::command::{path_arg, CommandRunner};
use crate::error::{CoreError, Result};

static FRAME_RATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)/(\d+)$").expect("valid frame rate regex"));

/// Duration and frame rate of a video file's first video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub duration_secs: f64,
    /// Frame rate numerator of `r_frame_rate` ("N/D").
    pub fps_num: u32,
    /// Frame rate denominator, always non-zero.
    pub fps_den: u32,
}

impl VideoInfo {
    /// Total number of frames in the clip: `ceil(num / den * duration)`.
    pub fn total_frame_count(&self) -> u64 {
        (f64::from(self.fps_num) / f64::from(self.fps_den) * self.duration_secs).ceil() as u64
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe a video file for its duration and video-stream frame rate.
///
/// Fails if no video stream is present, the frame rate does not match the
/// `N/D` integer-fraction pattern, or the denominator is zero.
pub async fn probe_video(runner: &dyn CommandRunner, video_path: &Path) -> Result<VideoInfo> {
    let path = path_arg(video_path);
    let out = runner
        .run(
            "ffprobe",
            &[
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_entries",
                "format=duration",
                "-show_entries",
                "stream=codec_type,r_frame_rate",
                &path,
            ],
        )
        .await?;

    let info: ProbeOutput = serde_json::from_str(&out)
        .map_err(|e| CoreError::ToolOutput(format!("unable to parse ffprobe output: {e}")))?;

    let video_stream = info
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CoreError::ToolOutput("no video stream found".into()))?;

    let frame_rate = video_stream
        .r_frame_rate
        .as_deref()
        .ok_or_else(|| CoreError::ToolOutput("video stream has no frame rate".into()))?;

    let captures = FRAME_RATE_RE
        .captures(frame_rate)
        .ok_or_else(|| CoreError::ToolOutput(format!("frame rate unrecognized: {frame_rate}")))?;

    let fps_num: u32 = captures[1]
        .parse()
        .map_err(|e| CoreError::ToolOutput(format!("unable to parse frame rate numerator: {e}")))?;
    let fps_den: u32 = captures[2].parse().map_err(|e| {
        CoreError::ToolOutput(format!("unable to parse frame rate denominator: {e}"))
    })?;
    if fps_den == 0 {
        return Err(CoreError::ToolOutput(
            "frame rate denominator is zero".into(),
        ));
    }

    let duration_secs: f64 = info
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| CoreError::ToolOutput("format duration missing".into()))?
        .parse()
        .map_err(|e| CoreError::ToolOutput(format!("unable to parse duration: {e}")))?;

    Ok(VideoInfo {
        duration_secs,
        fps_num,
        fps_den,
    })
}

/// Probe a media file for its duration in seconds.
pub async fn probe_duration_secs(runner: &dyn CommandRunner, media_path: &Path) -> Result<f64> {
    let path = path_arg(media_path);
    let out = runner
        .run(
            "ffprobe",
            &[
                "-i",
                &path,
                "-show_entries",
                "format=duration",
                "-v",
                "quiet",
                "-of",
                "csv=p=0",
            ],
        )
        .await?;

    out.trim()
        .parse()
        .map_err(|e| CoreError::ToolOutput(format!("unable to parse duration: {e}")))
}
