//! Audio-track extraction and conditioning.

use std::path::Path;

use super::probe::probe_duration_secs;
use crate::command::{path_arg, CommandRunner};
use crate::error::{CoreError, Result};

/// Minimum audio duration fed to the acoustic fingerprinter, in seconds.
/// Shorter clips are padded with silence to avoid fingerprint instability.
pub const MIN_AUDIO_SECS: u32 = 3;

/// Extract the audio stream of `video_path` into `audio_path`.
///
/// A source without an audio stream is the expected, distinguishable
/// [`CoreError::NoAudioStream`] condition, not a hard error.
pub async fn extract_audio(
    runner: &dyn CommandRunner,
    video_path: &Path,
    audio_path: &Path,
) -> Result<()> {
    let video = path_arg(video_path);
    let audio = path_arg(audio_path);

    let result = runner
        .run("ffmpeg", &["-i", &video, "-q:a", "0", "-map", "a?", &audio])
        .await;

    match result {
        Ok(_) if audio_path.is_file() => Ok(()),
        // `-map a?` makes the audio stream optional; with none present ffmpeg
        // either fails complaining about an empty output or writes nothing.
        Ok(_) => Err(CoreError::NoAudioStream),
        Err(CoreError::ToolInvocation { message, .. })
            if message.contains("does not contain any stream") =>
        {
            Err(CoreError::NoAudioStream)
        }
        Err(e) => Err(e),
    }
}

/// Pad `input_path` with trailing silence (and trim) so the result is at
/// least `min_secs` long, writing to `output_path`.
pub async fn pad_audio(
    runner: &dyn CommandRunner,
    input_path: &Path,
    output_path: &Path,
    min_secs: u32,
) -> Result<()> {
    let duration = probe_duration_secs(runner, input_path).await?;
    let target_secs = std::cmp::max(duration.ceil() as u32, min_secs);

    let input = path_arg(input_path);
    let output = path_arg(output_path);
    let filter = format!("apad,atrim=end={target_secs}");

    runner
        .run("ffmpeg", &["-i", &input, "-af", &filter, &output])
        .await?;

    Ok(())
}
