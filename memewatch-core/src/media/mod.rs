//! Media probing and stream extraction via external tools.
//!
//! Wraps the ffprobe/ffmpeg invocations the fingerprint engine depends on:
//! probing duration and frame rate, sampling evenly-spaced video frames, and
//! extracting/conditioning audio tracks.

pub mod audio;
pub mod frames;
pub mod probe;

pub use audio::{extract_audio, pad_audio, MIN_AUDIO_SECS};
pub use frames::{sample_frames, DEFAULT_FRAME_COUNT};
pub use probe::{probe_duration_secs, probe_video, VideoInfo};
