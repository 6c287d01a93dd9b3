//! End-to-end video fingerprinting against a mocked toolchain.
//!
//! The mock runner answers ffprobe/ffmpeg/fpcalc invocations with canned
//! outputs and writes the files those tools would produce, so the whole
//! probe -> sample -> collage -> hash and extract -> pad -> fingerprint
//! pipeline runs without any real binaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use memewatch_core::command::MockRunner;
use memewatch_core::fingerprint::phash_image;
use memewatch_core::{build_collage, CoreError, EngineConfig, FingerprintEngine, COLLAGE_WIDTH};
use tracing_subscriber::EnvFilter;

/// Capture engine tracing output in test logs (`RUST_LOG` controls the
/// level). Safe to call from every test; only the first registration wins.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const PROBE_JSON: &str = r#"{
    "streams": [
        {"codec_type": "video", "r_frame_rate": "25/1"},
        {"codec_type": "audio"}
    ],
    "format": {"duration": "10.0"}
}"#;

const FPCALC_JSON: &str =
    r#"{"duration": 10.0, "fingerprint": [3277770918, 3277770790, 3210662054, 3215381606]}"#;

fn write_solid_png(path: &Path, px: [u8; 4]) {
    RgbaImage::from_pixel(64, 48, Rgba(px)).save(path).unwrap();
}

/// Mocks the full toolchain for a clip that yields `frame_count` frames.
/// When `with_audio` is false, the audio-extraction invocation fails the way
/// ffmpeg does for a silent source.
fn toolchain_mock(frame_count: usize, with_audio: bool) -> MockRunner {
    MockRunner::new(move |program, args| {
        let args_owned: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        match program {
            "ffprobe" if args_owned.contains(&"csv=p=0".to_string()) => Ok("1.4\n".to_string()),
            "ffprobe" => Ok(PROBE_JSON.to_string()),
            "ffmpeg" if args_owned.contains(&"-vf".to_string()) => {
                let pattern = PathBuf::from(args_owned.last().unwrap());
                let dir = pattern.parent().unwrap();
                for i in 1..=frame_count {
                    write_solid_png(&dir.join(format!("{i:03}.png")), [40, 80, 120, 255]);
                }
                Ok(String::new())
            }
            "ffmpeg" if args_owned.contains(&"-map".to_string()) => {
                if with_audio {
                    std::fs::write(args_owned.last().unwrap(), b"mp3").unwrap();
                    Ok(String::new())
                } else {
                    Err(CoreError::tool(
                        "ffmpeg",
                        "exit status 1: Output file #0 does not contain any stream",
                    ))
                }
            }
            "ffmpeg" if args_owned.contains(&"-af".to_string()) => {
                std::fs::write(args_owned.last().unwrap(), b"mp3-padded").unwrap();
                Ok(String::new())
            }
            "fpcalc" => Ok(FPCALC_JSON.to_string()),
            other => panic!("unexpected invocation: {other} {args_owned:?}"),
        }
    })
}

fn engine(runner: MockRunner) -> FingerprintEngine {
    FingerprintEngine::with_runner(EngineConfig::default(), Arc::new(runner))
}

#[tokio::test]
async fn test_video_with_audio_yields_both_fingerprints() {
    init_tracing();
    let engine = engine(toolchain_mock(12, true));

    let fp = engine
        .fingerprint_video(Path::new("meme.mp4"))
        .await
        .unwrap();

    assert!(fp.audio.is_some());

    // Deterministic: the same clip fingerprinted again yields the same pair.
    let again = engine
        .fingerprint_video(Path::new("meme.mp4"))
        .await
        .unwrap();
    assert_eq!(fp, again);
}

#[tokio::test]
async fn test_silent_video_degrades_gracefully() {
    init_tracing();
    let with_audio = engine(toolchain_mock(12, true))
        .fingerprint_video(Path::new("meme.mp4"))
        .await
        .unwrap();
    let silent = engine(toolchain_mock(12, false))
        .fingerprint_video(Path::new("meme.mp4"))
        .await
        .unwrap();

    assert_eq!(silent.video, with_audio.video);
    assert!(silent.audio.is_none());
}

#[tokio::test]
async fn test_padding_happens_before_fingerprinting() {
    init_tracing();
    let runner = Arc::new(toolchain_mock(4, true));
    let engine = FingerprintEngine::with_runner(EngineConfig::default(), runner.clone());

    engine
        .fingerprint_video(Path::new("meme.mp4"))
        .await
        .unwrap();

    // The audio track probes at 1.4s, so it must be padded up to the 3s
    // minimum before fpcalc sees it.
    let calls = runner.calls();
    assert!(calls
        .iter()
        .any(|c| c.program == "ffmpeg" && c.args.contains(&"apad,atrim=end=3".to_string())));

    let pad_idx = calls
        .iter()
        .position(|c| c.args.contains(&"-af".to_string()))
        .unwrap();
    let fpcalc_idx = calls.iter().position(|c| c.program == "fpcalc").unwrap();
    assert!(pad_idx < fpcalc_idx);
}

#[tokio::test]
async fn test_extraction_failure_aborts_without_fingerprint() {
    init_tracing();
    let runner = MockRunner::new(|program, _| match program {
        "ffprobe" => Ok(PROBE_JSON.to_string()),
        other => Err(CoreError::tool(other, "exit status 1: corrupt input")),
    });
    let engine = engine(runner);

    let err = engine
        .fingerprint_video(Path::new("broken.mp4"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ToolInvocation { .. }));
}

#[test]
fn test_uniform_collage_hash_is_frame_count_invariant() {
    // All frames identical and visually uniform: a 12-frame collage and a
    // 1-frame collage are both solid rasters of the same color, so their
    // perceptual hashes agree.
    let dir = tempfile::tempdir().unwrap();
    let px = [200u8, 30, 90, 255];

    let frames: Vec<PathBuf> = (0..12)
        .map(|i| {
            let path = dir.path().join(format!("{i:03}.png"));
            write_solid_png(&path, px);
            path
        })
        .collect();

    let twelve = build_collage(&frames, COLLAGE_WIDTH).unwrap();
    let one = build_collage(&frames[..1], COLLAGE_WIDTH).unwrap();

    let hash_twelve = phash_image(&image::DynamicImage::ImageRgba8(twelve)).unwrap();
    let hash_one = phash_image(&image::DynamicImage::ImageRgba8(one)).unwrap();
    assert_eq!(hash_twelve, hash_one);
}
