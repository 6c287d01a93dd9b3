//! Acoustic fingerprinting via chromaprint.
//!
//! The chromaprint tool (fpcalc) emits windows of raw 32-bit integers
//! describing short-time spectral features. Those integers are projected into
//! a deterministic grayscale image - column per value, row per bit - and the
//! same DCT perceptual hash used for visuals is computed over it. The
//! signal-to-image indirection lets one hashing algorithm serve both pixels
//! and sound.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use serde::Deserialize;

use super::phash::phash_image;
use super::Fingerprint;
use crate::command::{path_arg, CommandRunner};
use crate::error::{CoreError, Result};

/// Fingerprint-length cap passed to the chromaprint tool, in seconds.
pub const MAX_FINGERPRINT_SECS: u32 = 60;

#[derive(Debug, Deserialize)]
struct ChromaprintWindow {
    #[serde(default)]
    fingerprint: Vec<u32>,
}

/// Run the chromaprint tool over `audio_path` and concatenate the raw 32-bit
/// fingerprint integers across all emitted windows.
///
/// Invoked with overlapping analysis windows and the given length cap; each
/// output line is one JSON window. Zero windows or zero values is the
/// [`CoreError::EmptyResult`] hard failure.
pub async fn chromaprint_fingerprint(
    runner: &dyn CommandRunner,
    fpcalc_path: &Path,
    audio_path: &Path,
    max_secs: u32,
) -> Result<Vec<u32>> {
    let fpcalc = path_arg(fpcalc_path);
    let audio = path_arg(audio_path);
    let length = max_secs.to_string();

    let out = runner
        .run(
            &fpcalc,
            &["-raw", "-json", "-overlap", "-length", &length, &audio],
        )
        .await?;

    let mut values = Vec::new();
    for line in out.lines().map(str::trim) {
        if !line.starts_with('{') {
            continue;
        }
        let window: ChromaprintWindow = serde_json::from_str(line)
            .map_err(|e| CoreError::ToolOutput(format!("unable to parse fpcalc output: {e}")))?;
        values.extend(window.fingerprint);
    }

    if values.is_empty() {
        return Err(CoreError::EmptyResult(
            "no fingerprint windows produced".into(),
        ));
    }

    Ok(values)
}

/// Project a fingerprint integer sequence into a grayscale image.
///
/// Fixed mapping: column `x` is the value at index `x`, row `y` is bit `y`
/// of that value, white iff the bit is set.
pub fn fingerprint_to_image(values: &[u32]) -> Result<GrayImage> {
    if values.is_empty() {
        return Err(CoreError::EmptyResult("empty fingerprint sequence".into()));
    }

    let mut img = GrayImage::new(values.len() as u32, 32);
    for (x, value) in values.iter().enumerate() {
        for y in 0..32u32 {
            if value >> y & 1 == 1 {
                img.put_pixel(x as u32, y, Luma([u8::MAX]));
            }
        }
    }
    Ok(img)
}

/// Full acoustic fingerprint: chromaprint, project, pHash.
pub async fn phash_audio(
    runner: &dyn CommandRunner,
    fpcalc_path: &Path,
    audio_path: &Path,
    max_secs: u32,
) -> Result<Fingerprint> {
    let values = chromaprint_fingerprint(runner, fpcalc_path, audio_path, max_secs).await?;
    let projected = fingerprint_to_image(&values)?;
    phash_image(&DynamicImage::ImageLuma8(projected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockRunner;

    #[tokio::test]
    async fn test_chromaprint_single_window() {
        let runner = MockRunner::always(r#"{"duration": 7.2, "fingerprint": [1, 2, 3]}"#);
        let values =
            chromaprint_fingerprint(&runner, Path::new("fpcalc"), Path::new("a.mp3"), 60)
                .await
                .unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_chromaprint_concatenates_windows() {
        let runner = MockRunner::always(
            "{\"fingerprint\": [10, 20]}\n{\"fingerprint\": [30]}\n{\"fingerprint\": [40, 50]}\n",
        );
        let values =
            chromaprint_fingerprint(&runner, Path::new("fpcalc"), Path::new("a.mp3"), 60)
                .await
                .unwrap();
        assert_eq!(values, vec![10, 20, 30, 40, 50]);
    }

    #[tokio::test]
    async fn test_chromaprint_arguments() {
        let runner = MockRunner::always(r#"{"fingerprint": [1]}"#);
        chromaprint_fingerprint(
            &runner,
            Path::new("/opt/chromaprint/fpcalc"),
            Path::new("a.mp3"),
            60,
        )
        .await
        .unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, "/opt/chromaprint/fpcalc");
        assert_eq!(calls[0].args, vec!["-raw", "-json", "-overlap", "-length", "60", "a.mp3"]);
    }

    #[tokio::test]
    async fn test_chromaprint_empty_output_is_hard_failure() {
        let runner = MockRunner::always("");
        let err = chromaprint_fingerprint(&runner, Path::new("fpcalc"), Path::new("a.mp3"), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn test_chromaprint_unparsable_window() {
        let runner = MockRunner::always("{not json}");
        let err = chromaprint_fingerprint(&runner, Path::new("fpcalc"), Path::new("a.mp3"), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ToolOutput(_)));
    }

    #[test]
    fn test_projection_maps_bits_to_pixels() {
        // 0b101 -> bits 0 and 2 set in column 0.
        let img = fingerprint_to_image(&[0b101, 0]).unwrap();
        assert_eq!(img.width(), 2);
        assert_eq!(img.height(), 32);

        assert_eq!(img.get_pixel(0, 0).0, [255]);
        assert_eq!(img.get_pixel(0, 1).0, [0]);
        assert_eq!(img.get_pixel(0, 2).0, [255]);
        assert!((0..32).all(|y| img.get_pixel(1, y).0 == [0]));
    }

    #[test]
    fn test_projection_deterministic() {
        let values = [0xDEAD_BEEF, 0x1234_5678, 0];
        assert_eq!(
            fingerprint_to_image(&values).unwrap(),
            fingerprint_to_image(&values).unwrap()
        );
    }

    #[tokio::test]
    async fn test_phash_audio_deterministic() {
        let output = r#"{"fingerprint": [3277770918, 3277770790, 3210662054, 3215381606]}"#;
        let runner_a = MockRunner::always(output);
        let runner_b = MockRunner::always(output);

        let a = phash_audio(&runner_a, Path::new("fpcalc"), Path::new("a.mp3"), 60)
            .await
            .unwrap();
        let b = phash_audio(&runner_b, Path::new("fpcalc"), Path::new("a.mp3"), 60)
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
