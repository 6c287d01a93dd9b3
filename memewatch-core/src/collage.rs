//! Frame-collage composition.
//!
//! Tiles sampled video frames into a single square-ish still so that one
//! image perceptual hash can stand in for the whole motion sequence. With
//! `k = ceil(sqrt(n))` frames per row, each frame is scaled with
//! nearest-neighbor resampling so `k` of them span the fixed collage width,
//! then pasted left-to-right, wrapping every `k` frames, top-aligned with no
//! gaps.

use std::path::PathBuf;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Fixed collage output width in pixels.
pub const COLLAGE_WIDTH: u32 = 1024;

/// Compose an ordered list of still frames into one RGBA collage.
///
/// All frames are assumed to share the first frame's dimensions (they come
/// from the same video stream).
pub fn build_collage(frame_paths: &[PathBuf], collage_width: u32) -> Result<RgbaImage> {
    if frame_paths.is_empty() {
        return Err(CoreError::EmptyResult("no frames to collage".into()));
    }

    let first = load_frame(&frame_paths[0])?;
    let (frame_w, frame_h) = first.dimensions();

    let count = frame_paths.len();
    let per_row = (count as f64).sqrt().ceil() as u32;
    let scale = f64::from(collage_width) / (f64::from(per_row) * f64::from(frame_w));

    let scaled_w = (f64::from(frame_w) * scale).ceil() as u32;
    let scaled_h = (f64::from(frame_h) * scale).ceil() as u32;

    let rows = (count as f64 / f64::from(per_row)).ceil();
    let collage_height = (scale * f64::from(frame_h) * rows).ceil() as u32;

    debug!(
        count,
        per_row, scaled_w, scaled_h, collage_width, collage_height, "building collage"
    );

    let mut collage = RgbaImage::new(collage_width, collage_height);

    for (index, path) in frame_paths.iter().enumerate() {
        let frame = if index == 0 {
            first.clone()
        } else {
            load_frame(path)?
        };

        let scaled = image::imageops::resize(&frame, scaled_w, scaled_h, FilterType::Nearest);

        let col = index as u32 % per_row;
        let row = index as u32 / per_row;
        image::imageops::overlay(
            &mut collage,
            &scaled,
            i64::from(col * scaled_w),
            i64::from(row * scaled_h),
        );
    }

    Ok(collage)
}

fn load_frame(path: &PathBuf) -> Result<DynamicImage> {
    image::open(path)
        .map_err(|e| CoreError::Image(format!("unable to decode frame {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_solid_frame(dir: &std::path::Path, name: &str, w: u32, h: u32, px: [u8; 4]) -> PathBuf {
        let img = RgbaImage::from_pixel(w, h, Rgba(px));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_collage_dimensions_twelve_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<PathBuf> = (0..12)
            .map(|i| write_solid_frame(dir.path(), &format!("{i:03}.png"), 512, 384, [10, 20, 30, 255]))
            .collect();

        let collage = build_collage(&frames, COLLAGE_WIDTH).unwrap();

        // k = ceil(sqrt(12)) = 4, scale = 1024 / (4 * 512) = 0.5,
        // rows = 3, height = ceil(0.5 * 384 * 3) = 576
        assert_eq!(collage.width(), 1024);
        assert_eq!(collage.height(), 576);
    }

    #[test]
    fn test_collage_single_frame_spans_width() {
        let dir = tempfile::tempdir().unwrap();
        let frame = write_solid_frame(dir.path(), "000.png", 256, 128, [200, 0, 0, 255]);

        let collage = build_collage(&[frame], COLLAGE_WIDTH).unwrap();

        // k = 1, scale = 4, one row of 512px
        assert_eq!(collage.width(), 1024);
        assert_eq!(collage.height(), 512);
    }

    #[test]
    fn test_collage_uniform_frames_is_uniform() {
        let dir = tempfile::tempdir().unwrap();
        let px = [42, 84, 126, 255];
        let frames: Vec<PathBuf> = (0..12)
            .map(|i| write_solid_frame(dir.path(), &format!("{i:03}.png"), 320, 240, px))
            .collect();

        let collage = build_collage(&frames, COLLAGE_WIDTH).unwrap();
        assert!(collage.pixels().all(|p| p.0 == px));
    }

    #[test]
    fn test_collage_frame_placement() {
        let dir = tempfile::tempdir().unwrap();
        // Four 512x512 frames: k = 2, scale = 1, 2x2 grid.
        let colors = [
            [255u8, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
            [255, 255, 0, 255],
        ];
        let frames: Vec<PathBuf> = colors
            .iter()
            .enumerate()
            .map(|(i, c)| write_solid_frame(dir.path(), &format!("{i:03}.png"), 512, 512, *c))
            .collect();

        let collage = build_collage(&frames, COLLAGE_WIDTH).unwrap();
        assert_eq!(collage.height(), 1024);

        assert_eq!(collage.get_pixel(10, 10).0, colors[0]);
        assert_eq!(collage.get_pixel(522, 10).0, colors[1]);
        assert_eq!(collage.get_pixel(10, 522).0, colors[2]);
        assert_eq!(collage.get_pixel(522, 522).0, colors[3]);
    }

    #[test]
    fn test_collage_empty_input() {
        let err = build_collage(&[], COLLAGE_WIDTH).unwrap_err();
        assert!(matches!(err, CoreError::EmptyResult(_)));
    }
}
