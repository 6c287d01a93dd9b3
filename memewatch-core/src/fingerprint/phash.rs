//! DCT-based image perceptual hashing.
//!
//! The classic pHash construction: downsample to a small grid, apply a 2-D
//! discrete cosine transform and keep the low-frequency coefficients' sign
//! bits relative to their mean, yielding 64 bits that survive recompression,
//! resizing and minor edits.

use std::path::Path;

use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig};

use super::Fingerprint;
use crate::error::{CoreError, Result};

fn dct_hasher() -> Hasher {
    HasherConfig::new()
        .hash_size(8, 8)
        .preproc_dct()
        .hash_alg(HashAlg::Mean)
        .to_hasher()
}

/// Compute the 64-bit DCT perceptual hash of a decoded image.
///
/// Pure function of the pixel content: the same image always yields the same
/// fingerprint.
pub fn phash_image(image: &DynamicImage) -> Result<Fingerprint> {
    let hash = dct_hasher().hash_image(image);
    let bytes: [u8; 8] = hash
        .as_bytes()
        .try_into()
        .map_err(|_| CoreError::Image("unexpected perceptual hash size".into()))?;
    Ok(Fingerprint(u64::from_be_bytes(bytes)))
}

/// Decode raw image bytes (JPEG/PNG/GIF/WebP) and hash them.
pub fn phash_bytes(data: &[u8]) -> Result<Fingerprint> {
    let image = image::load_from_memory(data)
        .map_err(|e| CoreError::Image(format!("unable to decode image: {e}")))?;
    phash_image(&image)
}

/// Decode an image file and hash it.
pub fn phash_file(path: &Path) -> Result<Fingerprint> {
    let image = image::open(path)
        .map_err(|e| CoreError::Image(format!("unable to decode {}: {e}", path.display())))?;
    phash_image(&image)
}
