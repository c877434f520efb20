//! PNG encoding of binary masks.
//!
//! Fill and edge masks are written as 8-bit grayscale (ink = white on
//! black). [`encode_overlay_png`] colors a drawing's edge against the
//! reference edge so misalignment is visible at a glance.

use std::path::Path;

use image::ImageEncoder;
use sketchmatch_engine::{BinaryMask, EngineError};

/// Errors that can occur while encoding or writing masks.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),

    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The masks passed together do not share a canvas.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<image::ImageError> for RasterError {
    fn from(err: image::ImageError) -> Self {
        Self::PngEncode(err.to_string())
    }
}

/// Overlay colors: background, user edge only, reference edge only,
/// both.
const OVERLAY_BG: [u8; 3] = [255, 255, 255];
const OVERLAY_USER: [u8; 3] = [214, 39, 40];
const OVERLAY_REFERENCE: [u8; 3] = [31, 119, 180];
const OVERLAY_BOTH: [u8; 3] = [20, 20, 20];

/// Encode a mask as a grayscale PNG (ink = 255).
///
/// # Errors
///
/// Returns [`RasterError::PngEncode`] if PNG encoding fails.
pub fn encode_mask_png(mask: &BinaryMask) -> Result<Vec<u8>, RasterError> {
    let gray = mask.to_gray_image();
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(
        gray.as_raw(),
        gray.width(),
        gray.height(),
        image::ExtendedColorType::L8,
    )?;
    Ok(png_bytes)
}

/// Encode a user edge over a reference edge as an RGB PNG.
///
/// User-only pixels are red, reference-only pixels blue, and pixels in
/// both near-black.
///
/// # Errors
///
/// Returns [`RasterError::Engine`] if the masks differ in size and
/// [`RasterError::PngEncode`] if encoding fails.
pub fn encode_overlay_png(
    user_edge: &BinaryMask,
    reference_edge: &BinaryMask,
) -> Result<Vec<u8>, RasterError> {
    if user_edge.dimensions() != reference_edge.dimensions() {
        return Err(EngineError::MaskSizeMismatch {
            left: user_edge.dimensions(),
            right: reference_edge.dimensions(),
        }
        .into());
    }

    let (w, h) = user_edge.dimensions();
    let mut rgb_buf = Vec::with_capacity(user_edge.data().len() * 3);
    for (&u, &r) in user_edge.data().iter().zip(reference_edge.data()) {
        let color = match (u != 0, r != 0) {
            (false, false) => OVERLAY_BG,
            (true, false) => OVERLAY_USER,
            (false, true) => OVERLAY_REFERENCE,
            (true, true) => OVERLAY_BOTH,
        };
        rgb_buf.extend_from_slice(&color);
    }

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(&rgb_buf, w, h, image::ExtendedColorType::Rgb8)?;
    Ok(png_bytes)
}

/// Encode `mask` and write it to `path`.
///
/// # Errors
///
/// Returns [`RasterError::PngEncode`] if encoding fails and
/// [`RasterError::Write`] if the file cannot be written.
pub fn write_mask_png(mask: &BinaryMask, path: &Path) -> Result<(), RasterError> {
    let bytes = encode_mask_png(mask)?;
    std::fs::write(path, bytes).map_err(|source| RasterError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn diagonal(size: u32) -> BinaryMask {
        let mut mask = BinaryMask::new(size, size);
        for i in 0..size {
            mask.set(i, i, true);
        }
        mask
    }

    #[test]
    fn mask_png_round_trips_through_image() {
        let mask = diagonal(16);
        let png = encode_mask_png(&mask).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert_eq!(decoded.get_pixel(5, 5).0[0], 255);
        assert_eq!(decoded.get_pixel(5, 6).0[0], 0);
    }

    #[test]
    fn overlay_colors_each_case() {
        let user = BinaryMask::from_raw(4, 1, vec![1, 1, 0, 0]).unwrap();
        let reference = BinaryMask::from_raw(4, 1, vec![1, 0, 1, 0]).unwrap();
        let png = encode_overlay_png(&user, &reference).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, OVERLAY_BOTH);
        assert_eq!(decoded.get_pixel(1, 0).0, OVERLAY_USER);
        assert_eq!(decoded.get_pixel(2, 0).0, OVERLAY_REFERENCE);
        assert_eq!(decoded.get_pixel(3, 0).0, OVERLAY_BG);
    }

    #[test]
    fn overlay_rejects_mismatched_masks() {
        let err = encode_overlay_png(&diagonal(4), &diagonal(5)).unwrap_err();
        assert!(matches!(
            err,
            RasterError::Engine(EngineError::MaskSizeMismatch { .. })
        ));
    }

    #[test]
    fn write_mask_png_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("edge.png");
        write_mask_png(&diagonal(8), &path).unwrap();
        let decoded = image::open(&path).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(7, 7).0[0], 255);
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing").join("edge.png");
        assert!(matches!(
            write_mask_png(&diagonal(8), &path),
            Err(RasterError::Write { .. })
        ));
    }
}
