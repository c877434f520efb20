//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an RGBA
//! raster. Both the player's drawing and the reference outline enter
//! the engine through here.

use image::RgbaImage;

use crate::types::EngineError;

/// Decode raw image bytes into an RGBA raster.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] if `bytes` is empty.
/// Returns [`EngineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`EngineError::InvalidImage`] if the decoded image has zero
/// width or height.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(EngineError::InvalidImage(format!(
            "decoded image is {}x{}",
            rgba.width(),
            rgba.height()
        )));
    }
    Ok(rgba)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode_rgba(&[]), Err(EngineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(EngineError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_keeps_pixels_and_dimensions() {
        let img = RgbaImage::from_fn(17, 31, |x, _| {
            if x < 8 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 0])
            }
        });
        let decoded = decode_rgba(&encode_png(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(16, 30).0[3], 0);
    }

    #[test]
    fn grayscale_png_expands_to_rgba() {
        let gray = image::GrayImage::from_pixel(3, 2, image::Luma([40]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            gray.as_raw(),
            3,
            2,
            image::ExtendedColorType::L8,
        )
        .unwrap();
        let decoded = decode_rgba(&buf).unwrap();
        assert_eq!(decoded.get_pixel(1, 1).0, [40, 40, 40, 255]);
    }
}
