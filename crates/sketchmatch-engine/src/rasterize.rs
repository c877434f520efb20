//! Fit an image onto the square working canvas.
//!
//! Every image the engine compares (the player's drawing and the
//! reference outline) is rendered into the same fixed-size canvas:
//! uniformly scaled to fit inside a margin, centred, optionally rotated
//! about the canvas centre, and composited onto opaque white.
//!
//! Rendering goes through `tiny-skia` so the affine transform and
//! bilinear resampling behave like a 2D canvas `drawImage` call.

use image::RgbaImage;
use tiny_skia::{Color, FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};

use crate::types::EngineError;

/// A drawing or outline fitted onto the square working canvas.
///
/// Every pixel is fully opaque, so the RGB channels can be read
/// directly as ink-on-white without further compositing.
#[derive(Debug, Clone)]
pub struct NormalizedCanvas {
    image: RgbaImage,
    rotation_degrees: f32,
}

impl NormalizedCanvas {
    /// The rendered canvas pixels.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Side length of the square canvas in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Rotation the source was rendered at, in degrees.
    #[must_use]
    pub const fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Consume the canvas and return the underlying image.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Render `image` centred on a `canvas_size` square canvas.
///
/// The image is scaled by
/// `min(inner / width, inner / height)` where
/// `inner = canvas_size * (1 - 2 * margin_fraction)`, so it never
/// stretches and always keeps the margin free on every side. A positive
/// `rotation_degrees` turns the image counter-clockwise as seen on
/// screen.
///
/// # Errors
///
/// Returns [`EngineError::InvalidImage`] if `image` has zero width or
/// height. Returns [`EngineError::InvalidConfig`] if a canvas of
/// `canvas_size` cannot be allocated.
pub fn rasterize(
    image: &RgbaImage,
    canvas_size: u32,
    margin_fraction: f32,
    rotation_degrees: f32,
) -> Result<NormalizedCanvas, EngineError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EngineError::InvalidImage(format!(
            "cannot rasterize a {width}x{height} image"
        )));
    }

    let source = to_pixmap(image)?;
    let mut canvas = Pixmap::new(canvas_size, canvas_size).ok_or_else(|| {
        EngineError::InvalidConfig(format!(
            "cannot allocate a {canvas_size}x{canvas_size} canvas"
        ))
    })?;
    canvas.fill(Color::WHITE);

    let transform = fit_transform(width, height, canvas_size, margin_fraction, rotation_degrees);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);

    // The white fill makes every pixel opaque, so premultiplied and
    // straight alpha coincide and the buffer can be used as-is.
    let image = RgbaImage::from_raw(canvas_size, canvas_size, canvas.data().to_vec())
        .ok_or_else(|| EngineError::InvalidImage("canvas buffer size mismatch".to_string()))?;

    Ok(NormalizedCanvas {
        image,
        rotation_degrees,
    })
}

/// Uniform scale factor that fits a `width` x `height` image inside the
/// margin of a `canvas_size` canvas.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_scale(width: u32, height: u32, canvas_size: u32, margin_fraction: f32) -> f32 {
    let inner = canvas_size as f32 * 2.0f32.mul_add(-margin_fraction, 1.0);
    (inner / width as f32).min(inner / height as f32)
}

/// Source-to-canvas transform: scale, centre on the origin, rotate,
/// then move the origin to the canvas centre.
#[allow(clippy::cast_precision_loss)]
fn fit_transform(
    width: u32,
    height: u32,
    canvas_size: u32,
    margin_fraction: f32,
    rotation_degrees: f32,
) -> Transform {
    let scale = fit_scale(width, height, canvas_size, margin_fraction);
    let half = canvas_size as f32 / 2.0;
    let scaled_w = width as f32 * scale;
    let scaled_h = height as f32 * scale;

    // tiny-skia rotates clockwise in y-down space; negate so positive
    // angles turn counter-clockwise on screen.
    Transform::from_translate(half, half)
        .pre_concat(Transform::from_rotate(-rotation_degrees))
        .pre_concat(Transform::from_translate(-scaled_w / 2.0, -scaled_h / 2.0))
        .pre_concat(Transform::from_scale(scale, scale))
}

/// Convert a straight-alpha RGBA image into a premultiplied pixmap.
fn to_pixmap(image: &RgbaImage) -> Result<Pixmap, EngineError> {
    let (width, height) = image.dimensions();
    let size = IntSize::from_wh(width, height).ok_or_else(|| {
        EngineError::InvalidImage(format!("cannot rasterize a {width}x{height} image"))
    })?;

    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        data.extend_from_slice(&[premultiply(r, a), premultiply(g, a), premultiply(b, a), a]);
    }

    Pixmap::from_vec(data, size).ok_or_else(|| {
        EngineError::InvalidImage(format!("cannot rasterize a {width}x{height} image"))
    })
}

#[allow(clippy::cast_possible_truncation)]
const fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u16 * alpha as u16 + 127) / 255) as u8
}
