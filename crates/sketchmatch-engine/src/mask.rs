//! Binary ink masks.
//!
//! A [`BinaryMask`] holds one byte per canvas pixel: `1` for ink, `0`
//! for background. Fill masks come straight from a luminance threshold
//! ([`BinaryMask::from_canvas`]); edge masks are derived from fill masks
//! in [`crate::morphology`].

use image::GrayImage;

use crate::rasterize::NormalizedCanvas;
use crate::types::EngineError;

/// One-byte-per-pixel ink mask, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// An all-background mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; pixel_count(width, height)],
        }
    }

    /// Build a mask from raw 0/1 values.
    ///
    /// Any non-zero byte is normalised to `1`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidImage`] if `data.len()` is not
    /// `width * height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EngineError> {
        let expected = pixel_count(width, height);
        if data.len() != expected {
            return Err(EngineError::InvalidImage(format!(
                "mask buffer has {} bytes, expected {expected}",
                data.len()
            )));
        }
        let data = data.into_iter().map(|v| u8::from(v != 0)).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap a buffer already known to hold `width * height` 0/1 bytes.
    pub(crate) fn from_parts(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), pixel_count(width, height));
        Self {
            width,
            height,
            data,
        }
    }

    /// Threshold a canvas into an ink mask.
    ///
    /// Luminance is the plain average of R, G and B; alpha is ignored
    /// because the canvas is already composited onto white. A pixel is
    /// ink iff its luminance is strictly below `threshold`.
    #[must_use]
    pub fn from_canvas(canvas: &NormalizedCanvas, threshold: u8) -> Self {
        let image = canvas.image();
        // lum < t  <=>  r + g + b < 3t, exact in integers.
        let limit = 3 * u16::from(threshold);
        let data = image
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0;
                u8::from(u16::from(r) + u16::from(g) + u16::from(b) < limit)
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major 0/1 values.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the pixel at `(x, y)` is set. Out-of-range coordinates
    /// read as background.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[self.index(x, y)] != 0
    }

    /// Set or clear the pixel at `(x, y)`. Out-of-range writes are
    /// ignored.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.data[i] = u8::from(value);
        }
    }

    /// Number of set pixels.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.data.iter().map(|&v| u64::from(v)).sum()
    }

    /// Whether no pixel is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// Number of pixels set in both `self` and `other`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MaskSizeMismatch`] if the masks differ in
    /// size.
    pub fn intersection_count(&self, other: &Self) -> Result<u64, EngineError> {
        self.ensure_same_size(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| u64::from(a & b))
            .sum())
    }

    /// Pixels set in `self` but not in `other`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MaskSizeMismatch`] if the masks differ in
    /// size.
    pub fn difference(&self, other: &Self) -> Result<Self, EngineError> {
        self.ensure_same_size(other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a & !b & 1)
            .collect();
        Ok(Self {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Whether every set pixel of `self` is also set in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(&a, &b)| a == 0 || b != 0)
    }

    /// Render as a grayscale image: ink = 255, background = 0.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// Fail with [`EngineError::MaskSizeMismatch`] unless both masks
    /// share a canvas.
    pub(crate) fn ensure_same_size(&self, other: &Self) -> Result<(), EngineError> {
        if self.dimensions() == other.dimensions() {
            Ok(())
        } else {
            Err(EngineError::MaskSizeMismatch {
                left: self.dimensions(),
                right: other.dimensions(),
            })
        }
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

const fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
