//! Two-pass chamfer distance transform.
//!
//! Approximates, for every pixel, the Euclidean distance to the nearest
//! set pixel of an edge mask. Orthogonal steps cost 1 and diagonal steps
//! cost √2, propagated in one forward raster pass (W, N, NW, NE
//! neighbours) and one backward pass (E, S, SE, SW). The result is an
//! upper bound on the true distance and is accurate enough for the small
//! tolerance radii used when matching edges.

use std::f32::consts::SQRT_2;

use crate::mask::BinaryMask;

/// Per-pixel distance to the nearest edge pixel.
///
/// Edge pixels hold exactly `0.0`. If the source mask was empty every
/// pixel holds `f32::INFINITY`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DistanceField {
    /// Field width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Field height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Row-major distances.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Distance at `(x, y)`, or `None` outside the field.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Chamfer distance from every pixel to the nearest set pixel of `edge`.
#[must_use = "returns the distance field"]
pub fn distance_transform(edge: &BinaryMask) -> DistanceField {
    let (width, height) = edge.dimensions();
    let w = width as usize;
    let h = height as usize;
    let mut d: Vec<f32> = edge
        .data()
        .iter()
        .map(|&v| if v != 0 { 0.0 } else { f32::INFINITY })
        .collect();

    // Forward pass: top-to-bottom, left-to-right.
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let mut best = d[i];
            if x > 0 {
                best = best.min(d[i - 1] + 1.0);
            }
            if y > 0 {
                best = best.min(d[i - w] + 1.0);
                if x > 0 {
                    best = best.min(d[i - w - 1] + SQRT_2);
                }
                if x + 1 < w {
                    best = best.min(d[i - w + 1] + SQRT_2);
                }
            }
            d[i] = best;
        }
    }

    // Backward pass: bottom-to-top, right-to-left.
    for y in (0..h).rev() {
        for x in (0..w).rev() {
            let i = y * w + x;
            let mut best = d[i];
            if x + 1 < w {
                best = best.min(d[i + 1] + 1.0);
            }
            if y + 1 < h {
                best = best.min(d[i + w] + 1.0);
                if x + 1 < w {
                    best = best.min(d[i + w + 1] + SQRT_2);
                }
                if x > 0 {
                    best = best.min(d[i + w - 1] + SQRT_2);
                }
            }
            d[i] = best;
        }
    }

    DistanceField {
        width,
        height,
        values: d,
    }
}
