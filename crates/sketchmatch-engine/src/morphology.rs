//! Binary morphology: single-pass erosion and boundary extraction.
//!
//! [`edge_of`] turns a filled ink mask into a roughly one-pixel-wide
//! outline (`mask AND NOT erode(mask)`), so a solid silhouette and a
//! hand-drawn outline of the same shape end up comparable.
//!
//! Strokes thinner than three pixels have no pixel with a full 3x3
//! neighbourhood, so erosion removes them entirely and [`edge_of`]
//! returns the whole stroke. Reference outlines are expected to be
//! filled silhouettes or strokes at least 3 px wide.

use crate::mask::BinaryMask;

/// One pass of 3x3 binary erosion.
///
/// A pixel survives only if it and all eight neighbours are set. Pixels
/// on the canvas border have no full neighbourhood and are always
/// cleared. This is exactly one pass, never iterated.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &BinaryMask) -> BinaryMask {
    let (width, height) = mask.dimensions();
    if width < 3 || height < 3 {
        return BinaryMask::new(width, height);
    }

    let w = width as usize;
    let src = mask.data();
    let mut eroded = vec![0u8; src.len()];
    for y in 1..height as usize - 1 {
        let above = &src[(y - 1) * w..y * w];
        let row = &src[y * w..(y + 1) * w];
        let below = &src[(y + 1) * w..(y + 2) * w];
        for x in 1..w - 1 {
            let all_set =
                (x - 1..=x + 1).all(|k| above[k] != 0 && row[k] != 0 && below[k] != 0);
            eroded[y * w + x] = u8::from(all_set);
        }
    }

    BinaryMask::from_parts(width, height, eroded)
}

/// Boundary pixels of `mask`: set in `mask` but removed by [`erode`].
///
/// The result is always a subset of `mask`.
#[must_use = "returns the edge mask"]
pub fn edge_of(mask: &BinaryMask) -> BinaryMask {
    let eroded = erode(mask);
    let data = mask
        .data()
        .iter()
        .zip(eroded.data())
        .map(|(&m, &e)| m & !e & 1)
        .collect();
    BinaryMask::from_parts(mask.width(), mask.height(), data)
}
