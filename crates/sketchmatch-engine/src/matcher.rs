//! Edge and area agreement between a drawing and a reference.
//!
//! Edges are compared symmetrically through distance fields: each user
//! edge pixel is tested against the reference's field (precision) and
//! each reference edge pixel against the user's field (recall). Fill
//! masks are compared by intersection-over-union.

use serde::{Deserialize, Serialize};

use crate::distance::{DistanceField, distance_transform};
use crate::mask::BinaryMask;
use crate::types::EngineError;

/// Precision and recall of one edge comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeMatch {
    /// Fraction of user edge pixels within tolerance of the reference
    /// edge.
    pub precision: f64,
    /// Fraction of reference edge pixels within tolerance of the user
    /// edge.
    pub recall: f64,
}

/// Compare two edge masks within `tolerance_px`.
///
/// A pixel counts as matched when its distance to the other mask's
/// nearest edge pixel is at most `tolerance_px`. Precision is 0 when the
/// user edge is empty; recall is 0 when the reference edge is empty.
///
/// # Errors
///
/// Returns [`EngineError::MaskSizeMismatch`] if the masks differ in
/// size.
pub fn match_edges(
    user_edge: &BinaryMask,
    ref_edge: &BinaryMask,
    tolerance_px: f32,
) -> Result<EdgeMatch, EngineError> {
    user_edge.ensure_same_size(ref_edge)?;
    match_edges_against(user_edge, ref_edge, &distance_transform(ref_edge), tolerance_px)
}

/// Like [`match_edges`], with the reference's distance field already
/// computed. The field must be `distance_transform(ref_edge)`.
///
/// # Errors
///
/// Returns [`EngineError::MaskSizeMismatch`] if the masks or the field
/// differ in size.
pub fn match_edges_against(
    user_edge: &BinaryMask,
    ref_edge: &BinaryMask,
    ref_field: &DistanceField,
    tolerance_px: f32,
) -> Result<EdgeMatch, EngineError> {
    user_edge.ensure_same_size(ref_edge)?;
    let field_size = (ref_field.width(), ref_field.height());
    if field_size != user_edge.dimensions() {
        return Err(EngineError::MaskSizeMismatch {
            left: user_edge.dimensions(),
            right: field_size,
        });
    }

    let user_field = distance_transform(user_edge);
    Ok(EdgeMatch {
        precision: fraction_within(user_edge, ref_field, tolerance_px),
        recall: fraction_within(ref_edge, &user_field, tolerance_px),
    })
}

/// Intersection-over-union of two fill masks, 0 when both are empty.
///
/// # Errors
///
/// Returns [`EngineError::MaskSizeMismatch`] if the masks differ in
/// size.
#[allow(clippy::cast_precision_loss)]
pub fn iou(user_fill: &BinaryMask, ref_fill: &BinaryMask) -> Result<f64, EngineError> {
    let intersection = user_fill.intersection_count(ref_fill)?;
    let union = user_fill.count() + ref_fill.count() - intersection;
    if union == 0 {
        return Ok(0.0);
    }
    Ok(intersection as f64 / union as f64)
}

/// Fraction of set pixels in `mask` whose distance in `field` is within
/// `tolerance_px`. Callers guarantee matching dimensions.
#[allow(clippy::cast_precision_loss)]
fn fraction_within(mask: &BinaryMask, field: &DistanceField, tolerance_px: f32) -> f64 {
    let (total, hits) = mask
        .data()
        .iter()
        .zip(field.values())
        .filter(|&(&m, _)| m != 0)
        .fold((0u64, 0u64), |(total, hits), (_, &d)| {
            (total + 1, hits + u64::from(d <= tolerance_px))
        });
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
