//! Turn match metrics into a 0–100 score and a critique.
//!
//! The formula is deliberately IoU-dominant:
//!
//! ```text
//! base    = 0.95 * iou + 0.05 * recall   (+0.1 if iou > 0.5, capped at 1)
//! ratio   = user_fill / max(1, ref_fill)
//! penalty = max(0.9, clamp((ratio - ramp_start) / ramp_width, 0, 1))
//! raw     = round(100 * base * penalty)
//! final   = min(100, round(raw * multiplier))
//! ```
//!
//! The length penalty floor of 0.9 means only genuinely sparse drawings
//! lose more than a tenth of their score to it.

use serde::{Deserialize, Serialize};

use crate::overrides::{RegionOverrides, ScoringParams};
use crate::types::{JudgeConfig, ScoreResult};

/// Critique for a drawing with almost no ink at all.
pub const CRITIQUE_NO_INK: &str =
    "We couldn't detect enough drawing. Try thicker, darker lines and trace along the edge.";

/// Critique for a drawing whose outline is too short or too sparse.
pub const CRITIQUE_NO_EDGE: &str = "We couldn't detect enough drawing near the border. \
     Try thicker, darker lines and trace along the edge.";

/// Rotations up to this many degrees count as "orientation looked good".
const ORIENTATION_SLACK_DEGREES: f32 = 3.0;

/// Weight of IoU in the base overlap. Recall gets the remainder.
const IOU_WEIGHT: f64 = 0.95;

/// IoU above which the base overlap gets [`IOU_BONUS`].
const IOU_BONUS_THRESHOLD: f64 = 0.5;

const IOU_BONUS: f64 = 0.1;

/// Floor of the length penalty.
const LENGTH_PENALTY_FLOOR: f64 = 0.9;

/// Match metrics for one rotation of the drawing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Rotation the metrics were measured at, in degrees.
    pub angle: f32,
    /// Fraction of the drawn edge near the reference edge.
    pub precision: f64,
    /// Fraction of the reference edge covered by the drawing.
    pub recall: f64,
    /// Intersection-over-union of the fill masks.
    pub iou: f64,
}

/// `user_fill / max(1, ref_fill)`. Not clamped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mask_ratio(user_fill: u64, ref_fill: u64) -> f64 {
    user_fill as f64 / ref_fill.max(1) as f64
}

/// IoU-dominant overlap with a bonus for clearly overlapping shapes.
#[must_use]
pub fn base_overlap(iou: f64, recall: f64) -> f64 {
    let base = IOU_WEIGHT.mul_add(iou, (1.0 - IOU_WEIGHT) * recall);
    if iou > IOU_BONUS_THRESHOLD {
        (base + IOU_BONUS).min(1.0)
    } else {
        base
    }
}

/// Coverage penalty in `[0.9, 1]` ramping with the fill ratio.
#[must_use]
pub fn length_penalty(ratio: f64, ramp_start: f64, ramp_width: f64) -> f64 {
    let ramp = ((ratio - ramp_start) / ramp_width).clamp(0.0, 1.0);
    ramp.max(LENGTH_PENALTY_FLOOR)
}

/// Score a single candidate before any guard is applied.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn score_candidate(
    metrics: &Metrics,
    params: &ScoringParams,
    user_fill: u64,
    ref_fill: u64,
) -> u8 {
    let ratio = mask_ratio(user_fill, ref_fill);
    let penalty = length_penalty(ratio, params.length_ramp_start, params.length_ramp_width);
    let raw = (100.0 * base_overlap(metrics.iou, metrics.recall) * penalty).round();
    let scaled = (raw * params.score_multiplier).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, 100.0) as u8
}

/// Apply the acceptance guards to the best candidate of a search and
/// build the final result.
///
/// `best` is `None` when every angle was skipped. A best candidate that
/// scored 0, or whose fill ratio is under the region's acceptance
/// ratio, is rejected with [`CRITIQUE_NO_EDGE`].
#[must_use]
pub fn finalize(best: Option<(&Metrics, u8, f64)>, params: &ScoringParams) -> ScoreResult {
    let Some((metrics, score, ratio)) = best else {
        return ScoreResult::rejected(CRITIQUE_NO_EDGE, 0.0, 0.0, 0.0);
    };
    if score == 0 || ratio < params.min_accept_ratio {
        return ScoreResult::rejected(CRITIQUE_NO_EDGE, metrics.precision, metrics.recall, ratio);
    }
    ScoreResult {
        score,
        critique: critique(metrics),
        precision: metrics.precision,
        recall: metrics.recall,
        ratio,
    }
}

/// Score one set of metrics for `region_id`.
///
/// Resolves the region's parameters from `overrides` on top of
/// `config`, scores the candidate and applies the post-search guards.
#[must_use]
pub fn score(
    metrics: &Metrics,
    region_id: &str,
    overrides: &RegionOverrides,
    config: &JudgeConfig,
    user_fill: u64,
    ref_fill: u64,
) -> ScoreResult {
    let params = overrides.resolve(region_id, config);
    let candidate = score_candidate(metrics, &params, user_fill, ref_fill);
    finalize(
        Some((metrics, candidate, mask_ratio(user_fill, ref_fill))),
        &params,
    )
}

/// User-facing explanation of an accepted score.
#[must_use]
pub fn critique(metrics: &Metrics) -> String {
    format!(
        "Matched {}% of the outline, with {}% of your strokes near the edge. {}",
        percent(metrics.recall),
        percent(metrics.precision),
        orientation_remark(metrics.angle),
    )
}

fn orientation_remark(angle: f32) -> String {
    if angle.abs() <= ORIENTATION_SLACK_DEGREES {
        "Orientation looked good.".to_string()
    } else {
        format!(
            "Your drawing was rotated by about {:.0}\u{b0}; we straightened it out.",
            angle.abs()
        )
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(fraction: f64) -> u8 {
    (100.0 * fraction).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params() -> ScoringParams {
        ScoringParams::from_config(&JudgeConfig::default())
    }

    fn metrics(iou: f64, recall: f64) -> Metrics {
        Metrics {
            angle: 0.0,
            precision: 0.9,
            recall,
            iou,
        }
    }

    #[test]
    fn base_overlap_weights_iou() {
        assert!((base_overlap(0.4, 1.0) - (0.38 + 0.05)).abs() < 1e-12);
        assert!(base_overlap(0.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn base_overlap_bonus_above_half() {
        // 0.95 * 0.6 + 0.05 * 0.5 + 0.1
        assert!((base_overlap(0.6, 0.5) - 0.695).abs() < 1e-12);
        // Exactly 0.5 gets no bonus.
        assert!((base_overlap(0.5, 0.0) - 0.475).abs() < 1e-12);
    }

    #[test]
    fn base_overlap_is_capped() {
        assert!((base_overlap(1.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!((base_overlap(0.98, 0.9) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn length_penalty_floor_and_ramp() {
        assert!((length_penalty(0.0, 0.06, 0.55) - 0.9).abs() < f64::EPSILON);
        assert!((length_penalty(0.5, 0.06, 0.55) - 0.9).abs() < f64::EPSILON);
        // (0.6 - 0.06) / 0.55 = 0.9818...
        assert!((length_penalty(0.6, 0.06, 0.55) - 0.54 / 0.55).abs() < 1e-12);
        assert!((length_penalty(3.0, 0.06, 0.55) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mask_ratio_guards_zero_reference() {
        assert!((mask_ratio(50, 0) - 50.0).abs() < f64::EPSILON);
        assert!((mask_ratio(50, 200) - 0.25).abs() < f64::EPSILON);
        assert!((mask_ratio(400, 200) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn perfect_candidate_scores_100() {
        let score = score_candidate(&metrics(1.0, 1.0), &params(), 1000, 1000);
        assert_eq!(score, 100);
    }

    #[test]
    fn candidate_formula_matches_hand_computation() {
        // base = 0.95 * 0.3 + 0.05 * 0.8 = 0.325; ratio 0.3 -> penalty 0.9
        // raw = round(29.25) = 29
        let score = score_candidate(&metrics(0.3, 0.8), &params(), 300, 1000);
        assert_eq!(score, 29);
    }

    #[test]
    fn multiplier_applies_after_rounding_and_clamps() {
        let boosted = ScoringParams {
            score_multiplier: 1.25,
            ..params()
        };
        // raw 29 * 1.25 = 36.25 -> 36
        assert_eq!(
            score_candidate(&metrics(0.3, 0.8), &boosted, 300, 1000),
            36
        );
        assert_eq!(
            score_candidate(&metrics(1.0, 1.0), &boosted, 1000, 1000),
            100
        );
    }

    #[test]
    fn finalize_without_candidate_is_rejected() {
        let result = finalize(None, &params());
        assert_eq!(result.score, 0);
        assert_eq!(result.critique, CRITIQUE_NO_EDGE);
        assert!(result.ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn finalize_zero_score_is_rejected_with_metrics() {
        let m = metrics(0.0, 0.1);
        let result = finalize(Some((&m, 0, 0.2)), &params());
        assert!(result.is_rejected());
        assert!((result.recall - 0.1).abs() < f64::EPSILON);
        assert!((result.ratio - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn finalize_applies_accept_ratio() {
        let m = metrics(0.2, 0.5);
        let strict = ScoringParams {
            min_accept_ratio: 0.3,
            ..params()
        };
        assert!(finalize(Some((&m, 20, 0.25)), &strict).is_rejected());
        assert_eq!(finalize(Some((&m, 20, 0.25)), &params()).score, 20);
    }

    #[test]
    fn critique_reports_percentages_and_orientation() {
        let m = Metrics {
            angle: 0.0,
            precision: 0.834,
            recall: 0.916,
            iou: 0.7,
        };
        assert_eq!(
            critique(&m),
            "Matched 92% of the outline, with 83% of your strokes near the edge. \
             Orientation looked good."
        );

        let tilted = Metrics { angle: -6.0, ..m };
        assert!(critique(&tilted).contains("rotated by about 6\u{b0}"));
    }

    #[test]
    fn score_consults_overrides() {
        let config = JudgeConfig::default();
        let overrides = RegionOverrides::builtin();
        let m = metrics(0.3, 0.8);
        assert_eq!(score(&m, "Ohio", &overrides, &config, 300, 1000).score, 29);
        assert_eq!(
            score(&m, "Colorado", &overrides, &config, 300, 1000).score,
            36
        );
    }

    #[test]
    fn score_rejects_sparse_ratio_per_region() {
        let config = JudgeConfig::default();
        let overrides = RegionOverrides::builtin();
        let m = metrics(0.3, 0.8);
        // Ratio 0.003: above the default 0.001, below Colorado's 0.005.
        assert!(!score(&m, "Ohio", &overrides, &config, 3, 1000).is_rejected());
        assert!(score(&m, "Colorado", &overrides, &config, 3, 1000).is_rejected());
    }
}
