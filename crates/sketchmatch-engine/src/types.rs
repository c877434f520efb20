//! Shared types for the sketchmatch scoring engine.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference decoded
/// drawings without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` so downstream crates can export masks without
/// depending on `image` directly.
pub use image::GrayImage;

/// Configuration for a judging run.
///
/// All parameters have defaults matching the tuned game behavior. The
/// per-region [`RegionOverrides`](crate::RegionOverrides) table is
/// layered on top of the scoring defaults at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Side length of the square working canvas in pixels.
    pub canvas_size: u32,

    /// Fraction of the canvas left empty on each side when fitting an
    /// image (0.05 = 5 % margin).
    pub margin_fraction: f32,

    /// Candidate rotations tried by the search, in degrees. Ties are
    /// broken in favor of the earlier entry.
    pub angles: Vec<f32>,

    /// Luminance below which a user pixel counts as ink.
    pub draw_threshold: u8,

    /// Luminance below which a reference outline pixel counts as ink.
    /// Stricter than [`draw_threshold`](Self::draw_threshold) so only the
    /// drawn boundary line is picked up.
    pub outline_threshold: u8,

    /// Lenient "anything not near-white" threshold used by the quick
    /// blank-drawing check.
    pub quick_ink_threshold: u8,

    /// Distance in pixels at which two edges are considered matching.
    pub tolerance_px: f32,

    /// Absolute minimum ink / edge pixel count for a drawing to be judged.
    pub min_ink_pixels: u32,

    /// Minimum ink / edge pixel count as a fraction of the canvas side
    /// length. The effective floor is the larger of this and
    /// [`min_ink_pixels`](Self::min_ink_pixels).
    pub min_ink_fraction: f64,

    /// Fill ratio at which the length penalty starts ramping up.
    pub length_ramp_start: f64,

    /// Width of the length-penalty ramp (ratio span mapped onto 0..1).
    pub length_ramp_width: f64,

    /// Fill ratio below which the winning candidate is rejected.
    pub min_accept_ratio: f64,
}

impl JudgeConfig {
    /// Default working canvas size.
    pub const DEFAULT_CANVAS_SIZE: u32 = 512;
    /// Default margin fraction.
    pub const DEFAULT_MARGIN_FRACTION: f32 = 0.05;
    /// Default candidate angles.
    pub const DEFAULT_ANGLES: [f32; 7] = [-10.0, -6.0, -3.0, 0.0, 3.0, 6.0, 10.0];
    /// Default user ink threshold.
    pub const DEFAULT_DRAW_THRESHOLD: u8 = 170;
    /// Default outline stroke threshold.
    pub const DEFAULT_OUTLINE_THRESHOLD: u8 = 110;
    /// Default quick-check threshold.
    pub const DEFAULT_QUICK_INK_THRESHOLD: u8 = 250;
    /// Default edge matching tolerance.
    pub const DEFAULT_TOLERANCE_PX: f32 = 3.0;
    /// Default absolute ink floor.
    pub const DEFAULT_MIN_INK_PIXELS: u32 = 10;
    /// Default ink floor as a fraction of the canvas side length.
    pub const DEFAULT_MIN_INK_FRACTION: f64 = 0.005;
    /// Default length ramp start.
    pub const DEFAULT_LENGTH_RAMP_START: f64 = 0.06;
    /// Default length ramp width.
    pub const DEFAULT_LENGTH_RAMP_WIDTH: f64 = 0.55;
    /// Default minimum accepted fill ratio.
    pub const DEFAULT_MIN_ACCEPT_RATIO: f64 = 0.001;

    /// Ink floor in pixels:
    /// `max(min_ink_pixels, round(min_ink_fraction * canvas_size))`.
    ///
    /// The fraction scales with the canvas side, not its area, so the
    /// floor stays far below the perimeter of any plausible outline.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn ink_floor(&self) -> u64 {
        let fractional = (f64::from(self.canvas_size) * self.min_ink_fraction)
            .round()
            .max(0.0) as u64;
        u64::from(self.min_ink_pixels).max(fractional)
    }

    /// Check the configuration for values that would make judging
    /// meaningless or divide by zero.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.canvas_size < 3 {
            return Err(EngineError::InvalidConfig(format!(
                "canvas_size must be at least 3, got {}",
                self.canvas_size
            )));
        }
        if !(0.0..0.5).contains(&self.margin_fraction) {
            return Err(EngineError::InvalidConfig(format!(
                "margin_fraction must be in [0, 0.5), got {}",
                self.margin_fraction
            )));
        }
        if self.angles.is_empty() {
            return Err(EngineError::InvalidConfig(
                "angles must contain at least one rotation".to_string(),
            ));
        }
        if let Some(bad) = self.angles.iter().find(|a| !a.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "angles must be finite, got {bad}"
            )));
        }
        if !self.tolerance_px.is_finite() || self.tolerance_px < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "tolerance_px must be finite and non-negative, got {}",
                self.tolerance_px
            )));
        }
        if !(self.length_ramp_width > 0.0 && self.length_ramp_width.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "length_ramp_width must be positive, got {}",
                self.length_ramp_width
            )));
        }
        if !(0.0..=1.0).contains(&self.min_ink_fraction) {
            return Err(EngineError::InvalidConfig(format!(
                "min_ink_fraction must be in [0, 1], got {}",
                self.min_ink_fraction
            )));
        }
        Ok(())
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            canvas_size: Self::DEFAULT_CANVAS_SIZE,
            margin_fraction: Self::DEFAULT_MARGIN_FRACTION,
            angles: Self::DEFAULT_ANGLES.to_vec(),
            draw_threshold: Self::DEFAULT_DRAW_THRESHOLD,
            outline_threshold: Self::DEFAULT_OUTLINE_THRESHOLD,
            quick_ink_threshold: Self::DEFAULT_QUICK_INK_THRESHOLD,
            tolerance_px: Self::DEFAULT_TOLERANCE_PX,
            min_ink_pixels: Self::DEFAULT_MIN_INK_PIXELS,
            min_ink_fraction: Self::DEFAULT_MIN_INK_FRACTION,
            length_ramp_start: Self::DEFAULT_LENGTH_RAMP_START,
            length_ramp_width: Self::DEFAULT_LENGTH_RAMP_WIDTH,
            min_accept_ratio: Self::DEFAULT_MIN_ACCEPT_RATIO,
        }
    }
}

/// One rotation trial of the search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Rotation applied to the drawing, in degrees.
    pub angle: f32,
    /// Fraction of user edge pixels near the reference edge.
    pub precision: f64,
    /// Fraction of reference edge pixels near the user edge.
    pub recall: f64,
    /// Intersection-over-union of the fill masks.
    pub iou: f64,
    /// User fill count over reference fill count.
    pub ratio: f64,
    /// Edge pixel count of the rotated drawing.
    pub edge_pixels: u64,
    /// Final score for this angle (0–100).
    pub score: u8,
}

/// The engine's output for one judged drawing.
///
/// Rejected drawings (blank, near-blank) are still a `ScoreResult`, with
/// score 0 and an explanatory critique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Final score, 0–100.
    pub score: u8,
    /// User-facing explanation of the score.
    pub critique: String,
    /// Fraction of the drawn edge lying near the reference edge.
    pub precision: f64,
    /// Fraction of the reference edge covered by the drawing.
    pub recall: f64,
    /// User fill pixel count over reference fill pixel count. Not
    /// clamped: drawing more ink than the reference yields values > 1.
    pub ratio: f64,
}

impl ScoreResult {
    /// Construct a zero-score rejection.
    #[must_use]
    pub fn rejected(critique: &str, precision: f64, recall: f64, ratio: f64) -> Self {
        Self {
            score: 0,
            critique: critique.to_string(),
            precision,
            recall,
            ratio,
        }
    }

    /// Whether the drawing was rejected by one of the guards (or simply
    /// scored nothing).
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        self.score == 0
    }
}

/// Errors that can occur while judging a drawing.
///
/// A blank or near-blank drawing is *not* an error; it produces a
/// zero-score [`ScoreResult`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The decoded image has degenerate geometry.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Judge configuration is invalid.
    #[error("invalid judge configuration: {0}")]
    InvalidConfig(String),

    /// The reference outline for a region could not be loaded.
    #[error("reference outline for {region:?} is unavailable")]
    ReferenceUnavailable {
        /// Region identifier as passed by the caller.
        region: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The reference outline decoded to a canvas with no ink at all.
    #[error("reference outline for {0:?} contains no ink")]
    EmptyReference(String),

    /// Two masks that must share a canvas have different sizes.
    #[error("mask size mismatch: {left:?} vs {right:?}")]
    MaskSizeMismatch {
        /// `(width, height)` of the first mask.
        left: (u32, u32),
        /// `(width, height)` of the second mask.
        right: (u32, u32),
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn judge_config_defaults() {
        let config = JudgeConfig::default();
        assert_eq!(config.canvas_size, 512);
        assert_eq!(config.angles, vec![-10.0, -6.0, -3.0, 0.0, 3.0, 6.0, 10.0]);
        assert_eq!(config.draw_threshold, 170);
        assert_eq!(config.outline_threshold, 110);
        assert_eq!(config.quick_ink_threshold, 250);
        assert!((config.tolerance_px - 3.0).abs() < f32::EPSILON);
        assert!((config.length_ramp_start - 0.06).abs() < f64::EPSILON);
        assert!((config.length_ramp_width - 0.55).abs() < f64::EPSILON);
        assert!((config.min_accept_ratio - 0.001).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ink_floor_defaults_to_absolute_minimum() {
        // 0.5 % of 512 = 2.56, absolute minimum wins.
        assert_eq!(JudgeConfig::default().ink_floor(), 10);
    }

    #[test]
    fn ink_floor_scales_with_canvas_side() {
        let config = JudgeConfig {
            canvas_size: 4096,
            ..JudgeConfig::default()
        };
        // 0.5 % of 4096 = 20.48
        assert_eq!(config.ink_floor(), 20);
    }

    #[test]
    fn validate_rejects_empty_angles() {
        let config = JudgeConfig {
            angles: vec![],
            ..JudgeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_tiny_canvas() {
        let config = JudgeConfig {
            canvas_size: 0,
            ..JudgeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_negative_tolerance() {
        let config = JudgeConfig {
            tolerance_px: -1.0,
            ..JudgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_half_margin() {
        let config = JudgeConfig {
            margin_fraction: 0.5,
            ..JudgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: JudgeConfig = serde_json::from_str(r#"{"canvas_size": 256}"#).unwrap();
        assert_eq!(config.canvas_size, 256);
        assert_eq!(config.draw_threshold, JudgeConfig::DEFAULT_DRAW_THRESHOLD);
    }

    #[test]
    fn rejected_result_is_zero() {
        let result = ScoreResult::rejected("nope", 0.0, 0.0, 0.25);
        assert!(result.is_rejected());
        assert_eq!(result.critique, "nope");
        assert!((result.ratio - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn error_empty_input_display() {
        assert_eq!(
            EngineError::EmptyInput.to_string(),
            "input image data is empty"
        );
    }

    #[test]
    fn error_reference_unavailable_keeps_source() {
        let err = EngineError::ReferenceUnavailable {
            region: "Atlantis".to_string(),
            source: "no such file".into(),
        };
        assert_eq!(
            err.to_string(),
            "reference outline for \"Atlantis\" is unavailable"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn score_result_serde_round_trip() {
        let result = ScoreResult {
            score: 87,
            critique: "Matched 90% of the outline".to_string(),
            precision: 0.8,
            recall: 0.9,
            ratio: 1.1,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: ScoreResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
