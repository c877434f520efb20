//! sketchmatch-engine: Shape-matching and scoring for sketched outlines
//! (sans-IO).
//!
//! Scores a free-hand drawing of a region outline against the true
//! outline through:
//! decode -> rasterize -> threshold -> edge -> distance transform ->
//! precision/recall + IoU -> score, repeated over a small set of
//! candidate rotations.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Reference outlines come in
//! through the [`OutlineSource`] trait; a filesystem implementation
//! lives in `sketchmatch-io`.

pub mod decode;
pub mod diagnostics;
pub mod distance;
pub mod judge;
pub mod mask;
pub mod matcher;
pub mod morphology;
pub mod overrides;
pub mod rasterize;
pub mod reference;
pub mod scorer;
pub mod types;

pub use diagnostics::{CandidateOutcome, Clock, JudgeDiagnostics, SystemClock, Verdict};
pub use judge::Judge;
pub use mask::BinaryMask;
pub use overrides::{RegionOverride, RegionOverrides, ScoringParams};
pub use reference::{OutlineSource, ReferenceShape, asset_file_name, slugify};
pub use types::{Candidate, EngineError, JudgeConfig, ScoreResult};

/// Judge a drawing with the default configuration and the built-in
/// override table.
///
/// Takes the encoded drawing (PNG, JPEG, BMP, WebP) and the region it
/// is supposed to depict. The reference outline is fetched from
/// `source`.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] or [`EngineError::ImageDecode`]
/// if the drawing cannot be decoded, and
/// [`EngineError::ReferenceUnavailable`] or
/// [`EngineError::EmptyReference`] if the outline is missing or blank.
/// A blank drawing is not an error: it scores 0.
pub fn judge_drawing(
    drawing: &[u8],
    region_id: &str,
    source: &impl OutlineSource,
) -> Result<ScoreResult, EngineError> {
    Judge::default().judge(drawing, region_id, source)
}
