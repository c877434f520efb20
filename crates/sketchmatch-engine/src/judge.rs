//! The judging entry point: guards plus a coarse rotation search.
//!
//! A call moves through a fixed sequence of states:
//!
//! ```text
//! quick ink -> min edge -> rotation search -> final ratio -> accept
//!     |            |              |                |
//!     +------------+--------------+----------------+--> reject (score 0)
//! ```
//!
//! Every rejection is an `Ok` [`ScoreResult`] with score 0. Only
//! undecodable input, a missing or empty reference, or a bad
//! configuration surface as [`EngineError`].

use log::debug;

use crate::decode::decode_rgba;
use crate::diagnostics::{CandidateOutcome, Clock, JudgeDiagnostics, SystemClock, Verdict};
use crate::mask::BinaryMask;
use crate::matcher::{iou, match_edges_against};
use crate::morphology::edge_of;
use crate::overrides::{RegionOverrides, ScoringParams};
use crate::rasterize::rasterize;
use crate::reference::{OutlineSource, ReferenceShape};
use crate::scorer::{self, CRITIQUE_NO_EDGE, CRITIQUE_NO_INK, Metrics};
use crate::types::{Candidate, EngineError, JudgeConfig, RgbaImage, ScoreResult};

/// Scores drawings against reference outlines.
///
/// Holds the configuration and the override table; both are read-only
/// after construction, so a `Judge` can be shared across threads and
/// used for concurrent calls.
#[derive(Debug, Clone)]
pub struct Judge {
    config: JudgeConfig,
    overrides: RegionOverrides,
}

impl Default for Judge {
    /// Default configuration with the built-in override table.
    fn default() -> Self {
        Self {
            config: JudgeConfig::default(),
            overrides: RegionOverrides::builtin(),
        }
    }
}

impl Judge {
    /// Build a judge after validating `config` and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if either is unusable.
    pub fn new(config: JudgeConfig, overrides: RegionOverrides) -> Result<Self, EngineError> {
        config.validate()?;
        overrides.validate()?;
        Ok(Self { config, overrides })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// The override table in use.
    #[must_use]
    pub const fn overrides(&self) -> &RegionOverrides {
        &self.overrides
    }

    /// Load and prepare the reference outline for `region_id`.
    ///
    /// # Errors
    ///
    /// See [`ReferenceShape::load`].
    pub fn prepare_reference(
        &self,
        source: &impl OutlineSource,
        region_id: &str,
    ) -> Result<ReferenceShape, EngineError> {
        ReferenceShape::load(source, region_id, &self.config)
    }

    /// Score `drawing` (encoded image bytes) against the outline for
    /// `region_id` loaded from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the drawing cannot be decoded, the
    /// reference is missing or empty.
    pub fn judge(
        &self,
        drawing: &[u8],
        region_id: &str,
        source: &impl OutlineSource,
    ) -> Result<ScoreResult, EngineError> {
        self.judge_with_diagnostics(drawing, region_id, source, &SystemClock::new())
            .map(|(result, _)| result)
    }

    /// Score `drawing` against an already prepared reference.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the drawing cannot be decoded or the
    /// reference was prepared for a different canvas size.
    pub fn judge_prepared(
        &self,
        drawing: &[u8],
        reference: &ReferenceShape,
    ) -> Result<ScoreResult, EngineError> {
        self.judge_prepared_with_diagnostics(drawing, reference, &SystemClock::new())
            .map(|(result, _)| result)
    }

    /// Like [`judge`](Self::judge), also returning diagnostics timed
    /// with `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`judge`](Self::judge).
    pub fn judge_with_diagnostics(
        &self,
        drawing: &[u8],
        region_id: &str,
        source: &impl OutlineSource,
        clock: &impl Clock,
    ) -> Result<(ScoreResult, JudgeDiagnostics), EngineError> {
        let start = clock.now();
        let image = decode_rgba(drawing)?;
        let decoded = clock.now();
        let reference = ReferenceShape::load(source, region_id, &self.config)?;
        let prepared = clock.now();

        let mut run = Run::new(self, drawing.len(), &image, &reference);
        run.diag.decode = decoded.saturating_sub(start);
        run.diag.reference = Some(prepared.saturating_sub(decoded));
        let result = run.execute(&image, clock)?;
        run.diag.total_duration = clock.now().saturating_sub(start);
        Ok((result, run.diag))
    }

    /// Like [`judge_prepared`](Self::judge_prepared), also returning
    /// diagnostics timed with `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`judge_prepared`](Self::judge_prepared).
    pub fn judge_prepared_with_diagnostics(
        &self,
        drawing: &[u8],
        reference: &ReferenceShape,
        clock: &impl Clock,
    ) -> Result<(ScoreResult, JudgeDiagnostics), EngineError> {
        if reference.canvas_size() != self.config.canvas_size {
            let size = reference.canvas_size();
            return Err(EngineError::MaskSizeMismatch {
                left: (self.config.canvas_size, self.config.canvas_size),
                right: (size, size),
            });
        }

        let start = clock.now();
        let image = decode_rgba(drawing)?;
        let decoded = clock.now();

        let mut run = Run::new(self, drawing.len(), &image, reference);
        run.diag.decode = decoded.saturating_sub(start);
        let result = run.execute(&image, clock)?;
        run.diag.total_duration = clock.now().saturating_sub(start);
        Ok((result, run.diag))
    }
}

/// State for one judging call.
struct Run<'a> {
    config: &'a JudgeConfig,
    reference: &'a ReferenceShape,
    params: ScoringParams,
    diag: JudgeDiagnostics,
}

/// Best candidate seen so far during the rotation search.
struct Best {
    metrics: Metrics,
    score: u8,
    ratio: f64,
}

impl Best {
    /// Whether a later candidate should replace this one. Only a
    /// strictly higher score does, so ties keep the earlier angle.
    const fn beaten_by(&self, score: u8) -> bool {
        score > self.score
    }
}

impl<'a> Run<'a> {
    fn new(
        judge: &'a Judge,
        input_bytes: usize,
        image: &RgbaImage,
        reference: &'a ReferenceShape,
    ) -> Self {
        let region_id = reference.region_id();
        let params = judge.overrides.resolve(region_id, &judge.config);
        Self {
            config: &judge.config,
            reference,
            params,
            diag: JudgeDiagnostics {
                region_id: region_id.to_string(),
                input_bytes,
                image_width: image.width(),
                image_height: image.height(),
                params,
                reference_fill_pixels: reference.fill_count(),
                reference_edge_pixels: reference.edge_count(),
                decode: std::time::Duration::ZERO,
                reference: None,
                quick_ink: std::time::Duration::ZERO,
                quick_ink_pixels: 0,
                min_edge: None,
                base_edge_pixels: None,
                search: None,
                candidates: Vec::new(),
                verdict: Verdict::ZeroScore,
                total_duration: std::time::Duration::ZERO,
            },
        }
    }

    fn execute(
        &mut self,
        image: &RgbaImage,
        clock: &impl Clock,
    ) -> Result<ScoreResult, EngineError> {
        let config = self.config;
        let region = self.reference.region_id().to_string();

        // Quick ink: anything not near-white, unrotated.
        let t = clock.now();
        let upright = rasterize(image, config.canvas_size, config.margin_fraction, 0.0)?;
        let ink = BinaryMask::from_canvas(&upright, config.quick_ink_threshold).count();
        let ink_floor = config.ink_floor();
        self.diag.quick_ink = clock.now().saturating_sub(t);
        self.diag.quick_ink_pixels = ink;
        if ink < ink_floor {
            debug!("{region}: quick ink {ink} < {ink_floor}, rejecting");
            self.diag.verdict = Verdict::NoInk {
                ink_pixels: ink,
                floor: ink_floor,
            };
            return Ok(ScoreResult::rejected(CRITIQUE_NO_INK, 0.0, 0.0, 0.0));
        }

        // Minimum edge at the real drawing threshold, unrotated.
        let t = clock.now();
        let upright_fill = BinaryMask::from_canvas(&upright, config.draw_threshold);
        let upright_edges = edge_of(&upright_fill).count();
        let edge_floor = self.params.min_user_edge_pixels;
        self.diag.min_edge = Some(clock.now().saturating_sub(t));
        self.diag.base_edge_pixels = Some(upright_edges);
        if upright_edges < edge_floor {
            let ratio = scorer::mask_ratio(upright_fill.count(), self.reference.fill_count());
            debug!("{region}: edge pixels {upright_edges} < {edge_floor}, rejecting");
            self.diag.verdict = Verdict::NoEdge {
                edge_pixels: upright_edges,
                floor: edge_floor,
            };
            return Ok(ScoreResult::rejected(CRITIQUE_NO_EDGE, 0.0, 0.0, ratio));
        }

        let t = clock.now();
        let best = self.search(image, &upright_fill)?;
        self.diag.search = Some(clock.now().saturating_sub(t));

        let result = scorer::finalize(
            best.as_ref().map(|b| (&b.metrics, b.score, b.ratio)),
            &self.params,
        );
        self.diag.verdict = match &best {
            None if self
                .diag
                .candidates
                .iter()
                .all(|c| c.candidate().is_none()) =>
            {
                Verdict::AllSkipped
            }
            None => Verdict::ZeroScore,
            Some(b) if b.ratio < self.params.min_accept_ratio => Verdict::RatioBelowMinimum {
                ratio: b.ratio,
                min_accept_ratio: self.params.min_accept_ratio,
            },
            Some(b) => Verdict::Accepted {
                angle: b.metrics.angle,
                score: b.score,
            },
        };
        debug!("{region}: {:?}", self.diag.verdict);
        Ok(result)
    }

    /// Try every configured angle and keep the best candidate.
    ///
    /// Returns `None` when no angle scored above 0. See [`Best::beaten_by`]
    /// for the ranking.
    fn search(
        &mut self,
        image: &RgbaImage,
        upright_fill: &BinaryMask,
    ) -> Result<Option<Best>, EngineError> {
        let config = self.config;
        let reference = self.reference;
        let mut best: Option<Best> = None;

        for &angle in &config.angles {
            let fill = if angle.abs() <= f32::EPSILON {
                upright_fill.clone()
            } else {
                let canvas = rasterize(image, config.canvas_size, config.margin_fraction, angle)?;
                BinaryMask::from_canvas(&canvas, config.draw_threshold)
            };
            let edge = edge_of(&fill);
            let edge_pixels = edge.count();

            if edge_pixels < self.params.min_user_edge_pixels {
                debug!("angle {angle:+}: {edge_pixels} edge pixels, skipped");
                self.diag.candidates.push(CandidateOutcome::Skipped {
                    angle,
                    edge_pixels,
                });
                continue;
            }

            let edges = match_edges_against(
                &edge,
                reference.edge(),
                reference.distance(),
                self.params.tolerance_px,
            )?;
            let metrics = Metrics {
                angle,
                precision: edges.precision,
                recall: edges.recall,
                iou: iou(&fill, reference.fill())?,
            };
            let user_fill = fill.count();
            let ratio = scorer::mask_ratio(user_fill, reference.fill_count());
            let score =
                scorer::score_candidate(&metrics, &self.params, user_fill, reference.fill_count());

            debug!(
                "angle {angle:+}: precision={:.3} recall={:.3} iou={:.3} ratio={ratio:.3} score={score}",
                metrics.precision, metrics.recall, metrics.iou
            );
            self.diag.candidates.push(CandidateOutcome::Scored(Candidate {
                angle,
                precision: metrics.precision,
                recall: metrics.recall,
                iou: metrics.iou,
                ratio,
                edge_pixels,
                score,
            }));

            if best.as_ref().map_or(score > 0, |b| b.beaten_by(score)) {
                best = Some(Best {
                    metrics,
                    score,
                    ratio,
                });
            }
        }

        Ok(best)
    }
}
