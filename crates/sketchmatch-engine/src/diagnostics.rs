//! Judging diagnostics: timing, guard decisions and per-angle metrics.
//!
//! These diagnostics are permanent instrumentation for tuning the
//! thresholds and override table. [`Judge::judge_with_diagnostics`]
//! collects them alongside the score.
//!
//! Time is read through the [`Clock`] trait so tests can supply a fake
//! clock. [`SystemClock`] uses the `web-time` crate, which maps to
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.
//!
//! [`Judge::judge_with_diagnostics`]: crate::Judge::judge_with_diagnostics

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::overrides::ScoringParams;
use crate::types::Candidate;

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock [`Clock`] backed by `web_time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: web_time::Instant,
}

impl SystemClock {
    /// A clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Same as [`duration_serde`] for optional durations.
mod option_duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        duration.map(|d| d.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    serde::de::Error::custom(
                        "duration seconds must be finite, non-negative, and representable as a Duration",
                    )
                })
            })
            .transpose()
    }
}

/// What happened to one candidate rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateOutcome {
    /// The rotated drawing had too few edge pixels and was not scored.
    Skipped {
        /// Rotation in degrees.
        angle: f32,
        /// Edge pixels found at this rotation.
        edge_pixels: u64,
    },
    /// The rotation was matched and scored.
    Scored(Candidate),
}

impl CandidateOutcome {
    /// Rotation this outcome belongs to.
    #[must_use]
    pub const fn angle(&self) -> f32 {
        match self {
            Self::Skipped { angle, .. } => *angle,
            Self::Scored(c) => c.angle,
        }
    }

    /// The scored candidate, if the angle was not skipped.
    #[must_use]
    pub const fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Skipped { .. } => None,
            Self::Scored(c) => Some(c),
        }
    }
}

/// Terminal state of a judging call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    /// Quick-ink check failed: the canvas is essentially blank.
    NoInk {
        /// Near-white-threshold ink pixels found.
        ink_pixels: u64,
        /// Required minimum.
        floor: u64,
    },
    /// Unrotated drawing has too short an outline.
    NoEdge {
        /// Edge pixels found.
        edge_pixels: u64,
        /// Required minimum.
        floor: u64,
    },
    /// Every rotation was skipped by the per-angle floor.
    AllSkipped,
    /// The best rotation still scored zero.
    ZeroScore,
    /// The winning rotation's fill ratio was under the acceptance ratio.
    RatioBelowMinimum {
        /// Winning fill ratio.
        ratio: f64,
        /// Region's acceptance ratio.
        min_accept_ratio: f64,
    },
    /// The drawing was scored.
    Accepted {
        /// Winning rotation in degrees.
        angle: f32,
        /// Final score.
        score: u8,
    },
}

impl Verdict {
    /// Whether this verdict produced a zero-score rejection.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Accepted { .. })
    }
}

/// Diagnostics collected from a single judging call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeDiagnostics {
    /// Region identifier as passed by the caller.
    pub region_id: String,
    /// Size of the encoded drawing in bytes.
    pub input_bytes: usize,
    /// Decoded drawing width in pixels.
    pub image_width: u32,
    /// Decoded drawing height in pixels.
    pub image_height: u32,
    /// Scoring parameters after applying the region override.
    pub params: ScoringParams,
    /// Reference fill pixel count.
    pub reference_fill_pixels: u64,
    /// Reference edge pixel count.
    pub reference_edge_pixels: u64,
    /// Stage 0: decoding the drawing.
    #[serde(with = "duration_serde")]
    pub decode: Duration,
    /// Stage 1: loading and preparing the reference. `None` when the
    /// caller supplied a prepared reference.
    #[serde(with = "option_duration_serde")]
    pub reference: Option<Duration>,
    /// Stage 2: quick-ink guard.
    #[serde(with = "duration_serde")]
    pub quick_ink: Duration,
    /// Ink pixels seen by the quick-ink guard.
    pub quick_ink_pixels: u64,
    /// Stage 3: minimum-edge guard. `None` if the quick-ink guard
    /// rejected the drawing.
    #[serde(with = "option_duration_serde")]
    pub min_edge: Option<Duration>,
    /// Edge pixels of the unrotated drawing, if measured.
    pub base_edge_pixels: Option<u64>,
    /// Stage 4: rotation search. `None` if a guard rejected first.
    #[serde(with = "option_duration_serde")]
    pub search: Option<Duration>,
    /// One entry per angle tried, in search order.
    pub candidates: Vec<CandidateOutcome>,
    /// How the call ended.
    pub verdict: Verdict,
    /// Total wall-clock duration of the call.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl JudgeDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Judge Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Region: {}  |  Drawing: {}x{} ({} bytes)",
            self.region_id, self.image_width, self.image_height, self.input_bytes,
        ));
        lines.push(format!(
            "Reference: fill={} edge={}",
            self.reference_fill_pixels, self.reference_edge_pixels,
        ));
        lines.push(format!(
            "Params: tol={:.1}px ramp={:.2}+{:.2} accept>={:.3} x{:.2} min_edge={}",
            self.params.tolerance_px,
            self.params.length_ramp_start,
            self.params.length_ramp_width,
            self.params.min_accept_ratio,
            self.params.score_multiplier,
            self.params.min_user_edge_pixels,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let mut stages = vec![(
            "Decode",
            self.decode,
            format!("{}x{}", self.image_width, self.image_height),
        )];
        if let Some(d) = self.reference {
            stages.push(("Reference", d, format!("fill={}", self.reference_fill_pixels)));
        }
        stages.push((
            "Quick Ink",
            self.quick_ink,
            format!("ink={}", self.quick_ink_pixels),
        ));
        if let Some(d) = self.min_edge {
            let edges = self
                .base_edge_pixels
                .map_or_else(|| "-".to_string(), |e| e.to_string());
            stages.push(("Min Edge", d, format!("edges={edges}")));
        }
        if let Some(d) = self.search {
            stages.push((
                "Rotation Search",
                d,
                format!("{} angles", self.candidates.len()),
            ));
        }

        for (name, duration, details) in &stages {
            let ms = duration_ms(*duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        if !self.candidates.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "{:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>5}",
                "Angle", "Prec", "Recall", "IoU", "Ratio", "Edges", "Score"
            ));
            for outcome in &self.candidates {
                lines.push(format_outcome(outcome));
            }
        }

        lines.push(String::new());
        lines.push(format!("Verdict: {}", format_verdict(&self.verdict)));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_outcome(outcome: &CandidateOutcome) -> String {
    match outcome {
        CandidateOutcome::Skipped { angle, edge_pixels } => {
            format!("{angle:>7.1} {:>31} {edge_pixels:>7} {:>5}", "skipped", "-")
        }
        CandidateOutcome::Scored(c) => format!(
            "{:>7.1} {:>7.3} {:>7.3} {:>7.3} {:>7.3} {:>7} {:>5}",
            c.angle, c.precision, c.recall, c.iou, c.ratio, c.edge_pixels, c.score,
        ),
    }
}

fn format_verdict(verdict: &Verdict) -> String {
    match verdict {
        Verdict::NoInk { ink_pixels, floor } => {
            format!("rejected, quick ink {ink_pixels} < {floor}")
        }
        Verdict::NoEdge { edge_pixels, floor } => {
            format!("rejected, edge pixels {edge_pixels} < {floor}")
        }
        Verdict::AllSkipped => "rejected, every angle under the edge floor".to_string(),
        Verdict::ZeroScore => "rejected, best angle scored 0".to_string(),
        Verdict::RatioBelowMinimum {
            ratio,
            min_accept_ratio,
        } => format!("rejected, ratio {ratio:.4} < {min_accept_ratio:.4}"),
        Verdict::Accepted { angle, score } => format!("accepted at {angle:+.0} deg, score {score}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::JudgeConfig;

    fn sample() -> JudgeDiagnostics {
        JudgeDiagnostics {
            region_id: "Colorado".to_string(),
            input_bytes: 2048,
            image_width: 300,
            image_height: 200,
            params: ScoringParams::from_config(&JudgeConfig::default()),
            reference_fill_pixels: 90_000,
            reference_edge_pixels: 1_400,
            decode: Duration::from_millis(2),
            reference: Some(Duration::from_millis(5)),
            quick_ink: Duration::from_millis(3),
            quick_ink_pixels: 80_000,
            min_edge: Some(Duration::from_millis(1)),
            base_edge_pixels: Some(1_300),
            search: Some(Duration::from_millis(40)),
            candidates: vec![
                CandidateOutcome::Skipped {
                    angle: -10.0,
                    edge_pixels: 4,
                },
                CandidateOutcome::Scored(Candidate {
                    angle: 0.0,
                    precision: 0.91,
                    recall: 0.88,
                    iou: 0.8,
                    ratio: 0.95,
                    edge_pixels: 1_300,
                    score: 87,
                }),
            ],
            verdict: Verdict::Accepted {
                angle: 0.0,
                score: 87,
            },
            total_duration: Duration::from_millis(51),
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn report_lists_stages_candidates_and_verdict() {
        let report = sample().report();
        assert!(report.contains("Judge Diagnostics Report"));
        assert!(report.contains("Rotation Search"));
        assert!(report.contains("skipped"));
        assert!(report.contains("0.910"));
        assert!(report.contains("accepted at +0 deg, score 87"));
    }

    #[test]
    fn report_omits_stages_that_did_not_run() {
        let diag = JudgeDiagnostics {
            reference: None,
            min_edge: None,
            base_edge_pixels: None,
            search: None,
            candidates: vec![],
            verdict: Verdict::NoInk {
                ink_pixels: 3,
                floor: 10,
            },
            ..sample()
        };
        let report = diag.report();
        assert!(!report.contains("Reference "));
        assert!(!report.contains("Rotation Search"));
        assert!(report.contains("quick ink 3 < 10"));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["decode"].as_f64().unwrap() - 0.002).abs() < 1e-9);
        assert!((json["reference"].as_f64().unwrap() - 0.005).abs() < 1e-9);
        let back: JudgeDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_duration, Duration::from_millis(51));
        assert_eq!(back.verdict, sample().verdict);
    }

    #[test]
    fn missing_optional_duration_round_trips() {
        let diag = JudgeDiagnostics {
            search: None,
            ..sample()
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json["search"].is_null());
        let back: JudgeDiagnostics = serde_json::from_value(json).unwrap();
        assert!(back.search.is_none());
    }

    #[test]
    fn outcome_accessors() {
        let diag = sample();
        assert!(diag.candidates[0].candidate().is_none());
        assert!((diag.candidates[0].angle() + 10.0).abs() < f32::EPSILON);
        assert_eq!(diag.candidates[1].candidate().unwrap().score, 87);
        assert!(!diag.verdict.is_rejection());
        assert!(Verdict::ZeroScore.is_rejection());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
