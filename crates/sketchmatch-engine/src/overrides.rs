//! Per-region scoring overrides.
//!
//! Some regions have geometry the generic IoU-dominant formula treats
//! unfairly (near-rectangular states in particular). A
//! [`RegionOverrides`] table lets those regions carry their own
//! tolerance, length ramp, acceptance ratio, score multiplier and ink
//! floor. Unset fields fall back to [`JudgeConfig`].
//!
//! Tables are keyed by region slug (see [`slugify`]), so `"New York"`,
//! `"new york"` and `"new-york"` all resolve to the same entry. A table
//! is immutable once built.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::reference::slugify;
use crate::types::{EngineError, JudgeConfig};

/// Optional tuning for a single region. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionOverride {
    /// Edge matching tolerance in pixels.
    pub tolerance_px: Option<f32>,
    /// Fill ratio at which the length penalty starts to ramp.
    pub length_ramp_start: Option<f64>,
    /// Width of the length-penalty ramp.
    pub length_ramp_width: Option<f64>,
    /// Fill ratio below which the winner is rejected.
    pub min_accept_ratio: Option<f64>,
    /// Multiplier applied to the raw score. May exceed 1.
    pub score_multiplier: Option<f64>,
    /// Minimum user edge pixels for the drawing to be judged.
    pub min_user_edge_pixels: Option<u64>,
}

/// Fully resolved scoring parameters for one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    /// Edge matching tolerance in pixels.
    pub tolerance_px: f32,
    /// Fill ratio at which the length penalty starts to ramp.
    pub length_ramp_start: f64,
    /// Width of the length-penalty ramp.
    pub length_ramp_width: f64,
    /// Fill ratio below which the winner is rejected.
    pub min_accept_ratio: f64,
    /// Multiplier applied to the raw score.
    pub score_multiplier: f64,
    /// Minimum user edge pixels for the drawing to be judged.
    pub min_user_edge_pixels: u64,
}

impl ScoringParams {
    /// Parameters with no region override applied.
    #[must_use]
    pub fn from_config(config: &JudgeConfig) -> Self {
        Self {
            tolerance_px: config.tolerance_px,
            length_ramp_start: config.length_ramp_start,
            length_ramp_width: config.length_ramp_width,
            min_accept_ratio: config.min_accept_ratio,
            score_multiplier: 1.0,
            min_user_edge_pixels: config.ink_floor(),
        }
    }
}

/// Immutable table of region overrides keyed by slug.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionOverrides {
    entries: HashMap<String, RegionOverride>,
}

impl RegionOverrides {
    /// An empty table: every region uses the defaults.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table shipped with the game.
    ///
    /// Colorado and Wyoming are near-perfect rectangles; they get a
    /// wider tolerance, a gentler length ramp, a stricter acceptance
    /// ratio, a 1.25x score boost and a higher ink floor.
    #[must_use]
    pub fn builtin() -> Self {
        let rectangle = RegionOverride {
            tolerance_px: Some(5.0),
            length_ramp_start: Some(0.06),
            length_ramp_width: Some(0.69),
            min_accept_ratio: Some(0.005),
            score_multiplier: Some(1.25),
            min_user_edge_pixels: Some(100),
        };
        [("Colorado", rectangle.clone()), ("Wyoming", rectangle)]
            .into_iter()
            .collect()
    }

    /// Parse a JSON object mapping region names to overrides.
    ///
    /// ```json
    /// { "Colorado": { "tolerance_px": 5.0, "score_multiplier": 1.25 } }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the JSON is malformed,
    /// names an unknown field, or carries a value that cannot be used
    /// (negative multiplier, non-positive ramp width, negative or
    /// non-finite tolerance).
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let raw: HashMap<String, RegionOverride> = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(format!("region overrides: {e}")))?;
        let table: Self = raw.into_iter().collect();
        table.validate()?;
        Ok(table)
    }

    /// Override for `region_id`, if any.
    #[must_use]
    pub fn get(&self, region_id: &str) -> Option<&RegionOverride> {
        self.entries.get(&slugify(region_id))
    }

    /// Number of regions with an override.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scoring parameters for `region_id`: the override's fields where
    /// set, `config` defaults otherwise.
    #[must_use]
    pub fn resolve(&self, region_id: &str, config: &JudgeConfig) -> ScoringParams {
        let defaults = ScoringParams::from_config(config);
        let Some(o) = self.get(region_id) else {
            return defaults;
        };
        ScoringParams {
            tolerance_px: o.tolerance_px.unwrap_or(defaults.tolerance_px),
            length_ramp_start: o.length_ramp_start.unwrap_or(defaults.length_ramp_start),
            length_ramp_width: o.length_ramp_width.unwrap_or(defaults.length_ramp_width),
            min_accept_ratio: o.min_accept_ratio.unwrap_or(defaults.min_accept_ratio),
            score_multiplier: o.score_multiplier.unwrap_or(defaults.score_multiplier),
            min_user_edge_pixels: o
                .min_user_edge_pixels
                .unwrap_or(defaults.min_user_edge_pixels),
        }
    }

    /// Check every entry for values that would break scoring.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the first bad entry.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (slug, o) in &self.entries {
            if let Some(m) = o.score_multiplier
                && !(m.is_finite() && m >= 0.0)
            {
                return Err(EngineError::InvalidConfig(format!(
                    "{slug}: score_multiplier must be non-negative, got {m}"
                )));
            }
            if let Some(w) = o.length_ramp_width
                && !(w.is_finite() && w > 0.0)
            {
                return Err(EngineError::InvalidConfig(format!(
                    "{slug}: length_ramp_width must be positive, got {w}"
                )));
            }
            if let Some(t) = o.tolerance_px
                && !(t.is_finite() && t >= 0.0)
            {
                return Err(EngineError::InvalidConfig(format!(
                    "{slug}: tolerance_px must be finite and non-negative, got {t}"
                )));
            }
        }
        Ok(())
    }
}

impl<K: AsRef<str>> FromIterator<(K, RegionOverride)> for RegionOverrides {
    fn from_iter<I: IntoIterator<Item = (K, RegionOverride)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(region, o)| (slugify(region.as_ref()), o))
                .collect(),
        }
    }
}
