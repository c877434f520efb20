//! Reference outlines: naming, loading and preparation.
//!
//! A region identifier such as `"New York"` is slugified to
//! `"new-york"` and resolved to the asset `new-york.png` by an
//! [`OutlineSource`]. The engine never touches storage itself; the
//! source is supplied by the caller (see `sketchmatch-io` for a
//! filesystem implementation).
//!
//! Preparing a reference (decode, rasterize, threshold, edge) depends
//! only on the outline bytes and the canvas settings, so callers judging
//! many drawings for the same region can hold on to a [`ReferenceShape`]
//! and skip that work.

use crate::decode::decode_rgba;
use crate::distance::{DistanceField, distance_transform};
use crate::mask::BinaryMask;
use crate::morphology::edge_of;
use crate::rasterize::rasterize;
use crate::types::{EngineError, JudgeConfig};

/// Supplies encoded reference outline images by region identifier.
pub trait OutlineSource {
    /// Encoded outline image (PNG or any format `image` decodes) for
    /// `region_id`.
    ///
    /// # Errors
    ///
    /// Implementations should return
    /// [`EngineError::ReferenceUnavailable`] when no outline exists for
    /// the region.
    fn load_outline(&self, region_id: &str) -> Result<Vec<u8>, EngineError>;
}

impl<S: OutlineSource + ?Sized> OutlineSource for &S {
    fn load_outline(&self, region_id: &str) -> Result<Vec<u8>, EngineError> {
        (**self).load_outline(region_id)
    }
}

/// Lowercase `region_id`, collapse every run of characters outside
/// `[a-z0-9]` into a single `-`, and trim leading/trailing hyphens.
///
/// ```
/// use sketchmatch_engine::slugify;
///
/// assert_eq!(slugify("New York"), "new-york");
/// assert_eq!(slugify("  Rhode   Island!! "), "rhode-island");
/// ```
#[must_use]
pub fn slugify(region_id: &str) -> String {
    let mut slug = String::with_capacity(region_id.len());
    let mut pending_hyphen = false;
    for c in region_id.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Asset file name for a region: `"<slug>.png"`.
#[must_use]
pub fn asset_file_name(region_id: &str) -> String {
    format!("{}.png", slugify(region_id))
}

/// A reference outline rendered and thresholded on the working canvas.
#[derive(Debug, Clone)]
pub struct ReferenceShape {
    region_id: String,
    canvas_size: u32,
    fill: BinaryMask,
    edge: BinaryMask,
    distance: DistanceField,
    fill_count: u64,
    edge_count: u64,
}

impl ReferenceShape {
    /// Decode and prepare an outline for `region_id`.
    ///
    /// The outline is rendered unrotated and thresholded with the strict
    /// outline threshold. The edge's distance field is computed here, once,
    /// since every candidate rotation is matched against it.
    ///
    /// # Errors
    ///
    /// Returns a decode error for unreadable bytes,
    /// [`EngineError::InvalidConfig`] for an unusable canvas and
    /// [`EngineError::EmptyReference`] when the outline has no ink.
    pub fn prepare(
        outline_bytes: &[u8],
        region_id: &str,
        config: &JudgeConfig,
    ) -> Result<Self, EngineError> {
        let image = decode_rgba(outline_bytes)?;
        let canvas = rasterize(&image, config.canvas_size, config.margin_fraction, 0.0)?;
        let fill = BinaryMask::from_canvas(&canvas, config.outline_threshold);
        let fill_count = fill.count();
        if fill_count == 0 {
            return Err(EngineError::EmptyReference(region_id.to_string()));
        }
        let edge = edge_of(&fill);
        let edge_count = edge.count();
        let distance = distance_transform(&edge);
        log::debug!(
            "prepared reference {region_id:?}: fill={fill_count} edge={edge_count} on {}px canvas",
            config.canvas_size
        );
        Ok(Self {
            region_id: region_id.to_string(),
            canvas_size: config.canvas_size,
            fill,
            edge,
            distance,
            fill_count,
            edge_count,
        })
    }

    /// Load the outline for `region_id` from `source` and prepare it.
    ///
    /// # Errors
    ///
    /// Propagates the source's error, then anything
    /// [`prepare`](Self::prepare) returns.
    pub fn load(
        source: &impl OutlineSource,
        region_id: &str,
        config: &JudgeConfig,
    ) -> Result<Self, EngineError> {
        let bytes = source.load_outline(region_id)?;
        Self::prepare(&bytes, region_id, config)
    }

    /// Region identifier this shape was prepared for.
    #[must_use]
    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    /// Canvas size the masks were rendered at.
    #[must_use]
    pub const fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// Filled outline mask.
    #[must_use]
    pub const fn fill(&self) -> &BinaryMask {
        &self.fill
    }

    /// Boundary of the fill mask.
    #[must_use]
    pub const fn edge(&self) -> &BinaryMask {
        &self.edge
    }

    /// Distance from every canvas pixel to the nearest edge pixel.
    #[must_use]
    pub const fn distance(&self) -> &DistanceField {
        &self.distance
    }

    /// Number of fill pixels. Never zero.
    #[must_use]
    pub const fn fill_count(&self) -> u64 {
        self.fill_count
    }

    /// Number of edge pixels.
    #[must_use]
    pub const fn edge_count(&self) -> u64 {
        self.edge_count
    }
}
