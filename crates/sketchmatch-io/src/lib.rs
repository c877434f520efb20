//! sketchmatch-io: Filesystem outline store and mask export.
//!
//! Supplies reference outlines to the engine from a directory of
//! `<slug>.png` files and encodes intermediate masks as PNG for
//! inspection.

pub mod outline_dir;
pub mod raster;

pub use outline_dir::OutlineDir;
pub use raster::{RasterError, encode_mask_png, encode_overlay_png, write_mask_png};
