//! Reference outlines stored as PNG files in one directory.

use std::path::{Path, PathBuf};

use sketchmatch_engine::{EngineError, OutlineSource, asset_file_name};

/// A directory holding one `<slug>.png` outline per region.
///
/// `"New York"` resolves to `<root>/new-york.png`.
#[derive(Debug, Clone)]
pub struct OutlineDir {
    root: PathBuf,
}

impl OutlineDir {
    /// Outlines under `root`. The directory is not checked until an
    /// outline is loaded.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the outlines are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the outline for `region_id` is expected at.
    #[must_use]
    pub fn path_for(&self, region_id: &str) -> PathBuf {
        self.root.join(asset_file_name(region_id))
    }
}

impl OutlineSource for OutlineDir {
    fn load_outline(&self, region_id: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.path_for(region_id);
        log::debug!("loading outline for {region_id:?} from {}", path.display());
        std::fs::read(&path).map_err(|e| EngineError::ReferenceUnavailable {
            region: region_id.to_string(),
            source: Box::new(std::io::Error::new(
                e.kind(),
                format!("{}: {e}", path.display()),
            )),
        })
    }
}
