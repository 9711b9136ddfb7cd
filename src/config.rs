use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the region label grid comes from.
///
/// An explicit choice made by the caller; the pipeline never guesses from
/// which files happen to exist on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LabelSource {
    /// Binarize the source image and flood-fill connected components.
    FloodFill,
    /// Consume a precomputed label grid (NumPy `.npy`, row-major u32-range
    /// labels, dimensions equal to the source image).
    LabelGridFile(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Gray value at or above which a pixel counts as foreground.
    pub binarize_threshold: u8,
    /// Gray value at or below which a pixel counts as an ink stroke for the
    /// outline layer.
    pub outline_threshold: u8,
    /// Regions smaller than this are dropped from every artifact.
    pub min_region_pixels: usize,
    pub label_source: LabelSource,
    /// Also write the label-preview image next to the other artifacts.
    pub write_label_preview: bool,
}

impl PipelineConfig {
    pub fn flood_fill() -> Self {
        Self {
            binarize_threshold: 128,
            outline_threshold: 40,
            min_region_pixels: 100,
            label_source: LabelSource::FloodFill,
            write_label_preview: false,
        }
    }

    pub fn with_label_grid(path: impl Into<PathBuf>) -> Self {
        Self {
            label_source: LabelSource::LabelGridFile(path.into()),
            ..Self::flood_fill()
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.outline_threshold >= self.binarize_threshold {
            return Err(PipelineError::InvalidInput(format!(
                "outline threshold {} must be below the binarize threshold {}",
                self.outline_threshold, self.binarize_threshold
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::flood_fill()
    }
}
