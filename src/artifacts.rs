use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::centers::VisualCenters;
use crate::error::PipelineError;
use crate::regions::RegionColor;

/// One row of the composed color table, ordered by `id` ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEntry {
    pub id: u32,
    pub hex: String,
}

/// Filesystem layout of one pipeline run. Every artifact path is derived
/// from the run's root directory so two runs never interleave files.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mask_dir(&self) -> PathBuf {
        self.root.join("region-masks")
    }

    pub fn mask_path(&self, region_id: u32) -> PathBuf {
        self.mask_dir().join(format!("region-{}.png", region_id))
    }

    pub fn svg_dir(&self) -> PathBuf {
        self.root.join("svgs")
    }

    pub fn region_svg_path(&self, region_id: u32) -> PathBuf {
        self.svg_dir().join(format!("region-{}.svg", region_id))
    }

    pub fn outline_path(&self) -> PathBuf {
        self.root.join("outlines.svg")
    }

    pub fn region_colors_path(&self) -> PathBuf {
        self.root.join("region-colors.json")
    }

    pub fn visual_centers_path(&self) -> PathBuf {
        self.root.join("visual_centers.json")
    }

    pub fn composed_svg_path(&self) -> PathBuf {
        self.root.join("regions.svg")
    }

    pub fn color_table_path(&self) -> PathBuf {
        self.root.join("colors.json")
    }

    pub fn label_preview_path(&self) -> PathBuf {
        self.root.join("label-preview.png")
    }

    /// Create the run's directory tree.
    pub fn prepare(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(self.mask_dir())?;
        fs::create_dir_all(self.svg_dir())?;
        Ok(())
    }
}

pub fn write_region_colors(
    layout: &ArtifactLayout,
    colors: &BTreeMap<u32, RegionColor>,
) -> Result<(), PipelineError> {
    write_json(&layout.region_colors_path(), colors)
}

pub fn load_region_colors(
    layout: &ArtifactLayout,
) -> Result<BTreeMap<u32, RegionColor>, PipelineError> {
    read_json(&layout.region_colors_path())
}

pub fn write_visual_centers(
    layout: &ArtifactLayout,
    centers: &VisualCenters,
) -> Result<(), PipelineError> {
    write_json(&layout.visual_centers_path(), centers)
}

pub fn load_visual_centers(layout: &ArtifactLayout) -> Result<VisualCenters, PipelineError> {
    read_json(&layout.visual_centers_path())
}

pub fn write_color_table(
    layout: &ArtifactLayout,
    entries: &[ColorEntry],
) -> Result<(), PipelineError> {
    write_json(&layout.color_table_path(), &entries)
}

/// Read the whole-image outline document, required at composition time.
pub fn load_outline_svg(layout: &ArtifactLayout) -> Result<String, PipelineError> {
    let path = layout.outline_path();
    if !path.is_file() {
        return Err(PipelineError::missing_artifact(path));
    }
    Ok(fs::read_to_string(path)?)
}

/// List the per-region SVGs present on disk as `(region_id, path)` pairs,
/// sorted ascending by id. Files not named `region-<id>.svg` are ignored.
/// A missing directory is fatal: composition never runs against a partial
/// artifact set.
pub fn list_region_svgs(layout: &ArtifactLayout) -> Result<Vec<(u32, PathBuf)>, PipelineError> {
    let dir = layout.svg_dir();
    if !dir.is_dir() {
        return Err(PipelineError::missing_artifact(dir));
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(id) = parse_region_file_name(&name.to_string_lossy()) else {
            continue;
        };
        found.push((id, entry.path()));
    }
    found.sort_by_key(|(id, _)| *id);
    Ok(found)
}

fn parse_region_file_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("region-")?.strip_suffix(".svg")?;
    // u32 parsing also accepts a leading sign; only bare digits name an id.
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let payload = serde_json::to_string_pretty(value)?;
    fs::write(path, payload)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::missing_artifact(path));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
