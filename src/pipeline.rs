use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use image::GenericImageView;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::artifacts::{self, ArtifactLayout};
use crate::binarize::binarize;
use crate::centers::compute_visual_centers;
use crate::compose::compose;
use crate::config::{LabelSource, PipelineConfig};
use crate::error::{PipelineError, TraceError};
use crate::labeling::label_connected_regions;
use crate::npy;
use crate::outline::extract_outlines;
use crate::regions::{region_color_stats, region_mask, render_label_preview, RegionColor};
use crate::tracer::{TraceConfig, Tracer};

/// Wall-clock milliseconds per pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfStats {
    pub decode_ms: u64,
    pub label_ms: u64,
    pub extract_ms: u64,
    pub trace_ms: u64,
    pub centers_ms: u64,
    pub outline_ms: u64,
    pub compose_ms: u64,
    pub total_ms: u64,
}

/// Outcome of one full run over one source image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub width: u32,
    pub height: u32,
    /// Labels assigned by the labeler, before any filtering.
    pub total_regions: u32,
    /// Regions surviving the minimum-pixel filter.
    pub kept_regions: usize,
    /// Kept regions whose mask actually traced to a path.
    pub traced_regions: usize,
    /// Regions present in the composed document and color table.
    pub composed_regions: usize,
    pub labels: usize,
    pub perf: PerfStats,
}

/// Run the whole pipeline for one image: label, extract, trace, compose.
///
/// Stages run strictly in order; only the per-region mask and trace work
/// fans out across threads, and its results are re-sorted by region id so
/// every artifact is byte-deterministic for a fixed input and config.
pub fn run_pipeline(
    input: &Path,
    layout: &ArtifactLayout,
    config: &PipelineConfig,
    tracer: &(dyn Tracer + Sync),
) -> Result<PipelineReport, PipelineError> {
    let timing_enabled = timing_enabled();
    let t_total = Instant::now();
    config.validate()?;
    layout.prepare()?;

    let t_decode = Instant::now();
    let source = image::open(input)?;
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidInput(
            "source image has no pixels".to_string(),
        ));
    }
    let decode_ms = t_decode.elapsed().as_millis() as u64;

    let t_label = Instant::now();
    let grid = match &config.label_source {
        LabelSource::FloodFill => {
            let binary = binarize(&source, config.binarize_threshold);
            label_connected_regions(&binary)
        }
        LabelSource::LabelGridFile(path) => {
            let grid = npy::load_label_grid(path)?;
            if grid.width() != width || grid.height() != height {
                return Err(PipelineError::InvalidInput(format!(
                    "label grid is {}x{} but source image is {}x{}",
                    grid.width(),
                    grid.height(),
                    width,
                    height
                )));
            }
            grid
        }
    };
    let label_ms = t_label.elapsed().as_millis() as u64;
    log::info!(
        "labeled {} regions in {}x{} image",
        grid.max_label(),
        width,
        height
    );

    if config.write_label_preview {
        let preview = render_label_preview(&grid);
        let path = layout.label_preview_path();
        preview
            .save(&path)
            .map_err(|e| PipelineError::image_write(path, e))?;
    }

    let t_extract = Instant::now();
    let source_rgb = source.to_rgb8();
    let stats = region_color_stats(&source_rgb, &grid, config.min_region_pixels)?;
    let colors: BTreeMap<u32, RegionColor> = stats.iter().map(|s| (s.id, s.color)).collect();
    artifacts::write_region_colors(layout, &colors)?;
    let extract_ms = t_extract.elapsed().as_millis() as u64;

    let t_trace = Instant::now();
    let trace_config = TraceConfig::region_mask();
    let outcomes: Result<Vec<Option<TraceError>>, PipelineError> = stats
        .par_iter()
        .map(|region| {
            let mask = region_mask(&grid, region.id);
            let mask_path = layout.mask_path(region.id);
            mask.save(&mask_path)
                .map_err(|e| PipelineError::image_write(mask_path, e))?;
            match tracer.trace(&mask, &trace_config) {
                Ok(svg) => {
                    fs::write(layout.region_svg_path(region.id), svg)?;
                    Ok(None)
                }
                Err(err) => Ok(Some(err)),
            }
        })
        .collect();
    let outcomes = outcomes?;
    let mut traced = 0usize;
    for (region, outcome) in stats.iter().zip(&outcomes) {
        match outcome {
            None => traced += 1,
            Some(err) => log::warn!("region {} not traced, skipping: {}", region.id, err),
        }
    }
    let trace_ms = t_trace.elapsed().as_millis() as u64;

    let t_centers = Instant::now();
    let mut centers = compute_visual_centers(&grid);
    // Dropped regions must not leak into any artifact.
    centers.centers.retain(|id, _| colors.contains_key(id));
    centers.sizes.retain(|id, _| colors.contains_key(id));
    artifacts::write_visual_centers(layout, &centers)?;
    let centers_ms = t_centers.elapsed().as_millis() as u64;

    let t_outline = Instant::now();
    let outline_svg = extract_outlines(&source, config.outline_threshold, tracer)
        .map_err(|err| PipelineError::InvalidInput(format!("outline tracing failed: {}", err)))?;
    fs::write(layout.outline_path(), outline_svg)?;
    let outline_ms = t_outline.elapsed().as_millis() as u64;

    let t_compose = Instant::now();
    let summary = compose(layout)?;
    let compose_ms = t_compose.elapsed().as_millis() as u64;

    let total_ms = t_total.elapsed().as_millis() as u64;
    if timing_enabled {
        log::debug!(
            "pipeline timing decode={}ms label={}ms extract={}ms trace={}ms centers={}ms outline={}ms compose={}ms total={}ms",
            decode_ms,
            label_ms,
            extract_ms,
            trace_ms,
            centers_ms,
            outline_ms,
            compose_ms,
            total_ms
        );
    }
    log::info!(
        "composed {} regions ({} labeled, {} kept, {} traced) into {}",
        summary.regions,
        grid.max_label(),
        stats.len(),
        traced,
        layout.composed_svg_path().display()
    );

    Ok(PipelineReport {
        width,
        height,
        total_regions: grid.max_label(),
        kept_regions: stats.len(),
        traced_regions: traced,
        composed_regions: summary.regions,
        labels: summary.labels,
        perf: PerfStats {
            decode_ms,
            label_ms,
            extract_ms,
            trace_ms,
            centers_ms,
            outline_ms,
            compose_ms,
            total_ms,
        },
    })
}

fn timing_enabled() -> bool {
    matches!(
        std::env::var("COLORBOOK_DEBUG_TIMING").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}
