use std::collections::BTreeMap;

use image::GrayImage;
use imageproc::distance_transform::euclidean_squared_distance_transform;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::labeling::LabelGrid;
use crate::regions::region_mask;

/// Anchors this close to the image border fall back to a centroid.
const EDGE_MARGIN: i64 = 5;

/// Per-region label anchors and pixel counts, as the composer consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualCenters {
    pub centers: BTreeMap<u32, [u32; 2]>,
    pub sizes: BTreeMap<u32, u64>,
}

/// Compute a label anchor for every region present in the grid.
///
/// The anchor is the region pixel farthest from any non-region pixel
/// (first hit in row-major order on ties). An anchor within `EDGE_MARGIN`
/// of the border is replaced by the distance-weighted centroid of the
/// region; a region with no background anywhere falls back to its plain
/// centroid.
pub fn compute_visual_centers(grid: &LabelGrid) -> VisualCenters {
    let counts = grid.pixel_counts();
    let present: Vec<u32> = (1..=grid.max_label())
        .filter(|id| counts[(*id - 1) as usize] > 0)
        .collect();

    let entries: Vec<(u32, [u32; 2], u64)> = present
        .par_iter()
        .map(|&id| {
            let center = label_center(grid, id);
            (id, center, counts[(id - 1) as usize] as u64)
        })
        .collect();

    let mut out = VisualCenters::default();
    for (id, center, size) in entries {
        out.centers.insert(id, center);
        out.sizes.insert(id, size);
    }
    out
}

fn label_center(grid: &LabelGrid, id: u32) -> [u32; 2] {
    let mask = region_mask(grid, id);
    if mask.pixels().all(|p| p.0[0] == 255) {
        return plain_centroid(&mask);
    }

    // The transform measures distance to the nearest white pixel, so the
    // mask is inverted first: region pixels then carry their distance to
    // the closest non-region pixel.
    let mut inverted = mask.clone();
    image::imageops::invert(&mut inverted);
    let distances = euclidean_squared_distance_transform(&inverted);

    let mut best = [0u32, 0u32];
    let mut best_sq = -1.0f64;
    for (x, y, p) in distances.enumerate_pixels() {
        if p.0[0] > best_sq {
            best_sq = p.0[0];
            best = [x, y];
        }
    }

    let (x, y) = (best[0] as i64, best[1] as i64);
    let (w, h) = (grid.width() as i64, grid.height() as i64);
    if x <= EDGE_MARGIN || x >= w - EDGE_MARGIN || y <= EDGE_MARGIN || y >= h - EDGE_MARGIN {
        // Too close to the edge for a readable label; use the interior
        // bulk of the region instead.
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut total = 0.0f64;
        for (x, y, p) in distances.enumerate_pixels() {
            let weight = p.0[0].sqrt();
            sum_x += x as f64 * weight;
            sum_y += y as f64 * weight;
            total += weight;
        }
        return [(sum_x / total) as u32, (sum_y / total) as u32];
    }

    best
}

fn plain_centroid(mask: &GrayImage) -> [u32; 2] {
    let mut sum_x = 0u64;
    let mut sum_y = 0u64;
    let mut count = 0u64;
    for (x, y, p) in mask.enumerate_pixels() {
        if p.0[0] == 255 {
            sum_x += x as u64;
            sum_y += y as u64;
            count += 1;
        }
    }
    if count == 0 {
        return [0, 0];
    }
    [(sum_x / count) as u32, (sum_y / count) as u32]
}
