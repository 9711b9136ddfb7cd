use crate::error::PipelineError;
use crate::labeling::LabelGrid;
use image::{GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Mean color of one region over the source image.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RegionColor {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Pixel count and mean color for one kept region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionStats {
    pub id: u32,
    pub pixel_count: usize,
    pub color: RegionColor,
}

/// Compute pixel counts and mean source-image colors for every label, then
/// drop regions below `min_region_pixels`. The filter is hard: a dropped
/// region appears in no downstream artifact.
///
/// Returned stats are sorted by region id ascending. A kept region with no
/// pixels (only possible when the minimum is zero) gets black as the
/// defined fallback color.
pub fn region_color_stats(
    source: &RgbImage,
    grid: &LabelGrid,
    min_region_pixels: usize,
) -> Result<Vec<RegionStats>, PipelineError> {
    if source.width() != grid.width() || source.height() != grid.height() {
        return Err(PipelineError::InvalidInput(format!(
            "label grid is {}x{} but source image is {}x{}",
            grid.width(),
            grid.height(),
            source.width(),
            source.height()
        )));
    }

    let label_count = grid.max_label() as usize;
    let mut counts = vec![0usize; label_count];
    let mut sums = vec![[0u64; 3]; label_count];

    let pixels = source.as_raw();
    for (idx, label) in grid.labels().iter().enumerate() {
        if *label == 0 {
            continue;
        }
        let slot = (*label - 1) as usize;
        let base = idx * 3;
        counts[slot] += 1;
        sums[slot][0] += pixels[base] as u64;
        sums[slot][1] += pixels[base + 1] as u64;
        sums[slot][2] += pixels[base + 2] as u64;
    }

    let mut stats = Vec::new();
    for slot in 0..label_count {
        let pixel_count = counts[slot];
        if pixel_count < min_region_pixels {
            continue;
        }
        let color = if pixel_count == 0 {
            RegionColor { r: 0, g: 0, b: 0 }
        } else {
            RegionColor {
                r: mean_channel(sums[slot][0], pixel_count),
                g: mean_channel(sums[slot][1], pixel_count),
                b: mean_channel(sums[slot][2], pixel_count),
            }
        };
        stats.push(RegionStats {
            id: slot as u32 + 1,
            pixel_count,
            color,
        });
    }

    Ok(stats)
}

fn mean_channel(sum: u64, count: usize) -> u8 {
    (sum as f64 / count as f64).round() as u8
}

/// Single-channel mask for one region: white (255) marks its pixels.
pub fn region_mask(grid: &LabelGrid, region_id: u32) -> GrayImage {
    let mut mask = GrayImage::new(grid.width(), grid.height());
    for (idx, label) in grid.labels().iter().enumerate() {
        if *label == region_id {
            let x = (idx % grid.width() as usize) as u32;
            let y = (idx / grid.width() as usize) as u32;
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}

/// Debug rendering of the label grid: background white, every label a
/// fixed color derived from its id so two runs paint identical previews.
pub fn render_label_preview(grid: &LabelGrid) -> RgbImage {
    let mut preview = RgbImage::new(grid.width(), grid.height());
    for (idx, label) in grid.labels().iter().enumerate() {
        let x = (idx % grid.width() as usize) as u32;
        let y = (idx / grid.width() as usize) as u32;
        preview.put_pixel(x, y, label_color(*label));
    }
    preview
}

fn label_color(label: u32) -> Rgb<u8> {
    if label == 0 {
        return Rgb([255, 255, 255]);
    }
    // Golden-angle hue stepping keeps adjacent ids visually distinct.
    let hue = (label as f32 * 137.508) % 360.0;
    hsv_to_rgb(hue, 0.65, 0.88)
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Rgb<u8> {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    Rgb([
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ])
}
