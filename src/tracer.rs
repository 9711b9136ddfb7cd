use image::GrayImage;
use visioncortex::PathSimplifyMode;
use vtracer::{convert, ColorImage, ColorMode, Config, Hierarchical};

use crate::error::TraceError;

/// Knobs for one tracing pass.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Connected blobs below this pixel count are discarded before fitting.
    pub filter_speckle: usize,
    /// Decimal places kept in emitted path coordinates.
    pub path_precision: u32,
}

impl TraceConfig {
    /// Per-region mask tracing keeps small detail.
    pub fn region_mask() -> Self {
        TraceConfig {
            filter_speckle: 10,
            path_precision: 2,
        }
    }

    /// Whole-image outline tracing drops pen noise.
    pub fn outline() -> Self {
        TraceConfig {
            filter_speckle: 50,
            path_precision: 2,
        }
    }
}

/// Converts a binary mask (white = shape) into a standalone SVG document.
pub trait Tracer {
    fn trace(&self, mask: &GrayImage, config: &TraceConfig) -> Result<String, TraceError>;
}

/// In-process vtracer backend, binary mode with spline fitting.
#[derive(Debug, Default, Clone, Copy)]
pub struct VtracerBackend;

impl Tracer for VtracerBackend {
    fn trace(&self, mask: &GrayImage, config: &TraceConfig) -> Result<String, TraceError> {
        let svg = convert(mask_to_color_image(mask), vtracer_config(config))
            .map_err(TraceError::Backend)?;
        let text = svg.to_string();
        if !text.contains("<path") {
            return Err(TraceError::EmptyOutput);
        }
        Ok(text)
    }
}

/// vtracer's binary mode keys shapes off dark pixels, so the
/// white-marks-the-shape mask is inverted on the way in.
fn mask_to_color_image(mask: &GrayImage) -> ColorImage {
    let mut pixels = Vec::with_capacity(mask.as_raw().len() * 4);
    for p in mask.pixels() {
        let v = 255 - p.0[0];
        pixels.extend_from_slice(&[v, v, v, 255]);
    }
    ColorImage {
        pixels,
        width: mask.width() as usize,
        height: mask.height() as usize,
    }
}

fn vtracer_config(config: &TraceConfig) -> Config {
    Config {
        color_mode: ColorMode::Binary,
        hierarchical: Hierarchical::Stacked,
        mode: PathSimplifyMode::Spline,
        filter_speckle: config.filter_speckle,
        color_precision: 6,
        layer_difference: 16,
        corner_threshold: 60,
        length_threshold: 4.0,
        max_iterations: 10,
        splice_threshold: 45,
        path_precision: Some(config.path_precision),
    }
}
