use image::DynamicImage;

use crate::binarize::binarize_dark;
use crate::error::TraceError;
use crate::tracer::{TraceConfig, Tracer};

/// Trace the dark line strokes of the source image into one standalone SVG.
///
/// Pixels at or below `threshold` count as stroke. An image with no dark
/// strokes at all yields a document with no paths rather than an error, so
/// downstream composition still finds its outline artifact.
pub fn extract_outlines(
    source: &DynamicImage,
    threshold: u8,
    tracer: &dyn Tracer,
) -> Result<String, TraceError> {
    let strokes = binarize_dark(source, threshold);
    match tracer.trace(&strokes, &TraceConfig::outline()) {
        Ok(svg) => Ok(svg),
        Err(TraceError::EmptyOutput) => Ok(empty_document(strokes.width(), strokes.height())),
        Err(err) => Err(err),
    }
}

fn empty_document(width: u32, height: u32) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">\n",
            "</svg>"
        ),
        width, height
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::test_support::StubTracer;
    use image::{Rgb, RgbImage};

    fn source_with_dark_block() -> DynamicImage {
        let mut image = RgbImage::from_pixel(16, 16, Rgb([220, 220, 220]));
        for y in 4..9 {
            for x in 4..9 {
                image.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }
        DynamicImage::ImageRgb8(image)
    }

    #[test]
    fn dark_strokes_are_traced() {
        let svg = extract_outlines(&source_with_dark_block(), 40, &StubTracer::new()).unwrap();
        assert!(svg.contains("<path"));
        assert!(svg.contains("M4,4"));
    }

    #[test]
    fn strokeless_image_yields_a_document_with_no_paths() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 200, 200])));
        let svg = extract_outlines(&image, 40, &StubTracer::new()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(!svg.contains("<path"));
    }
}
