use image::{DynamicImage, GrayImage, Luma};

/// Threshold a source image into a 0/255 grid: gray values at or above
/// `threshold` become white (foreground).
pub fn binarize(image: &DynamicImage, threshold: u8) -> GrayImage {
    let gray = image.to_luma8();
    map_threshold(gray, |value| value >= threshold)
}

/// Inverse pass for the outline layer: gray values at or below `threshold`
/// become white, isolating dark ink strokes.
pub fn binarize_dark(image: &DynamicImage, threshold: u8) -> GrayImage {
    let gray = image.to_luma8();
    map_threshold(gray, |value| value <= threshold)
}

fn map_threshold(mut gray: GrayImage, keep: impl Fn(u8) -> bool) -> GrayImage {
    for pixel in gray.pixels_mut() {
        *pixel = Luma([if keep(pixel.0[0]) { 255 } else { 0 }]);
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gray_test_image(values: &[&[u8]]) -> DynamicImage {
        let height = values.len() as u32;
        let width = values.first().map(|row| row.len()).unwrap_or(0) as u32;
        let mut buffer = image::RgbImage::new(width, height);
        for (y, row) in values.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                buffer.put_pixel(x as u32, y as u32, Rgb([*value, *value, *value]));
            }
        }
        DynamicImage::ImageRgb8(buffer)
    }

    #[test]
    fn threshold_is_inclusive_at_the_boundary() {
        let image = gray_test_image(&[&[127, 128, 129]]);
        let binary = binarize(&image, 128);
        assert_eq!(binary.get_pixel(0, 0).0[0], 0);
        assert_eq!(binary.get_pixel(1, 0).0[0], 255);
        assert_eq!(binary.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn dark_pass_keeps_values_at_or_below_threshold() {
        let image = gray_test_image(&[&[0, 40, 41, 200]]);
        let strokes = binarize_dark(&image, 40);
        assert_eq!(strokes.get_pixel(0, 0).0[0], 255);
        assert_eq!(strokes.get_pixel(1, 0).0[0], 255);
        assert_eq!(strokes.get_pixel(2, 0).0[0], 0);
        assert_eq!(strokes.get_pixel(3, 0).0[0], 0);
    }

    #[test]
    fn binarize_is_deterministic() {
        let image = gray_test_image(&[&[10, 130, 250], &[90, 128, 15]]);
        assert_eq!(binarize(&image, 128), binarize(&image, 128));
    }
}
