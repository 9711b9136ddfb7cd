use std::fs;

use regex::Regex;

use crate::artifacts::{self, ArtifactLayout, ColorEntry};
use crate::error::PipelineError;

/// The composed document always uses the client's fixed coordinate system.
const VIEWBOX_SIZE: u32 = 1024;

const MIN_FONT_SIZE: f64 = 6.0;
const MAX_FONT_SIZE: f64 = 14.0;
const MIN_REGION_SIZE: f64 = 100.0;
const MAX_REGION_SIZE: f64 = 10000.0;
const MIN_STROKE_WIDTH: f64 = 0.2;
const MAX_STROKE_WIDTH: f64 = 1.0;

/// What one composition run emitted, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeSummary {
    pub regions: usize,
    pub labels: usize,
    pub outline_paths: usize,
}

/// One `<path>` element pulled out of a tracer document.
#[derive(Debug, Clone)]
struct ParsedPath {
    d: String,
    fill_rule: Option<String>,
    transform: Option<String>,
}

struct PathScanner {
    tag: Regex,
    d: Regex,
    fill_rule: Regex,
    transform: Regex,
}

impl PathScanner {
    fn new() -> Result<Self, PipelineError> {
        Ok(PathScanner {
            tag: pattern(r"<path\b[^>]*>")?,
            d: pattern(r#"\sd="([^"]*)""#)?,
            fill_rule: pattern(r#"fill-rule="([^"]*)""#)?,
            transform: pattern(r#"transform="([^"]*)""#)?,
        })
    }

    fn paths(&self, svg: &str) -> Vec<ParsedPath> {
        self.tag
            .find_iter(svg)
            .filter_map(|tag| {
                let tag = tag.as_str();
                let d = self.d.captures(tag)?[1].to_string();
                Some(ParsedPath {
                    d,
                    fill_rule: self.fill_rule.captures(tag).map(|c| c[1].to_string()),
                    transform: self.transform.captures(tag).map(|c| c[1].to_string()),
                })
            })
            .collect()
    }

    fn first_path(&self, svg: &str) -> Option<ParsedPath> {
        self.paths(svg).into_iter().next()
    }
}

fn pattern(raw: &str) -> Result<Regex, PipelineError> {
    Regex::new(raw).map_err(|e| PipelineError::InvalidInput(format!("svg path pattern: {}", e)))
}

/// Join every per-region artifact into the final SVG plus its color table.
///
/// Regions are visited in ascending id order. A region missing either a
/// parseable path or a color entry is dropped before indices are handed
/// out, so `data-color-id` values and the color table rows stay contiguous
/// from 1 with no gaps. Any missing input file aborts the whole
/// composition; there is no partial output mode.
pub fn compose(layout: &ArtifactLayout) -> Result<ComposeSummary, PipelineError> {
    let colors = artifacts::load_region_colors(layout)?;
    let visual = artifacts::load_visual_centers(layout)?;
    let outline_svg = artifacts::load_outline_svg(layout)?;
    let listed = artifacts::list_region_svgs(layout)?;
    let scanner = PathScanner::new()?;

    let mut kept: Vec<(u32, ParsedPath, String)> = Vec::new();
    for (region_id, path) in listed {
        let text = fs::read_to_string(&path)?;
        let Some(parsed) = scanner.first_path(&text) else {
            log::debug!("region {} produced no usable path, skipping", region_id);
            continue;
        };
        let Some(color) = colors.get(&region_id) else {
            log::warn!("region {} has no color entry, skipping", region_id);
            continue;
        };
        kept.push((region_id, parsed, color.hex()));
    }

    let mut mask_paths = String::new();
    let mut region_paths = String::new();
    let mut entries = Vec::new();

    for (position, (region_id, parsed, hex)) in kept.iter().enumerate() {
        let color_index = (position + 1) as u32;
        let fill_rule = parsed.fill_rule.as_deref().unwrap_or("evenodd");
        let size = visual.sizes.get(region_id).copied().unwrap_or(0);

        region_paths.push_str(&format!(
            "    <path d=\"{}\" fill=\"whitesmoke\" fill-rule=\"{}\" data-region=\"{}\" data-color-id=\"{}\" stroke=\"grey\" stroke-width=\"{}\" class=\"color-region\"/>\n",
            parsed.d,
            fill_rule,
            region_id,
            color_index,
            format_stroke_width(size)
        ));
        mask_paths.push_str(&format!(
            "      <path d=\"{}\" fill=\"white\" fill-rule=\"{}\" class=\"mask-region mask-region-{}\" data-region=\"{}\"/>\n",
            parsed.d, fill_rule, region_id, region_id
        ));
        entries.push(ColorEntry {
            id: color_index,
            hex: hex.clone(),
        });
    }

    let mut outline_paths = String::new();
    let mut outline_count = 0usize;
    for parsed in scanner.paths(&outline_svg) {
        let transform = match &parsed.transform {
            Some(t) => format!(" transform=\"{}\"", t),
            None => String::new(),
        };
        outline_paths.push_str(&format!(
            "    <path d=\"{}\"{} fill=\"black\" class=\"outlines-layer\" mask=\"url(#outline-mask)\" pointer-events=\"none\"/>\n",
            parsed.d, transform
        ));
        outline_count += 1;
    }

    let mut labels = String::new();
    let mut label_count = 0usize;
    for (position, (region_id, _, _)) in kept.iter().enumerate() {
        let Some([x, y]) = visual.centers.get(region_id) else {
            continue;
        };
        let size = visual.sizes.get(region_id).copied().unwrap_or(0);
        labels.push_str(&format!(
            "    <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-size=\"{}\" fill=\"black\" pointer-events=\"none\" class=\"region-label {}\">{}</text>\n",
            f64::from(*x),
            f64::from(*y),
            calculate_font_size(size),
            label_size_class(size),
            position + 1
        ));
        label_count += 1;
    }

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\">\n",
        VIEWBOX_SIZE, VIEWBOX_SIZE
    ));
    svg.push_str("  <defs>\n");
    svg.push_str("    <mask id=\"outline-mask\">\n");
    svg.push_str(&format!(
        "      <rect width=\"{}\" height=\"{}\" fill=\"black\"/>\n",
        VIEWBOX_SIZE, VIEWBOX_SIZE
    ));
    svg.push_str(&mask_paths);
    svg.push_str("    </mask>\n");
    svg.push_str("  </defs>\n");
    svg.push_str("  <g id=\"viewport\">\n");
    svg.push_str(&region_paths);
    svg.push_str(&outline_paths);
    svg.push_str(&labels);
    svg.push_str("  </g>\n");
    svg.push_str("</svg>\n");

    fs::write(layout.composed_svg_path(), &svg)?;
    artifacts::write_color_table(layout, &entries)?;

    Ok(ComposeSummary {
        regions: entries.len(),
        labels: label_count,
        outline_paths: outline_count,
    })
}

fn normalized_size(region_size: u64) -> f64 {
    let span = MAX_REGION_SIZE - MIN_REGION_SIZE;
    ((region_size as f64 - MIN_REGION_SIZE) / span).clamp(0.0, 1.0)
}

fn calculate_font_size(region_size: u64) -> u32 {
    let font = MIN_FONT_SIZE + (MAX_FONT_SIZE - MIN_FONT_SIZE) * normalized_size(region_size);
    font.round() as u32
}

/// Stroke widths round to one decimal and print in shortest form, so a
/// full-width stroke is "1" rather than "1.0".
fn format_stroke_width(region_size: u64) -> String {
    let width =
        MIN_STROKE_WIDTH + (MAX_STROKE_WIDTH - MIN_STROKE_WIDTH) * normalized_size(region_size);
    let tenths = (width * 10.0).round() as i64;
    if tenths % 10 == 0 {
        format!("{}", tenths / 10)
    } else {
        format!("{:.1}", tenths as f64 / 10.0)
    }
}

fn label_size_class(region_size: u64) -> &'static str {
    if region_size < 500 {
        "region-label-xsmall"
    } else if region_size < 1000 {
        "region-label-small"
    } else if region_size < 4000 {
        "region-label-medium"
    } else if region_size < 8000 {
        "region-label-large"
    } else {
        "region-label-xlarge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centers::VisualCenters;
    use crate::regions::RegionColor;
    use std::collections::BTreeMap;

    #[test]
    fn font_size_interpolates_and_clamps_on_pixel_count() {
        assert_eq!(calculate_font_size(50), 6);
        assert_eq!(calculate_font_size(100), 6);
        let mid = calculate_font_size(5000);
        assert!(mid > 6 && mid < 14);
        assert_eq!(mid, 10);
        assert_eq!(calculate_font_size(10000), 14);
        assert_eq!(calculate_font_size(200000), 14);
    }

    #[test]
    fn stroke_width_interpolates_and_prints_in_shortest_form() {
        assert_eq!(format_stroke_width(50), "0.2");
        assert_eq!(format_stroke_width(100), "0.2");
        assert_eq!(format_stroke_width(5000), "0.6");
        assert_eq!(format_stroke_width(10000), "1");
        assert_eq!(format_stroke_width(200000), "1");
    }

    #[test]
    fn font_and_stroke_are_monotonic_in_region_size() {
        let sizes = [0u64, 100, 500, 1000, 5000, 9999, 10000, 50000];
        let mut last_font = 0;
        let mut last_norm = 0.0;
        for size in sizes {
            let font = calculate_font_size(size);
            assert!(font >= last_font);
            last_font = font;
            let norm = normalized_size(size);
            assert!(norm >= last_norm);
            last_norm = norm;
        }
    }

    #[test]
    fn size_classes_bucket_on_fixed_breakpoints() {
        assert_eq!(label_size_class(499), "region-label-xsmall");
        assert_eq!(label_size_class(500), "region-label-small");
        assert_eq!(label_size_class(999), "region-label-small");
        assert_eq!(label_size_class(1000), "region-label-medium");
        assert_eq!(label_size_class(4000), "region-label-large");
        assert_eq!(label_size_class(8000), "region-label-xlarge");
    }

    #[test]
    fn scanner_reads_d_fill_rule_and_transform() {
        let scanner = PathScanner::new().unwrap();
        let svg = concat!(
            "<svg><path d=\"M0,0 Z\" fill-rule=\"nonzero\"/>",
            "<path transform=\"translate(1,2)\" d=\"M1,1 Z\"/></svg>"
        );
        let paths = scanner.paths(svg);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].d, "M0,0 Z");
        assert_eq!(paths[0].fill_rule.as_deref(), Some("nonzero"));
        assert!(paths[0].transform.is_none());
        assert_eq!(paths[1].d, "M1,1 Z");
        assert_eq!(paths[1].transform.as_deref(), Some("translate(1,2)"));

        assert!(scanner.first_path("<svg><rect/></svg>").is_none());
    }

    fn write_fixture_set(tag: &str) -> ArtifactLayout {
        let root = std::env::temp_dir().join(format!(
            "colorbook-compose-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        let layout = ArtifactLayout::new(root);
        layout.prepare().unwrap();

        // Region 3 and 9 are complete; 5 has no path element; 7 has no
        // color entry. Only 3 and 9 may receive indices.
        fs::write(
            layout.region_svg_path(3),
            "<svg><path d=\"M0,0 L8,0 L8,8 L0,8 Z\" fill-rule=\"nonzero\"/></svg>",
        )
        .unwrap();
        fs::write(layout.region_svg_path(5), "<svg></svg>").unwrap();
        fs::write(
            layout.region_svg_path(7),
            "<svg><path d=\"M2,2 L4,2 L4,4 Z\"/></svg>",
        )
        .unwrap();
        fs::write(
            layout.region_svg_path(9),
            "<svg><path d=\"M10,10 L20,10 L20,20 L10,20 Z\"/></svg>",
        )
        .unwrap();

        let mut colors = BTreeMap::new();
        colors.insert(3, RegionColor { r: 255, g: 128, b: 0 });
        colors.insert(5, RegionColor { r: 1, g: 2, b: 3 });
        colors.insert(9, RegionColor { r: 0, g: 64, b: 255 });
        artifacts::write_region_colors(&layout, &colors).unwrap();

        let mut visual = VisualCenters::default();
        visual.centers.insert(3, [4, 4]);
        visual.centers.insert(9, [15, 15]);
        visual.sizes.insert(3, 50);
        visual.sizes.insert(9, 20000);
        artifacts::write_visual_centers(&layout, &visual).unwrap();

        fs::write(
            layout.outline_path(),
            concat!(
                "<svg><path d=\"M1,1 L2,2 Z\" transform=\"translate(0,5)\" fill=\"#000000\"/>",
                "</svg>"
            ),
        )
        .unwrap();

        layout
    }

    #[test]
    fn indices_stay_contiguous_when_regions_are_skipped() {
        let layout = write_fixture_set("contiguous");
        let summary = compose(&layout).unwrap();
        assert_eq!(summary.regions, 2);
        assert_eq!(summary.labels, 2);
        assert_eq!(summary.outline_paths, 1);

        let svg = fs::read_to_string(layout.composed_svg_path()).unwrap();
        assert!(svg.contains("data-region=\"3\" data-color-id=\"1\""));
        assert!(svg.contains("data-region=\"9\" data-color-id=\"2\""));
        assert!(!svg.contains("data-region=\"5\""));
        assert!(!svg.contains("data-region=\"7\""));

        let table = fs::read_to_string(layout.color_table_path()).unwrap();
        let parsed: Vec<ColorEntry> = serde_json::from_str(&table).unwrap();
        assert_eq!(
            parsed,
            vec![
                ColorEntry { id: 1, hex: "#ff8000".to_string() },
                ColorEntry { id: 2, hex: "#0040ff".to_string() },
            ]
        );
        fs::remove_dir_all(layout.root()).unwrap();
    }

    #[test]
    fn document_nests_mask_regions_outlines_and_labels() {
        let layout = write_fixture_set("structure");
        compose(&layout).unwrap();
        let svg = fs::read_to_string(layout.composed_svg_path()).unwrap();

        assert_eq!(svg.matches("<mask id=\"outline-mask\">").count(), 1);
        let rect_at = svg.find("<rect width=\"1024\" height=\"1024\" fill=\"black\"/>").unwrap();
        let first_mask_path = svg.find("mask-region-3").unwrap();
        assert!(rect_at < first_mask_path);
        assert!(svg.contains("viewBox=\"0 0 1024 1024\""));

        // The traced fill rule is carried through; absent rules default.
        assert!(svg.contains("fill-rule=\"nonzero\" data-region=\"3\""));
        assert!(svg.contains("fill-rule=\"evenodd\" data-region=\"9\""));

        // Outline layer keeps its transform and is masked and inert.
        assert!(svg.contains(
            "transform=\"translate(0,5)\" fill=\"black\" class=\"outlines-layer\" mask=\"url(#outline-mask)\" pointer-events=\"none\""
        ));

        // Labels show each region's own color index at its visual center.
        assert!(svg.contains(">1</text>"));
        assert!(svg.contains(">2</text>"));
        assert!(svg.contains("x=\"4.00\" y=\"4.00\""));
        assert!(svg.contains("font-size=\"6\""));
        assert!(svg.contains("region-label region-label-xsmall"));
        assert!(svg.contains("font-size=\"14\""));
        assert!(svg.contains("region-label region-label-xlarge"));
        fs::remove_dir_all(layout.root()).unwrap();
    }

    #[test]
    fn composing_twice_is_byte_identical() {
        let layout = write_fixture_set("determinism");
        compose(&layout).unwrap();
        let first_svg = fs::read_to_string(layout.composed_svg_path()).unwrap();
        let first_table = fs::read_to_string(layout.color_table_path()).unwrap();

        compose(&layout).unwrap();
        assert_eq!(fs::read_to_string(layout.composed_svg_path()).unwrap(), first_svg);
        assert_eq!(fs::read_to_string(layout.color_table_path()).unwrap(), first_table);
        fs::remove_dir_all(layout.root()).unwrap();
    }

    #[test]
    fn any_missing_input_aborts_composition() {
        let layout = write_fixture_set("missing");
        fs::remove_file(layout.visual_centers_path()).unwrap();
        let err = compose(&layout).unwrap_err();
        assert!(matches!(err, PipelineError::MissingArtifact { .. }));
        fs::remove_dir_all(layout.root()).unwrap();

        let layout = write_fixture_set("missing-outline");
        fs::remove_file(layout.outline_path()).unwrap();
        let err = compose(&layout).unwrap_err();
        assert!(matches!(err, PipelineError::MissingArtifact { .. }));
        fs::remove_dir_all(layout.root()).unwrap();
    }
}
