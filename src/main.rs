// CLI entry for the coloring-page batch pipeline
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use colorbook::{ArtifactLayout, PipelineConfig, VtracerBackend};

#[derive(Parser, Debug)]
#[command(
    name = "colorbook",
    version,
    about = "Offline paint-by-numbers coloring page generator"
)]
struct Cli {
    /// Source image (PNG or JPEG)
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Directory receiving the run's artifacts
    #[arg(short = 'o', long = "output", default_value = "output")]
    output: PathBuf,

    /// Foreground threshold for binarization (0-255)
    #[arg(long = "threshold")]
    threshold: Option<u8>,

    /// Dark-stroke threshold for the outline layer (0-255)
    #[arg(long = "outline-threshold")]
    outline_threshold: Option<u8>,

    /// Drop regions smaller than this many pixels
    #[arg(long = "min-region-pixels")]
    min_region_pixels: Option<usize>,

    /// Use a precomputed NumPy label grid instead of flood fill
    #[arg(long = "labels", value_hint = ValueHint::FilePath)]
    labels: Option<PathBuf>,

    /// Also write a label-preview image
    #[arg(long = "preview", action = ArgAction::SetTrue)]
    preview: bool,
}

fn build_config(cli: &Cli) -> PipelineConfig {
    let mut config = match &cli.labels {
        Some(path) => PipelineConfig::with_label_grid(path),
        None => PipelineConfig::flood_fill(),
    };
    if let Some(v) = cli.threshold {
        config.binarize_threshold = v;
    }
    if let Some(v) = cli.outline_threshold {
        config.outline_threshold = v;
    }
    if let Some(v) = cli.min_region_pixels {
        config.min_region_pixels = v;
    }
    if cli.preview {
        config.write_label_preview = true;
    }
    config
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = build_config(&cli);
    let layout = ArtifactLayout::new(&cli.output);

    let report = colorbook::run_pipeline(&cli.input, &layout, &config, &VtracerBackend)
        .with_context(|| format!("pipeline failed for {}", cli.input.display()))?;

    println!(
        "composed {} of {} regions into {}",
        report.composed_regions,
        report.total_regions,
        layout.composed_svg_path().display()
    );
    Ok(())
}
