// Demo runner for the `color_seeker` library: reads a PNG, runs one camera
// session over it and writes the intermediate images next to each other.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use color_seeker::core_modules::region_summary::draw_bounding_box;
use color_seeker::core_modules::utils::image_helper::image_helper;
use color_seeker::pipeline::{PipelineConfig, Report, VisionPipeline};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Find the configured target color and isolate its largest region.
    Target,
    /// Discover a palette for the scene.
    Quantize,
}

#[derive(Debug, Parser)]
#[command(version, about = "Color segmentation demo runner")]
struct Args {
    /// Input image (PNG).
    #[arg(long)]
    input: PathBuf,
    /// Directory for the output images.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// JSON pipeline config; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Mode::Target)]
    mode: Mode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let frame = image_helper::load_rgb(&args.input)
        .with_context(|| format!("loading image {}", args.input.display()))?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let mut pipeline = VisionPipeline::new(config);

    match args.mode {
        Mode::Quantize => {
            let quantization = pipeline.quantize(&frame)?;
            info!(
                "{:?}: {} clusters, threshold {}, {} recalibrations",
                quantization.status,
                quantization.clusters_used,
                quantization.threshold,
                quantization.resets
            );
            image_helper::save_indexed(&args.output_dir.join("quantized.png"), &quantization.frame)?;
        }
        Mode::Target => {
            let analysis = pipeline.analyze(&frame)?;
            match &analysis.report {
                Report::TargetFound(report) => info!(
                    "target found: {} px in largest of {} blobs, center {}, box {:?}",
                    report.blob_pixels, report.blob_count, report.center, report.bounding_box
                ),
                Report::NoTarget { detected_pixels } => {
                    info!("no target ({} px matched)", detected_pixels)
                }
            }
            image_helper::save_indexed(&args.output_dir.join("mask.png"), &analysis.detection_mask)?;
            image_helper::save_indexed(&args.output_dir.join("blob.png"), &analysis.largest_blob)?;
            image_helper::save_indexed(
                &args.output_dir.join("boxed.png"),
                &draw_bounding_box(&analysis.largest_blob)?,
            )?;
            println!("{}", serde_json::to_string_pretty(&analysis.report)?);
        }
    }

    Ok(())
}
