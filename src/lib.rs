// THEORY:
// This file is the main entry point for the `color_seeker` library crate, the
// vision segmentation core of a camera-driven control loop. Given a raw color
// frame it can:
//
// - discover a compact palette when the target color is unknown
//   (`core_modules::color_quantizer`),
// - locate the region closest to a known target color with a per-frame adaptive
//   threshold (`core_modules::target_locator`),
// - isolate the largest connected foreground region (`core_modules::blob_extractor`)
//   and summarize where it is (`core_modules::region_summary`).
//
// `pipeline::VisionPipeline` is the high-level interface: one per camera, owning
// that camera's calibration state. `parallel_pipeline::ParallelPipeline` runs
// several cameras side by side without sharing any state between them.

pub mod core_modules;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::error::{Result, VisionError};
pub use core_modules::frame::{IndexedFrame, Palette, PixelFormat, RgbFrame};
pub use core_modules::pixel::pixel::{IndexedPixel, RgbPixel};
