// THEORY:
// The `pipeline` module is the top-level API of the segmentation core. A
// `VisionPipeline` is one camera session: it owns that camera's configuration and
// calibration threshold and chains the components along the frame data flow:
//
//   raw frame -> TargetColorLocator -> monochrome mask -> BlobExtractor
//             -> RegionSummarizer -> Report
//
// or, when the target color is unknown, raw frame -> ColorQuantizer.
//
// The calibration threshold lives here and nowhere else, so several sessions (one
// per camera) can run side by side without disturbing each other.

use crate::core_modules::blob_extractor::label_blobs;
use crate::core_modules::color_quantizer::{CalibrationState, Quantization};
use crate::core_modules::error::Result;
use crate::core_modules::frame::{IndexedFrame, RgbFrame};
use crate::core_modules::region_summary::{self, BoundingBox};
use crate::core_modules::target_locator;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Re-export key data structures for the public API.
pub use crate::core_modules::color_quantizer::CalibrationStatus;
pub use crate::core_modules::pixel::pixel::RgbPixel;

/// Configuration for a `VisionPipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The color the locator searches for.
    pub target: RgbPixel,
    /// Pixels the locator must collect before it may stop widening its threshold.
    pub min_blob_size: usize,
    /// Hard cap on the locator threshold.
    pub max_distance: usize,
    /// Cluster budget for palette discovery.
    pub max_colors: usize,
    /// Calibration threshold a fresh session starts from.
    pub initial_threshold: f64,
    /// Largest blobs smaller than this are reported as `Report::NoTarget`.
    pub min_target_pixels: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: RgbPixel::new(255, 0, 0),
            min_blob_size: 50,
            max_distance: 100,
            max_colors: 8,
            initial_threshold: 10.0,
            min_target_pixels: 1,
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config; missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Everything the control loop needs about a located target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReport {
    /// Pixels the locator accepted anywhere in the frame.
    pub detected_pixels: usize,
    /// Pixels in the largest connected region.
    pub blob_pixels: usize,
    pub blob_count: usize,
    pub bounding_box: BoundingBox,
    /// Linear index of the bounding-box midpoint.
    pub center: usize,
    pub centroid: (f64, f64),
    /// Distance threshold the locator settled on.
    pub threshold: usize,
}

/// The primary output of the pipeline for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Report {
    NoTarget { detected_pixels: usize },
    TargetFound(TargetReport),
}

/// Intermediate images of one `find_target` call, for visualization.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub report: Report,
    /// Locator output: index 0 (white) is the target color.
    pub detection_mask: IndexedFrame,
    /// Largest blob only: index 1 is the blob.
    pub largest_blob: IndexedFrame,
}

/// One camera session.
pub struct VisionPipeline {
    config: PipelineConfig,
    calibration: CalibrationState,
    frames_processed: u64,
}

impl VisionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            calibration: CalibrationState::new(config.initial_threshold),
            config,
            frames_processed: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current calibration threshold of this session.
    pub fn threshold(&self) -> f64 {
        self.calibration.threshold
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Discovers a palette for `frame`, carrying the session threshold forward.
    pub fn quantize(&mut self, frame: &RgbFrame) -> Result<Quantization> {
        let quantization = self.calibration.quantize(frame, self.config.max_colors)?;
        self.frames_processed += 1;
        Ok(quantization)
    }

    pub fn find_target(&mut self, frame: &RgbFrame) -> Result<Report> {
        Ok(self.analyze(frame)?.report)
    }

    /// Runs the full locate -> isolate -> summarize chain and keeps the masks.
    pub fn analyze(&mut self, frame: &RgbFrame) -> Result<FrameAnalysis> {
        let detection = target_locator::locate(
            frame,
            &self.config.target,
            self.config.min_blob_size,
            self.config.max_distance,
        )?;
        let labeling = label_blobs(&detection.mask.to_monochrome()?)?;
        let largest_blob = labeling.select(labeling.largest())?;
        self.frames_processed += 1;

        let blob_pixels = labeling.largest_size();
        let bounding_box = region_summary::bounding_box(&largest_blob);
        let center = bounding_box.center_index(largest_blob.width());
        let centroid = region_summary::centroid(&largest_blob);

        let report = match (center, centroid) {
            (Some(center), Some(centroid)) if blob_pixels >= self.config.min_target_pixels => {
                Report::TargetFound(TargetReport {
                    detected_pixels: detection.detected_pixels,
                    blob_pixels,
                    blob_count: labeling.blob_count(),
                    bounding_box,
                    center,
                    centroid,
                    threshold: detection.threshold,
                })
            }
            _ => Report::NoTarget {
                detected_pixels: detection.detected_pixels,
            },
        };
        debug!("frame {}: {:?}", self.frames_processed, report);

        Ok(FrameAnalysis {
            report,
            detection_mask: detection.mask,
            largest_blob,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::BLACK;

    const GRAY: RgbPixel = RgbPixel::new(90, 90, 90);
    const TARGET: RgbPixel = RgbPixel::new(240, 20, 20);

    fn config() -> PipelineConfig {
        PipelineConfig {
            target: RgbPixel::new(255, 0, 0),
            min_blob_size: 5,
            max_distance: 150,
            ..PipelineConfig::default()
        }
    }

    /// Gray 30x20 frame with a 2x2 and a 5x4 red patch.
    fn scene() -> RgbFrame {
        let mut frame = RgbFrame::filled(30, 20, GRAY).unwrap();
        for (row, col) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
            frame.set_pixel(row, col, TARGET);
        }
        for row in 10..15 {
            for col in 20..24 {
                frame.set_pixel(row, col, TARGET);
            }
        }
        frame
    }

    #[test]
    fn reports_the_largest_target_region() {
        let mut pipeline = VisionPipeline::new(config());
        let analysis = pipeline.analyze(&scene()).unwrap();
        let report = match analysis.report {
            Report::TargetFound(report) => report,
            other => panic!("expected a target, got {:?}", other),
        };
        assert_eq!(report.detected_pixels, 24);
        assert_eq!(report.blob_pixels, 20);
        assert_eq!(report.blob_count, 2);
        assert_eq!(
            report.bounding_box,
            BoundingBox {
                top: 10,
                bottom: 14,
                left: 20,
                right: 23
            }
        );
        assert_eq!(report.center, 30 * 12 + 21);
        assert_eq!(report.centroid, (12.0, 21.5));
        assert_eq!(analysis.largest_blob.count_index(1), 20);
        assert_eq!(analysis.detection_mask.count_index(0), 24);
        assert_eq!(pipeline.frames_processed(), 1);
    }

    #[test]
    fn empty_scene_reports_no_target() {
        let mut pipeline = VisionPipeline::new(config());
        let report = pipeline
            .find_target(&RgbFrame::filled(10, 10, BLACK).unwrap())
            .unwrap();
        assert_eq!(report, Report::NoTarget { detected_pixels: 0 });
    }

    #[test]
    fn small_blobs_fall_under_the_target_minimum() {
        let mut pipeline = VisionPipeline::new(PipelineConfig {
            min_target_pixels: 21,
            ..config()
        });
        let report = pipeline.find_target(&scene()).unwrap();
        assert_eq!(report, Report::NoTarget { detected_pixels: 24 });
    }

    #[test]
    fn sessions_keep_independent_thresholds() {
        let noisy = RgbFrame::new(
            40,
            40,
            (0..1600).map(|i| if i % 2 == 0 { BLACK } else { GRAY }).collect(),
        )
        .unwrap();
        let quiet = RgbFrame::filled(40, 40, GRAY).unwrap();

        let cfg = PipelineConfig {
            max_colors: 1,
            initial_threshold: 1.0,
            ..config()
        };
        let mut first = VisionPipeline::new(cfg.clone());
        let mut second = VisionPipeline::new(cfg);

        let q = first.quantize(&noisy).unwrap();
        assert!(q.resets > 0);
        assert_eq!(first.threshold(), q.threshold);

        second.quantize(&quiet).unwrap();
        assert_eq!(second.threshold(), 1.0);
    }

    #[test]
    fn config_loads_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "target": { "red": 0, "green": 0, "blue": 255 }, "max_colors": 4 }"#,
        )
        .unwrap();
        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.target, RgbPixel::new(0, 0, 255));
        assert_eq!(loaded.max_colors, 4);
        assert_eq!(loaded.min_blob_size, PipelineConfig::default().min_blob_size);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(crate::core_modules::error::VisionError::Config(_))
        ));
    }
}
