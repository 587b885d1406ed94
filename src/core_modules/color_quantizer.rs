// THEORY:
// The `ColorQuantizer` discovers a compact palette for a scene whose target color
// is not known ahead of time. It is an online, bounded-cardinality clustering pass
// with a self-correcting retry loop.
//
// Algorithm:
// 1.  **Streaming assignment**: Pixels are visited once, in reverse raster order.
//     Each pixel joins the nearest active cluster when that cluster's running mean
//     is closer than the calibration threshold. Otherwise it seeds a new cluster,
//     as long as the cluster budget allows.
// 2.  **Lost colors**: When no cluster is close enough and the budget is spent, the
//     pixel is forced into the nearest cluster anyway. Each such forced assignment
//     is a "lost-color event" and means the threshold is too tight for this scene.
// 3.  **Recalibration**: Past `LOST_COLOR_LIMIT` lost colors, the pass is abandoned:
//     every cluster is discarded, the threshold grows by one, and the scan restarts
//     from the first pixel. The threshold only ever grows, so once it exceeds the
//     largest possible color distance every pixel matches and the loop ends.
// 4.  **Finalization**: Cluster means are rounded into palette entries. The palette
//     always has `max_colors + 1` slots; unused slots keep the sentinel color.
//
// The threshold is explicit state owned by the caller. It goes in as a value and
// the adjusted value comes back in the `Quantization`, so two camera sessions never
// share calibration. `CalibrationState` is the small wrapper a session keeps.

use crate::core_modules::error::{Result, VisionError};
use crate::core_modules::frame::{IndexedFrame, MAX_PALETTE_SIZE, RgbFrame, try_filled};
use crate::core_modules::pixel::pixel::{Distance, IndexedPixel, MeanColor, RgbPixel, WHITE};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Forced assignments tolerated in one pass before the pass is restarted.
pub const LOST_COLOR_LIMIT: usize = 500;
/// Largest cluster budget; the extra sentinel slot must stay addressable.
pub const MAX_COLORS: usize = MAX_PALETTE_SIZE - 1;
/// Color of palette slots no cluster claimed.
pub const SENTINEL_COLOR: RgbPixel = WHITE;

/// Whether the scene filled the whole cluster budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Every requested cluster was used.
    Calibrated,
    /// The scene needed fewer clusters than requested. Not an error.
    Underdetermined,
}

/// Result of one quantization call.
#[derive(Debug, Clone)]
pub struct Quantization {
    /// Indexed frame with a palette of exactly `max_colors + 1` entries.
    pub frame: IndexedFrame,
    pub status: CalibrationStatus,
    /// The threshold after any recalibration. Feed this into the next call.
    pub threshold: f64,
    pub clusters_used: usize,
    /// How many times the pass was restarted with a larger threshold.
    pub resets: u32,
}

/// A provisional color group with its running mean.
#[derive(Debug, Clone)]
struct Cluster {
    mean: MeanColor,
    count: u64,
}

impl Cluster {
    fn seed(pixel: &RgbPixel) -> Self {
        Self {
            mean: MeanColor::from(*pixel),
            count: 1,
        }
    }

    fn absorb(&mut self, pixel: &RgbPixel) {
        self.mean.absorb(pixel, self.count);
        self.count += 1;
    }
}

/// Nearest cluster and its distance. Ties keep the earliest cluster.
fn nearest_cluster(clusters: &[Cluster], pixel: &RgbPixel) -> Option<(usize, Distance)> {
    let mut nearest: Option<(usize, Distance)> = None;
    for (slot, cluster) in clusters.iter().enumerate() {
        let d = cluster.mean.distance(pixel);
        if nearest.is_none_or(|(_, best)| d < best) {
            nearest = Some((slot, d));
        }
    }
    nearest
}

fn validate(max_colors: usize, threshold: f64) -> Result<()> {
    if max_colors == 0 || max_colors > MAX_COLORS {
        return Err(VisionError::InvalidMaxColors {
            max_colors,
            max: MAX_COLORS,
        });
    }
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(VisionError::InvalidThreshold(threshold));
    }
    Ok(())
}

/// Reduces `frame` to at most `max_colors` clusters.
///
/// `threshold` is the starting calibration threshold: the largest color distance
/// still accepted as a cluster match. The returned `Quantization::threshold` is
/// at least as large and should be carried into the next call for the same camera.
pub fn quantize(frame: &RgbFrame, max_colors: usize, threshold: f64) -> Result<Quantization> {
    validate(max_colors, threshold)?;

    let mut assignments: Vec<IndexedPixel> = try_filled(frame.len(), 0)?;
    let mut clusters: Vec<Cluster> = Vec::new();
    clusters.try_reserve_exact(max_colors)?;
    let mut threshold = threshold;
    let mut resets = 0u32;

    'scan: loop {
        clusters.clear();
        let mut lost_colors = 0usize;

        for (index, pixel) in frame.pixels().iter().enumerate().rev() {
            let slot = match nearest_cluster(&clusters, pixel) {
                Some((slot, d)) if d < threshold => slot,
                Some((slot, _)) if clusters.len() >= max_colors => {
                    lost_colors += 1;
                    if lost_colors > LOST_COLOR_LIMIT {
                        threshold += 1.0;
                        resets += 1;
                        warn!(
                            "quantizer lost more than {} colors, recalibrating with threshold {}",
                            LOST_COLOR_LIMIT, threshold
                        );
                        continue 'scan;
                    }
                    slot
                }
                _ => {
                    clusters.push(Cluster::seed(pixel));
                    assignments[index] = (clusters.len() - 1) as IndexedPixel;
                    continue;
                }
            };
            clusters[slot].absorb(pixel);
            assignments[index] = slot as IndexedPixel;
        }
        break;
    }

    let mut palette = try_filled(max_colors + 1, SENTINEL_COLOR)?;
    for (entry, cluster) in palette.iter_mut().zip(&clusters) {
        *entry = cluster.mean.to_pixel();
    }

    let clusters_used = clusters.len();
    let status = if clusters_used == max_colors {
        CalibrationStatus::Calibrated
    } else {
        CalibrationStatus::Underdetermined
    };
    debug!(
        "quantized {}x{} frame into {}/{} clusters, status {:?}, threshold {}, resets {}",
        frame.width(),
        frame.height(),
        clusters_used,
        max_colors,
        status,
        threshold,
        resets
    );

    Ok(Quantization {
        frame: IndexedFrame::from_parts(frame.width(), frame.height(), assignments, palette),
        status,
        threshold,
        clusters_used,
        resets,
    })
}

/// Caller-owned calibration threshold, one per camera session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub threshold: f64,
}

impl CalibrationState {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Runs `quantize` with this state's threshold and keeps the adjusted one.
    pub fn quantize(&mut self, frame: &RgbFrame, max_colors: usize) -> Result<Quantization> {
        let quantization = quantize(frame, max_colors, self.threshold)?;
        self.threshold = quantization.threshold;
        Ok(quantization)
    }
}
