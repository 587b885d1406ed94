// THEORY:
// The `TargetColorLocator` finds the part of a frame closest to a known target
// color without a fixed color tolerance. The tolerance is derived per frame from
// the frame's own distance distribution, so the locator follows lighting and
// contrast changes on its own.
//
// Algorithm:
// 1.  **Histogram**: One scan bins every pixel by its whole-number distance to the
//     target (bins 0..=443) while keeping the frame's running mean color.
// 2.  **Baseline**: The distance from the target to the mean color estimates how
//     far a "typical" pixel sits from the target.
// 3.  **Threshold walk**: Bins are accumulated from distance 0 upward. The walk
//     stops once enough pixels are collected (`min_blob_size`) *and* the walk has
//     passed halfway from the closest observed distance to the baseline, or when
//     it reaches the `max_distance` hard cap.
// 4.  **Mask**: Pixels closer than the stopping distance are "found" (index 0,
//     painted white so a dark target still shows up); everything else is index 1.

use crate::core_modules::error::Result;
use crate::core_modules::frame::{IndexedFrame, RgbFrame, try_filled};
use crate::core_modules::pixel::pixel::{BLACK, IndexedPixel, MeanColor, RgbPixel, WHITE};
use log::debug;

/// Distance bins `0..=443`; the largest RGB distance is just under 442.
pub const HISTOGRAM_BINS: usize = 444;
pub const FOUND_INDEX: IndexedPixel = 0;
pub const BACKGROUND_INDEX: IndexedPixel = 1;

/// Result of one locate call.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Binary mask: `FOUND_INDEX` (white) or `BACKGROUND_INDEX` (black).
    pub mask: IndexedFrame,
    /// Pixels accumulated by the walk at the chosen threshold.
    pub detected_pixels: usize,
    /// Pixels whose distance bin is below this are foreground.
    pub threshold: usize,
    pub baseline_distance: usize,
    pub min_observed_distance: Option<usize>,
}

fn distance_bin(pixel: &RgbPixel, target: &RgbPixel) -> usize {
    (pixel.distance(target) as usize).min(HISTOGRAM_BINS - 1)
}

/// Walks the histogram and returns `(threshold, accumulated pixels, closest bin)`.
fn walk_histogram(
    histogram: &[usize],
    baseline: usize,
    min_blob_size: usize,
    max_distance: usize,
) -> (usize, usize, Option<usize>) {
    let cap = max_distance.min(histogram.len());
    // -1 until a populated bin has been seen.
    let mut closest: i64 = -1;
    let mut blob_size = 0usize;
    let mut threshold = 0usize;

    while threshold < cap {
        let midpoint = closest + (baseline as i64 - closest) / 2;
        if blob_size >= min_blob_size && threshold as i64 >= midpoint {
            break;
        }
        if histogram[threshold] != 0 && closest < 0 {
            closest = threshold as i64;
        }
        blob_size += histogram[threshold];
        threshold += 1;
    }

    let closest = (closest >= 0).then_some(closest as usize);
    (threshold, blob_size, closest)
}

/// Marks the pixels of `frame` closest to `target`.
pub fn locate(
    frame: &RgbFrame,
    target: &RgbPixel,
    min_blob_size: usize,
    max_distance: usize,
) -> Result<Detection> {
    let mut histogram = try_filled(HISTOGRAM_BINS, 0usize)?;
    let mut mean = MeanColor::default();
    for (seen, pixel) in frame.pixels().iter().enumerate() {
        histogram[distance_bin(pixel, target)] += 1;
        mean.absorb(pixel, seen as u64);
    }

    let baseline = mean.distance(target) as usize;
    let (threshold, detected_pixels, min_observed_distance) =
        walk_histogram(&histogram, baseline, min_blob_size, max_distance);

    let mut pixels = try_filled(frame.len(), BACKGROUND_INDEX)?;
    for (out, pixel) in pixels.iter_mut().zip(frame.pixels()) {
        if distance_bin(pixel, target) < threshold {
            *out = FOUND_INDEX;
        }
    }

    debug!(
        "located target {:?}: threshold {}, baseline {}, closest {:?}, {} pixels",
        target, threshold, baseline, min_observed_distance, detected_pixels
    );

    Ok(Detection {
        mask: IndexedFrame::from_parts(frame.width(), frame.height(), pixels, vec![WHITE, BLACK]),
        detected_pixels,
        threshold,
        baseline_distance: baseline,
        min_observed_distance,
    })
}
