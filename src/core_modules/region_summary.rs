// THEORY:
// The `RegionSummarizer` turns the largest-blob mask into the few numbers a control
// loop steers by: the enclosing rectangle, its midpoint as a linear pixel index,
// and the foreground centroid. It is a thin consumer of the `BlobExtractor`.
//
// Any non-zero index counts as foreground. An empty mask does not fail; it
// produces a degenerate box (`top > bottom`, `left > right`) and no center, and
// callers are expected to check for that before steering on it.

use crate::core_modules::error::Result;
use crate::core_modules::frame::IndexedFrame;
use crate::core_modules::pixel::pixel::WHITE;
use serde::Serialize;

/// Inclusive pixel bounds of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl BoundingBox {
    /// True when the scanned mask had no foreground at all.
    pub fn is_degenerate(&self) -> bool {
        self.top > self.bottom || self.left > self.right
    }

    pub fn width(&self) -> Option<usize> {
        (!self.is_degenerate()).then(|| self.right - self.left + 1)
    }

    pub fn height(&self) -> Option<usize> {
        (!self.is_degenerate()).then(|| self.bottom - self.top + 1)
    }

    /// Linear index of the box midpoint in a frame `frame_width` pixels wide.
    pub fn center_index(&self, frame_width: usize) -> Option<usize> {
        (!self.is_degenerate())
            .then(|| frame_width * ((self.top + self.bottom) / 2) + (self.left + self.right) / 2)
    }
}

/// Smallest box enclosing every foreground pixel of `mask`.
pub fn bounding_box(mask: &IndexedFrame) -> BoundingBox {
    let (width, height) = (mask.width(), mask.height());
    let mut bounds = BoundingBox {
        top: height,
        bottom: 0,
        left: width,
        right: 0,
    };

    for (index, &value) in mask.pixels().iter().enumerate() {
        if value == 0 {
            continue;
        }
        let (row, col) = (index / width, index % width);
        bounds.top = bounds.top.min(row);
        bounds.bottom = bounds.bottom.max(row);
        bounds.left = bounds.left.min(col);
        bounds.right = bounds.right.max(col);
    }
    bounds
}

/// Linear index of the bounding-box midpoint, `None` for an empty mask.
pub fn center(mask: &IndexedFrame) -> Option<usize> {
    bounding_box(mask).center_index(mask.width())
}

/// Mean `(row, col)` of the foreground pixels.
pub fn centroid(mask: &IndexedFrame) -> Option<(f64, f64)> {
    let width = mask.width();
    let (mut rows, mut cols, mut count) = (0.0, 0.0, 0usize);
    for (index, _) in mask.pixels().iter().enumerate().filter(|(_, v)| **v != 0) {
        rows += (index / width) as f64;
        cols += (index % width) as f64;
        count += 1;
    }
    (count > 0).then(|| (rows / count as f64, cols / count as f64))
}

/// Copy of `mask` with its bounding box outlined in a new white palette entry.
pub fn draw_bounding_box(mask: &IndexedFrame) -> Result<IndexedFrame> {
    let bounds = bounding_box(mask);
    let mut out = mask.try_clone()?;
    let edge = out.push_palette_color(WHITE)?;
    if bounds.is_degenerate() {
        return Ok(out);
    }

    for col in bounds.left..=bounds.right {
        out.set_index(bounds.top, col, edge);
        out.set_index(bounds.bottom, col, edge);
    }
    for row in bounds.top..=bounds.bottom {
        out.set_index(row, bounds.left, edge);
        out.set_index(row, bounds.right, edge);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(width: usize, height: usize, points: &[(usize, usize)]) -> IndexedFrame {
        let mut flags = vec![false; width * height];
        for &(row, col) in points {
            flags[row * width + col] = true;
        }
        IndexedFrame::binary_mask(width, height, &flags).unwrap()
    }

    #[test]
    fn single_pixel_box_collapses_to_that_pixel() {
        let bounds = bounding_box(&mask(9, 7, &[(4, 6)]));
        assert_eq!(
            bounds,
            BoundingBox {
                top: 4,
                bottom: 4,
                left: 6,
                right: 6
            }
        );
        assert!(!bounds.is_degenerate());
        assert_eq!(bounds.width(), Some(1));
        assert_eq!(center(&mask(9, 7, &[(4, 6)])), Some(4 * 9 + 6));
    }

    #[test]
    fn empty_mask_gives_degenerate_box() {
        let empty = mask(5, 4, &[]);
        let bounds = bounding_box(&empty);
        assert!(bounds.is_degenerate());
        assert!(bounds.top > bounds.bottom);
        assert!(bounds.left > bounds.right);
        assert_eq!(bounds.height(), None);
        assert_eq!(center(&empty), None);
        assert_eq!(centroid(&empty), None);
    }

    #[test]
    fn center_rounds_down() {
        let m = mask(10, 10, &[(1, 2), (4, 7)]);
        let bounds = bounding_box(&m);
        assert_eq!((bounds.top, bounds.bottom, bounds.left, bounds.right), (1, 4, 2, 7));
        assert_eq!(center(&m), Some(10 * 2 + 4));
        assert_eq!(centroid(&m), Some((2.5, 4.5)));
    }

    #[test]
    fn drawn_box_outlines_the_region() {
        let m = mask(6, 6, &[(1, 1), (3, 4)]);
        let boxed = draw_bounding_box(&m).unwrap();
        assert_eq!(boxed.palette().len(), 3);
        assert_eq!(boxed.palette()[2], WHITE);
        for col in 1..=4 {
            assert_eq!(boxed.pixel(1, col), Some(2));
            assert_eq!(boxed.pixel(3, col), Some(2));
        }
        assert_eq!(boxed.pixel(2, 1), Some(2));
        assert_eq!(boxed.pixel(2, 4), Some(2));
        assert_eq!(boxed.pixel(2, 2), Some(0));
        assert_eq!(boxed.pixel(0, 0), Some(0));
    }

    #[test]
    fn drawing_an_empty_mask_leaves_pixels_alone() {
        let m = mask(4, 4, &[]);
        let boxed = draw_bounding_box(&m).unwrap();
        assert_eq!(boxed.pixels(), m.pixels());
        assert_eq!(boxed.palette().len(), 3);
    }
}
