// THEORY:
// The `BlobExtractor` isolates the single largest 8-connected foreground region of
// a binary mask. It is the spatial grouping stage between "which pixels look like
// the target" and "where is the object".
//
// Key architectural principles:
// 1.  **No recursion**: Flood fill is an explicit depth-first traversal. Each stack
//     entry is a `(pixel, neighbor cursor)` pair, so the worst case (a frame-sized
//     snake) costs heap entries, not call-stack frames.
// 2.  **Label once, count once**: A pixel is labeled the first time its entry is on
//     top of the stack (cursor 0), which stops it from being pushed twice. It is
//     counted when its entry is popped after all eight neighbors were tried.
// 3.  **Border safety**: Neighbors are computed from row and column deltas and any
//     neighbor outside `[0, width) x [0, height)` is skipped. A pixel on the last
//     column is never linked to the first column of the next row.
// 4.  **Deterministic selection**: Pixels are scanned in reverse raster order and
//     the largest blob is replaced only by a strictly larger one, so ties keep the
//     blob discovered first.
// 5.  **Fallible growth**: The label buffer, the traversal stack and the blob-size
//     table all grow through `try_reserve`, and a failed reservation is returned
//     as an error instead of silently truncating the result.

use crate::core_modules::error::Result;
use crate::core_modules::frame::{IndexedFrame, try_filled};
use crate::core_modules::pixel::pixel::{BLACK, IndexedPixel, RED};
use log::debug;

pub const FOREGROUND_INDEX: IndexedPixel = 1;
pub const BACKGROUND_INDEX: IndexedPixel = 0;

pub type BlobId = usize;

const UNVISITED: BlobId = BlobId::MAX;
const BLOB_TABLE_CHUNK: usize = 16;

/// `(row delta, column delta)`: three above, left, right, three below.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One pending pixel of the depth-first traversal.
#[derive(Debug, Clone, Copy)]
struct TraversalFrame {
    index: usize,
    cursor: u8,
}

fn neighbor_index(index: usize, cursor: u8, width: usize, height: usize) -> Option<usize> {
    let (dr, dc) = NEIGHBOR_OFFSETS[cursor as usize];
    let row = (index / width).checked_add_signed(dr)?;
    let col = (index % width).checked_add_signed(dc)?;
    (row < height && col < width).then_some(row * width + col)
}

/// Per-pixel blob labels and the blob-size table of one mask.
#[derive(Debug, Clone)]
pub struct BlobLabeling {
    width: usize,
    height: usize,
    labels: Vec<BlobId>,
    sizes: Vec<usize>,
    largest: Option<BlobId>,
}

impl BlobLabeling {
    pub fn blob_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn largest(&self) -> Option<BlobId> {
        self.largest
    }

    pub fn largest_size(&self) -> usize {
        self.largest.map_or(0, |blob| self.sizes[blob])
    }

    pub fn label(&self, row: usize, col: usize) -> Option<BlobId> {
        if row >= self.height || col >= self.width {
            return None;
        }
        match self.labels[row * self.width + col] {
            UNVISITED => None,
            blob => Some(blob),
        }
    }

    /// Binary frame holding only `blob` as foreground.
    pub fn select(&self, blob: Option<BlobId>) -> Result<IndexedFrame> {
        let mut pixels = try_filled(self.labels.len(), BACKGROUND_INDEX)?;
        if let Some(blob) = blob {
            for (out, &label) in pixels.iter_mut().zip(&self.labels) {
                if label == blob {
                    *out = FOREGROUND_INDEX;
                }
            }
        }
        Ok(IndexedFrame::from_parts(
            self.width,
            self.height,
            pixels,
            vec![BLACK, RED],
        ))
    }
}

/// Labels every 8-connected foreground region of `mask`. Foreground is index 1;
/// every other index is background.
pub fn label_blobs(mask: &IndexedFrame) -> Result<BlobLabeling> {
    let (width, height) = (mask.width(), mask.height());
    let pixels = mask.pixels();
    let mut labels = try_filled(pixels.len(), UNVISITED)?;
    let mut sizes: Vec<usize> = Vec::new();
    let mut stack: Vec<TraversalFrame> = Vec::new();
    let mut largest: Option<BlobId> = None;

    for start in (0..pixels.len()).rev() {
        if pixels[start] != FOREGROUND_INDEX || labels[start] != UNVISITED {
            continue;
        }

        if sizes.len() == sizes.capacity() {
            sizes.try_reserve(BLOB_TABLE_CHUNK)?;
        }
        let blob = sizes.len();
        sizes.push(0);

        stack.try_reserve(1)?;
        stack.push(TraversalFrame {
            index: start,
            cursor: 0,
        });

        while let Some(top) = stack.last_mut() {
            if top.cursor as usize == NEIGHBOR_OFFSETS.len() {
                sizes[blob] += 1;
                stack.pop();
                continue;
            }
            if top.cursor == 0 {
                labels[top.index] = blob;
            }

            let (index, cursor) = (top.index, top.cursor);
            top.cursor += 1;

            if let Some(next) = neighbor_index(index, cursor, width, height) {
                if pixels[next] == FOREGROUND_INDEX && labels[next] == UNVISITED {
                    stack.try_reserve(1)?;
                    stack.push(TraversalFrame {
                        index: next,
                        cursor: 0,
                    });
                }
            }
        }

        if largest.is_none_or(|best| sizes[best] < sizes[blob]) {
            largest = Some(blob);
        }
    }

    debug!(
        "labeled {} blobs in {}x{} mask, largest {:?}",
        sizes.len(),
        width,
        height,
        largest.map(|blob| sizes[blob])
    );

    Ok(BlobLabeling {
        width,
        height,
        labels,
        sizes,
        largest,
    })
}

/// Keeps only the largest blob of `mask`. Output palette: `[BLACK, RED]`.
pub fn extract_largest(mask: &IndexedFrame) -> Result<IndexedFrame> {
    let labeling = label_blobs(mask)?;
    labeling.select(labeling.largest())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_squares(width: usize, height: usize, squares: &[(usize, usize, usize)]) -> IndexedFrame {
        let mut flags = vec![false; width * height];
        for &(top, left, side) in squares {
            for row in top..top + side {
                for col in left..left + side {
                    flags[row * width + col] = true;
                }
            }
        }
        IndexedFrame::binary_mask(width, height, &flags).unwrap()
    }

    fn foreground(frame: &IndexedFrame) -> Vec<(usize, usize)> {
        (0..frame.height())
            .flat_map(|row| (0..frame.width()).map(move |col| (row, col)))
            .filter(|&(row, col)| frame.pixel(row, col) == Some(FOREGROUND_INDEX))
            .collect()
    }

    #[test]
    fn keeps_the_larger_of_two_squares() {
        let mask = mask_with_squares(12, 12, &[(0, 0, 3), (6, 6, 4)]);
        let out = extract_largest(&mask).unwrap();
        let kept = foreground(&out);
        assert_eq!(kept.len(), 16);
        assert!(kept.iter().all(|&(r, c)| (6..10).contains(&r) && (6..10).contains(&c)));
        assert_eq!(out.palette(), &[BLACK, RED]);
    }

    #[test]
    fn larger_square_wins_regardless_of_position() {
        let mask = mask_with_squares(12, 12, &[(0, 0, 4), (8, 8, 3)]);
        let kept = foreground(&extract_largest(&mask).unwrap());
        assert_eq!(kept.len(), 16);
        assert!(kept.contains(&(0, 0)));
    }

    #[test]
    fn equal_squares_keep_the_first_discovered() {
        // Reverse raster scan reaches the bottom-right square first.
        let mask = mask_with_squares(10, 10, &[(0, 0, 3), (7, 7, 3)]);
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.blob_count(), 2);
        assert_eq!(labeling.largest(), Some(0));
        assert_eq!(labeling.label(9, 9), Some(0));
        assert_eq!(labeling.label(0, 0), Some(1));

        let kept = foreground(&extract_largest(&mask).unwrap());
        assert_eq!(kept.len(), 9);
        assert!(kept.contains(&(9, 9)));
    }

    #[test]
    fn empty_mask_yields_empty_output() {
        let mask = IndexedFrame::binary_mask(8, 5, &[false; 40]).unwrap();
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.blob_count(), 0);
        assert_eq!(labeling.largest(), None);
        assert_eq!(labeling.largest_size(), 0);
        let out = extract_largest(&mask).unwrap();
        assert!(out.pixels().iter().all(|&i| i == BACKGROUND_INDEX));
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let mut flags = vec![false; 6 * 6];
        for i in 0..4 {
            flags[i * 6 + i] = true;
        }
        flags[5 * 6] = true;
        flags[5 * 6 + 1] = true;
        let mask = IndexedFrame::binary_mask(6, 6, &flags).unwrap();
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.blob_count(), 2);
        assert_eq!(labeling.largest_size(), 4);
        let kept = foreground(&labeling.select(labeling.largest()).unwrap());
        assert_eq!(kept, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn rows_do_not_wrap_at_the_border() {
        // (0, 4) and (1, 0) are adjacent in memory but not in the image.
        let mut flags = vec![false; 5 * 3];
        flags[4] = true;
        flags[5] = true;
        let mask = IndexedFrame::binary_mask(5, 3, &flags).unwrap();
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.blob_count(), 2);
        assert_eq!(labeling.sizes(), &[1, 1]);
    }

    #[test]
    fn full_frame_is_one_blob_without_deep_recursion() {
        let (width, height) = (300, 200);
        let mask = IndexedFrame::binary_mask(width, height, &vec![true; width * height]).unwrap();
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.blob_count(), 1);
        assert_eq!(labeling.largest_size(), width * height);
        let out = labeling.select(labeling.largest()).unwrap();
        assert_eq!(out.count_index(FOREGROUND_INDEX), width * height);
    }

    #[test]
    fn many_isolated_pixels_grow_the_size_table() {
        let (width, height) = (20, 20);
        let flags: Vec<bool> = (0..width * height)
            .map(|i| (i / width) % 2 == 0 && (i % width) % 2 == 0)
            .collect();
        let mask = IndexedFrame::binary_mask(width, height, &flags).unwrap();
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.blob_count(), 100);
        assert!(labeling.sizes().iter().all(|&s| s == 1));
        // All ties: the first pixel reached in reverse raster order wins.
        assert_eq!(labeling.largest(), Some(0));
        assert_eq!(labeling.label(18, 18), Some(0));
    }

    #[test]
    fn sizes_account_for_every_foreground_pixel() {
        let mask = mask_with_squares(16, 16, &[(0, 0, 2), (4, 4, 5), (12, 1, 3)]);
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.sizes().iter().sum::<usize>(), 4 + 25 + 9);
        assert_eq!(labeling.largest_size(), 25);
    }

    #[test]
    fn indices_other_than_one_are_background() {
        let mask = IndexedFrame::new(3, 1, vec![2, 1, 0], vec![BLACK, RED, BLACK]).unwrap();
        let labeling = label_blobs(&mask).unwrap();
        assert_eq!(labeling.blob_count(), 1);
        assert_eq!(labeling.label(0, 0), None);
        assert_eq!(labeling.label(0, 1), Some(0));
    }
}
