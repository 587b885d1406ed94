// THEORY:
// The `frame` module is the shared data model of the segmentation core. Every
// component consumes and produces one of two frame shapes:
//
// - `RgbFrame`: a width x height buffer of `RgbPixel`s straight from capture.
// - `IndexedFrame`: a width x height buffer of palette positions plus the
//   `Palette` that gives them meaning. Quantized images, binary masks and blob
//   selections are all indexed frames; only the palette differs.
//
// Key architectural principles:
// 1.  **Validated construction**: Public constructors reject zero-sized frames,
//     buffers whose length is not `width * height`, palettes longer than an
//     `IndexedPixel` can address, and indices that point past the palette. Once
//     a frame exists, every component may rely on those invariants.
// 2.  **Exclusive ownership**: A frame owns its buffer and palette. Components
//     borrow their input and hand back a freshly allocated output owned by the
//     caller.
// 3.  **Fallible allocation**: Frame-sized buffers are reserved through
//     `try_reserve_exact` so that running out of memory surfaces as
//     `VisionError::AllocationFailed` instead of an abort. Conversions and
//     copies (`to_rgb`, `to_monochrome`, `try_clone`) follow the same rule.

use crate::core_modules::error::{Result, VisionError};
use crate::core_modules::pixel::pixel::{BLACK, IndexedPixel, RgbPixel, WHITE};
use image::RgbImage;

/// Number of palette entries an `IndexedPixel` can address.
pub const MAX_PALETTE_SIZE: usize = IndexedPixel::MAX as usize + 1;

pub type Palette = Vec<RgbPixel>;

/// The pixel-format tag of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Indexed,
}

/// Returns `width * height`, rejecting empty or overflowing geometry.
pub(crate) fn frame_area(width: usize, height: usize) -> Result<usize> {
    match width.checked_mul(height) {
        Some(area) if area > 0 => Ok(area),
        _ => Err(VisionError::InvalidDimensions { width, height }),
    }
}

/// Allocates a buffer of `len` copies of `value`, surfacing allocation failure.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Collects a frame-sized iterator, surfacing allocation failure.
pub(crate) fn try_collect<T>(len: usize, items: impl Iterator<Item = T>) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.extend(items.take(len));
    Ok(buffer)
}

/// A raw color frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    width: usize,
    height: usize,
    pixels: Vec<RgbPixel>,
}

impl RgbFrame {
    pub fn new(width: usize, height: usize, pixels: Vec<RgbPixel>) -> Result<Self> {
        let expected = frame_area(width, height)?;
        if pixels.len() != expected {
            return Err(VisionError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame where every pixel is `color`.
    pub fn filled(width: usize, height: usize, color: RgbPixel) -> Result<Self> {
        let pixels = try_filled(frame_area(width, height)?, color)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_rgb_image(image: &RgbImage) -> Result<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let pixels = try_collect(
            frame_area(width, height)?,
            image.pixels().map(|p| RgbPixel::from(*p)),
        )?;
        Self::new(width, height, pixels)
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            self.pixels[y as usize * self.width + x as usize].into()
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Rgb
    }

    pub fn pixels(&self) -> &[RgbPixel] {
        &self.pixels
    }

    pub fn pixel(&self, row: usize, col: usize) -> Option<&RgbPixel> {
        if row < self.height && col < self.width {
            self.pixels.get(row * self.width + col)
        } else {
            None
        }
    }

    /// Overwrites one pixel. Returns `false` when `(row, col)` is outside the frame.
    pub fn set_pixel(&mut self, row: usize, col: usize, color: RgbPixel) -> bool {
        if row >= self.height || col >= self.width {
            return false;
        }
        self.pixels[row * self.width + col] = color;
        true
    }
}

/// A palette-indexed frame: quantized images, binary masks and blob selections.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFrame {
    width: usize,
    height: usize,
    pixels: Vec<IndexedPixel>,
    palette: Palette,
}

impl IndexedFrame {
    pub fn new(
        width: usize,
        height: usize,
        pixels: Vec<IndexedPixel>,
        palette: Palette,
    ) -> Result<Self> {
        let expected = frame_area(width, height)?;
        if pixels.len() != expected {
            return Err(VisionError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        if palette.len() > MAX_PALETTE_SIZE {
            return Err(VisionError::PaletteTooLarge {
                len: palette.len(),
                max: MAX_PALETTE_SIZE,
            });
        }
        if let Some(&index) = pixels.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(VisionError::IndexOutOfPalette {
                index,
                palette_len: palette.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            palette,
        })
    }

    /// Builds a binary mask from a row-major grid of foreground flags.
    /// Foreground becomes index 1; the palette is `[BLACK, WHITE]`.
    pub fn binary_mask(width: usize, height: usize, foreground: &[bool]) -> Result<Self> {
        let pixels = try_collect(foreground.len(), foreground.iter().map(|&f| f as IndexedPixel))?;
        Self::new(width, height, pixels, vec![BLACK, WHITE])
    }

    /// Components construct their own outputs and uphold the invariants themselves.
    pub(crate) fn from_parts(
        width: usize,
        height: usize,
        pixels: Vec<IndexedPixel>,
        palette: Palette,
    ) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        debug_assert!(palette.len() <= MAX_PALETTE_SIZE);
        debug_assert!(pixels.iter().all(|&i| (i as usize) < palette.len()));
        Self {
            width,
            height,
            pixels,
            palette,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Indexed
    }

    pub fn pixels(&self) -> &[IndexedPixel] {
        &self.pixels
    }

    pub fn palette(&self) -> &[RgbPixel] {
        &self.palette
    }

    pub fn pixel(&self, row: usize, col: usize) -> Option<IndexedPixel> {
        if row < self.height && col < self.width {
            self.pixels.get(row * self.width + col).copied()
        } else {
            None
        }
    }

    /// Number of pixels holding palette index `index`.
    pub fn count_index(&self, index: IndexedPixel) -> usize {
        self.pixels.iter().filter(|&&p| p == index).count()
    }

    /// Maps every index through the palette.
    pub fn to_rgb(&self) -> Result<RgbFrame> {
        let pixels = try_collect(
            self.pixels.len(),
            self.pixels.iter().map(|&i| self.palette[i as usize]),
        )?;
        Ok(RgbFrame {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let index = self.pixels[y as usize * self.width + x as usize];
            self.palette[index as usize].into()
        })
    }

    /// Collapses the frame to two levels: pixels whose palette color is black
    /// become 0, everything else becomes 1. The palette becomes `[BLACK, WHITE]`.
    pub fn to_monochrome(&self) -> Result<IndexedFrame> {
        let pixels = try_collect(
            self.pixels.len(),
            self.pixels
                .iter()
                .map(|&i| (self.palette[i as usize] != BLACK) as IndexedPixel),
        )?;
        Ok(IndexedFrame::from_parts(
            self.width,
            self.height,
            pixels,
            vec![BLACK, WHITE],
        ))
    }

    /// Copy of this frame whose buffers are reserved fallibly.
    pub fn try_clone(&self) -> Result<IndexedFrame> {
        let mut palette = Vec::new();
        palette.try_reserve_exact(self.palette.len() + 1)?;
        palette.extend_from_slice(&self.palette);
        Ok(IndexedFrame {
            width: self.width,
            height: self.height,
            pixels: try_collect(self.pixels.len(), self.pixels.iter().copied())?,
            palette,
        })
    }

    pub(crate) fn set_index(&mut self, row: usize, col: usize, index: IndexedPixel) {
        debug_assert!((index as usize) < self.palette.len());
        self.pixels[row * self.width + col] = index;
    }

    pub(crate) fn push_palette_color(&mut self, color: RgbPixel) -> Result<IndexedPixel> {
        if self.palette.len() >= MAX_PALETTE_SIZE {
            return Err(VisionError::PaletteTooLarge {
                len: self.palette.len() + 1,
                max: MAX_PALETTE_SIZE,
            });
        }
        self.palette.push(color);
        Ok((self.palette.len() - 1) as IndexedPixel)
    }
}
