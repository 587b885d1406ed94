// THEORY:
// A single error type for the whole segmentation core. Only configuration
// faults, allocation failures and boundary I/O are errors here. A quantizer
// that needed fewer clusters than requested, or a mask with no foreground,
// are ordinary outcomes and are reported through return values instead.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("pixel buffer size mismatch: expected {expected} pixels, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("palette has {len} entries, at most {max} are addressable")]
    PaletteTooLarge { len: usize, max: usize },

    #[error("pixel index {index} is outside a palette of {palette_len} entries")]
    IndexOutOfPalette { index: u8, palette_len: usize },

    #[error("max_colors must be in 1..={max}, got {max_colors}")]
    InvalidMaxColors { max_colors: usize, max: usize },

    #[error("calibration threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("allocation failed: {0}")]
    AllocationFailed(#[from] TryReserveError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("stream worker unavailable: {0}")]
    WorkerUnavailable(String),
}

pub type Result<T> = std::result::Result<T, VisionError>;
