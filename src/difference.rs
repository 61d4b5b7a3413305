//! Frame-to-frame dissimilarity.
//!
//! The magnitude of change between two grayscale frames is the mean absolute
//! per-pixel intensity difference. Intensities are widened to `i16` before
//! subtracting, and absolute differences are accumulated as integers so the
//! result does not depend on summation order. With the `rayon` feature the
//! accumulation for large frames is spread across threads and yields the
//! same value as the sequential path.

use crate::error::KeyframeError;
use crate::frame::GrayFrame;

/// Frames with at least this many pixels are reduced in parallel when the
/// `rayon` feature is enabled.
#[cfg(feature = "rayon")]
const PARALLEL_PIXEL_THRESHOLD: usize = 1 << 18;

/// Computes the scalar dissimilarity between consecutive frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDifferenceMeter;

impl FrameDifferenceMeter {
    /// Create a meter.
    pub fn new() -> Self {
        Self
    }

    /// Mean absolute intensity difference between `previous` and `current`.
    ///
    /// The result is in `0.0..=255.0` and symmetric in its arguments.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::DimensionMismatch`] if the frames do not
    /// have the same width and height.
    pub fn difference(
        &self,
        previous: &GrayFrame,
        current: &GrayFrame,
    ) -> Result<f64, KeyframeError> {
        if previous.dimensions() != current.dimensions() {
            return Err(KeyframeError::DimensionMismatch {
                frame_index: current.index,
                time: current.time,
                previous_width: previous.width(),
                previous_height: previous.height(),
                current_width: current.width(),
                current_height: current.height(),
            });
        }

        let pixel_count = previous.pixels().len();
        if pixel_count == 0 {
            return Ok(0.0);
        }

        let total = absolute_difference_sum(previous.pixels(), current.pixels());
        Ok(total as f64 / pixel_count as f64)
    }
}

#[cfg(not(feature = "rayon"))]
fn absolute_difference_sum(previous: &[u8], current: &[u8]) -> u64 {
    sequential_sum(previous, current)
}

#[cfg(feature = "rayon")]
fn absolute_difference_sum(previous: &[u8], current: &[u8]) -> u64 {
    use ::rayon::prelude::*;

    if previous.len() < PARALLEL_PIXEL_THRESHOLD {
        return sequential_sum(previous, current);
    }

    previous
        .par_chunks(1 << 14)
        .zip(current.par_chunks(1 << 14))
        .map(|(a, b)| sequential_sum(a, b))
        .sum()
}

fn sequential_sum(previous: &[u8], current: &[u8]) -> u64 {
    previous
        .iter()
        .zip(current)
        .map(|(&a, &b)| (a as i16 - b as i16).unsigned_abs() as u64)
        .sum()
}
