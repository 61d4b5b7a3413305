//! Lookahead window over recent difference magnitudes.
//!
//! [`LookAheadWindow`] is a fixed-capacity FIFO. Once full, its center
//! sample trails the newest one by `capacity / 2` samples, so the samples
//! after the center reveal whether it was a peak before the engine commits
//! to it.

use std::collections::VecDeque;
use std::collections::vec_deque::Iter;

use crate::error::KeyframeError;

/// Largest window [`LookAheadWindow::for_duration`] accepts, in samples.
pub const MAX_WINDOW_CAPACITY: usize = 1 << 16;

/// Samples allocated up front; larger windows grow on demand.
const PREALLOCATED_SAMPLES: usize = 256;

/// One point of the difference signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeSample {
    /// Time of the frame the magnitude was measured at, in seconds.
    pub time: f64,
    /// Index of that frame.
    pub frame_index: u64,
    /// Mean absolute difference to the preceding frame.
    pub magnitude: f64,
}

impl MagnitudeSample {
    /// Create a sample for the frame at `time`.
    pub fn new(time: f64, frame_index: u64, magnitude: f64) -> Self {
        Self {
            time,
            frame_index,
            magnitude,
        }
    }
}

/// Fixed-capacity FIFO of [`MagnitudeSample`]s.
#[derive(Debug, Clone)]
pub struct LookAheadWindow {
    samples: VecDeque<MagnitudeSample>,
    capacity: usize,
}

impl LookAheadWindow {
    /// Create a window of `capacity` samples (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(PREALLOCATED_SAMPLES)),
            capacity,
        }
    }

    /// Size the window to span `look_ahead_time` seconds of video at
    /// `frames_per_second`: `round(look_ahead_time * fps)`, minimum 1.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] if `frames_per_second` is
    /// not a positive finite number, `look_ahead_time` is negative, or the
    /// window would exceed [`MAX_WINDOW_CAPACITY`] samples.
    pub fn for_duration(look_ahead_time: f64, frames_per_second: f64) -> Result<Self, KeyframeError> {
        if !(frames_per_second.is_finite() && frames_per_second > 0.0) {
            return Err(KeyframeError::InvalidConfig(format!(
                "frames per second must be positive, got {frames_per_second}"
            )));
        }
        if !(look_ahead_time.is_finite() && look_ahead_time >= 0.0) {
            return Err(KeyframeError::InvalidConfig(format!(
                "look_ahead_time must be non-negative, got {look_ahead_time}"
            )));
        }

        let samples = (look_ahead_time * frames_per_second).round();
        if samples > MAX_WINDOW_CAPACITY as f64 {
            return Err(KeyframeError::InvalidConfig(format!(
                "look_ahead_time of {look_ahead_time}s at {frames_per_second} fps needs {samples} samples, more than the {MAX_WINDOW_CAPACITY} allowed"
            )));
        }
        Ok(Self::with_capacity(samples as usize))
    }

    /// Append a sample, evicting the oldest one if the window is full.
    pub fn push(&mut self, sample: MagnitudeSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// `true` once `capacity` samples are buffered.
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// `true` if no sample is buffered.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples the window holds when full.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The sample at `len / 2`, only once the window is full.
    pub fn center(&self) -> Option<MagnitudeSample> {
        if !self.is_full() {
            return None;
        }
        self.samples.get(self.samples.len() / 2).copied()
    }

    /// Largest magnitude currently buffered (`f64::NEG_INFINITY` when empty).
    pub fn max_magnitude(&self) -> f64 {
        self.samples
            .iter()
            .map(|sample| sample.magnitude)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> Iter<'_, MagnitudeSample> {
        self.samples.iter()
    }

    /// Drop every buffered sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
