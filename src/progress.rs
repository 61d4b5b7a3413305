//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring a detection run,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keyframe_detector::{DetectionConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!(
//!             "{} frames, {} keyframes",
//!             info.frames_processed, info.keyframes_detected
//!         );
//!     }
//! }
//!
//! let config = DetectionConfig::new()
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_batch_size(100);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of detection progress.
///
/// Delivered to [`ProgressCallback::on_progress`] every
/// [`batch_size`](crate::DetectionConfig::with_batch_size) frames and once
/// more when the run ends.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames pulled from the source so far, including skipped ones.
    pub frames_processed: u64,
    /// Total frames expected, if the source knows.
    pub total_frames: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total_frames` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Timestamp of the most recent frame, in seconds.
    pub current_time: Option<f64>,
    /// Keyframes decided so far.
    pub keyframes_detected: usize,
}

/// Trait for receiving progress updates during detection.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// run. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during a detection run.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Used when no callback is set.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone the token and call [`cancel`](CancellationToken::cancel) from any
/// thread. The detection loop checks it before pulling each frame and stops
/// cleanly, keeping every keyframe decided so far.
///
/// # Example
///
/// ```
/// use keyframe_detector::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// `true` once any clone called [`cancel`](Self::cancel).
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks throughput and fires the callback every `batch_size` frames.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    frames_since_last_report: u64,
    current_time: Option<f64>,
    keyframes: usize,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>, batch_size: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            frames_since_last_report: 0,
            current_time: None,
            keyframes: 0,
        }
    }

    /// Record one pulled frame.
    pub(crate) fn advance(&mut self, time: f64, keyframes: usize) {
        self.current += 1;
        self.frames_since_last_report += 1;
        self.current_time = Some(time);
        self.keyframes = keyframes;

        if self.frames_since_last_report >= self.batch_size {
            self.report();
            self.frames_since_last_report = 0;
        }
    }

    /// Emit the final report.
    pub(crate) fn finish(&mut self, keyframes: usize) {
        self.keyframes = keyframes;
        self.report();
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32 * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            frames_processed: self.current,
            total_frames: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_time: self.current_time,
            keyframes_detected: self.keyframes,
        });
    }
}
