//! Detection configuration.
//!
//! [`DetectionConfig`] is a builder that carries the tuning presets, the
//! decision strategy, time bounds, output mode, progress callback and
//! cancellation token for one run. It is validated once, before any frame
//! is read, by [`DetectionConfig::policy_parameters`].
//!
//! # Example
//!
//! ```
//! use keyframe_detector::{ContentType, DetectionConfig, OutputMode, Sensitivity};
//!
//! let config = DetectionConfig::new()
//!     .with_sensitivity(Sensitivity::High)
//!     .with_content_type(ContentType::Documentary)
//!     .with_max_time_constraint(10.0)
//!     .with_time_bounds(Some(5.0), Some(60.0))
//!     .with_output_mode(OutputMode::JsonDebug);
//!
//! let params = config.policy_parameters()?;
//! assert_eq!(params.max_time_constraint, Some(10.0));
//! assert!(config.debug_enabled());
//! # Ok::<(), keyframe_detector::KeyframeError>(())
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use crate::detector::DecisionStrategy;
use crate::error::KeyframeError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};
use crate::tuning::{ContentType, PolicyParameters, Sensitivity, TuningOptions};

/// What a run writes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Save an image per keyframe. This is the default.
    #[default]
    Images,
    /// Save images and write the keyframe metadata JSON.
    Json,
    /// Write the metadata JSON only.
    JsonOnly,
    /// Write the metadata JSON with decision debug fields, no images.
    JsonDebug,
}

impl OutputMode {
    /// `true` if keyframe images are written.
    pub fn saves_images(self) -> bool {
        matches!(self, OutputMode::Images | OutputMode::Json)
    }

    /// `true` if the metadata JSON is written.
    pub fn writes_json(self) -> bool {
        !matches!(self, OutputMode::Images)
    }

    /// `true` if events carry debug fields.
    pub fn includes_debug(self) -> bool {
        matches!(self, OutputMode::JsonDebug)
    }

    /// The name accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Images => "images",
            OutputMode::Json => "json",
            OutputMode::JsonOnly => "json_only",
            OutputMode::JsonDebug => "json_debug",
        }
    }
}

impl FromStr for OutputMode {
    type Err = KeyframeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "images" => Ok(OutputMode::Images),
            "json" => Ok(OutputMode::Json),
            "json_only" => Ok(OutputMode::JsonOnly),
            "json_debug" => Ok(OutputMode::JsonDebug),
            _ => Err(KeyframeError::InvalidConfig(format!(
                "unknown output mode {value:?} (expected images, json, json_only, json_debug)"
            ))),
        }
    }
}

impl Display for OutputMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Optional processing window in seconds.
///
/// Frames before `start` are skipped; the run finishes at the first frame
/// after `end`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeBounds {
    /// First time processed, in seconds.
    pub start: Option<f64>,
    /// Last time processed, in seconds.
    pub end: Option<f64>,
}

impl TimeBounds {
    /// Bounds from optional start and end times in seconds.
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// `true` if `time` falls before the start bound.
    pub fn is_before_start(&self, time: f64) -> bool {
        self.start.is_some_and(|start| time < start)
    }

    /// `true` if `time` falls after the end bound.
    pub fn is_past_end(&self, time: f64) -> bool {
        self.end.is_some_and(|end| time > end)
    }

    /// Check both bounds.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] for negative or non-finite
    /// bounds, or a start after the end.
    pub fn validate(&self) -> Result<(), KeyframeError> {
        for (name, bound) in [("start_time", self.start), ("end_time", self.end)] {
            if let Some(value) = bound
                && !(value.is_finite() && value >= 0.0)
            {
                return Err(KeyframeError::InvalidConfig(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return Err(KeyframeError::InvalidConfig(format!(
                "start_time ({start}s) is after end_time ({end}s)"
            )));
        }
        Ok(())
    }
}

/// Configuration for one detection run.
///
/// All fields have defaults matching the command line: balanced
/// sensitivity, general content, 1 second scenes and lookahead, the
/// streaming lookahead strategy, no bounds, image output.
#[derive(Clone)]
#[must_use]
pub struct DetectionConfig {
    pub(crate) tuning: TuningOptions,
    pub(crate) strategy: DecisionStrategy,
    pub(crate) bounds: TimeBounds,
    pub(crate) debug: bool,
    pub(crate) output_mode: OutputMode,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
}

impl Debug for DetectionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DetectionConfig")
            .field("tuning", &self.tuning)
            .field("strategy", &self.strategy)
            .field("bounds", &self.bounds)
            .field("debug", &self.debug)
            .field("output_mode", &self.output_mode)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionConfig {
    /// A configuration with every default.
    pub fn new() -> Self {
        Self {
            tuning: TuningOptions::default(),
            strategy: DecisionStrategy::default(),
            bounds: TimeBounds::default(),
            debug: false,
            output_mode: OutputMode::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Choose the sensitivity preset.
    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.tuning.sensitivity = sensitivity;
        self
    }

    /// Choose the content type adjustment.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.tuning.content_type = content_type;
        self
    }

    /// Seconds over which sensitivity recovers after a keyframe, before the
    /// content type multiplier is applied.
    pub fn with_min_scene_duration(mut self, seconds: f64) -> Self {
        self.tuning.min_scene_duration = seconds;
        self
    }

    /// Minimum seconds between a keyframe and the next local maximum.
    pub fn with_min_time_constraint(mut self, seconds: f64) -> Self {
        self.tuning.min_time_constraint = Some(seconds);
        self
    }

    /// Force a keyframe after this many seconds without one.
    pub fn with_max_time_constraint(mut self, seconds: f64) -> Self {
        self.tuning.max_time_constraint = Some(seconds);
        self
    }

    /// Width of the lookahead window in seconds.
    pub fn with_look_ahead_time(mut self, seconds: f64) -> Self {
        self.tuning.look_ahead_time = seconds;
        self
    }

    /// Replace all tuning inputs at once.
    pub fn with_tuning(mut self, tuning: TuningOptions) -> Self {
        self.tuning = tuning;
        self
    }

    /// Choose how keyframes are decided.
    pub fn with_strategy(mut self, strategy: DecisionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restrict processing to `[start, end]` seconds.
    pub fn with_time_bounds(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.bounds = TimeBounds::new(start, end);
        self
    }

    /// Record decision inputs on every event.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Choose what the run writes out.
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Report progress to `callback`.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stop the run early once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Fire the progress callback every `size` frames (minimum 1).
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The tuning inputs.
    pub fn tuning(&self) -> &TuningOptions {
        &self.tuning
    }

    /// The decision strategy.
    pub fn strategy(&self) -> &DecisionStrategy {
        &self.strategy
    }

    /// The processing time bounds.
    pub fn bounds(&self) -> TimeBounds {
        self.bounds
    }

    /// The output mode.
    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Debug fields are recorded if requested explicitly or by
    /// [`OutputMode::JsonDebug`].
    pub fn debug_enabled(&self) -> bool {
        self.debug || self.output_mode.includes_debug()
    }

    /// Validate the configuration and tune the policy parameters.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] for out-of-range values.
    pub fn policy_parameters(&self) -> Result<PolicyParameters, KeyframeError> {
        self.bounds.validate()?;
        self.strategy.validate()?;
        self.tuning.tune()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
