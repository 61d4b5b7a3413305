//! Mapping from human presets to numeric policy parameters.
//!
//! [`tune`] combines a [`Sensitivity`] preset and a [`ContentType`]
//! adjustment with a minimum scene duration to produce the
//! [`PolicyParameters`] used by the decision engine for one run.
//!
//! # Example
//!
//! ```
//! use keyframe_detector::{ContentType, Sensitivity, TuningOptions};
//!
//! let params = TuningOptions::new()
//!     .sensitivity(Sensitivity::High)
//!     .content_type(ContentType::Action)
//!     .tune()?;
//! assert_eq!(params.threshold, 4.0);
//! assert_eq!(params.min_scene_length, 0.5);
//! # Ok::<(), keyframe_detector::KeyframeError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::KeyframeError;

/// How eagerly keyframes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sensitivity {
    /// Fewer keyframes: high threshold, large motion factor.
    Low,
    /// The default trade-off.
    #[default]
    Balanced,
    /// More keyframes: low threshold, boosted content weight.
    High,
}

impl Sensitivity {
    /// `(threshold, max_motion_factor, content_weight)`.
    fn preset(self) -> (f64, f64, f64) {
        match self {
            Sensitivity::Low => (15.0, 1.5, 0.8),
            Sensitivity::Balanced => (10.0, 1.2, 1.0),
            Sensitivity::High => (5.0, 1.0, 1.2),
        }
    }

    /// The preset's command line name.
    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Balanced => "balanced",
            Sensitivity::High => "high",
        }
    }
}

impl FromStr for Sensitivity {
    type Err = KeyframeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Sensitivity::Low),
            "balanced" => Ok(Sensitivity::Balanced),
            "high" => Ok(Sensitivity::High),
            _ => Err(KeyframeError::UnknownPreset {
                kind: "sensitivity",
                name: value.to_string(),
                expected: "low, balanced, high",
            }),
        }
    }
}

impl Display for Sensitivity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The kind of footage being analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    /// Fast cutting: lower threshold, shorter scenes.
    Action,
    /// Slow pacing: higher threshold, longer scenes.
    Documentary,
    /// No adjustment.
    #[default]
    General,
}

impl ContentType {
    /// `(threshold_mult, min_scene_length_mult)`.
    fn adjustment(self) -> (f64, f64) {
        match self {
            ContentType::Action => (0.8, 0.5),
            ContentType::Documentary => (1.2, 1.5),
            ContentType::General => (1.0, 1.0),
        }
    }

    /// The content type's command line name.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Action => "action",
            ContentType::Documentary => "documentary",
            ContentType::General => "general",
        }
    }
}

impl FromStr for ContentType {
    type Err = KeyframeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "action" => Ok(ContentType::Action),
            "documentary" => Ok(ContentType::Documentary),
            "general" => Ok(ContentType::General),
            _ => Err(KeyframeError::UnknownPreset {
                kind: "content type",
                name: value.to_string(),
                expected: "action, documentary, general",
            }),
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Numeric parameters for one detection run.
///
/// Built by [`tune`] (or [`TuningOptions::tune`]) and never mutated
/// afterwards. Construct it directly only when bypassing the presets, and
/// call [`validate`](PolicyParameters::validate) before use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyParameters {
    /// Base decision threshold on the mean absolute difference scale.
    pub threshold: f64,
    /// Seconds over which sensitivity ramps back after a keyframe.
    pub min_scene_length: f64,
    /// Multiplier applied to the threshold.
    pub max_motion_factor: f64,
    /// Multiplier applied to the threshold.
    pub content_weight: f64,
    /// Minimum seconds since the last keyframe for a local maximum to count.
    pub min_time_constraint: Option<f64>,
    /// Seconds after which a keyframe is forced.
    pub max_time_constraint: Option<f64>,
    /// Width of the lookahead window in seconds.
    pub look_ahead_time: f64,
}

impl PolicyParameters {
    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), KeyframeError> {
        require_positive("threshold", self.threshold)?;
        require_positive("min_scene_length", self.min_scene_length)?;
        require_positive("max_motion_factor", self.max_motion_factor)?;
        require_positive("content_weight", self.content_weight)?;
        require_positive("look_ahead_time", self.look_ahead_time)?;
        if let Some(min) = self.min_time_constraint {
            require_positive("min_time_constraint", min)?;
        }
        if let Some(max) = self.max_time_constraint {
            require_positive("max_time_constraint", max)?;
        }
        if let (Some(min), Some(max)) = (self.min_time_constraint, self.max_time_constraint)
            && min > max
        {
            return Err(KeyframeError::InvalidConfig(format!(
                "min_time_constraint ({min}) exceeds max_time_constraint ({max})"
            )));
        }
        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), KeyframeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KeyframeError::InvalidConfig(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

/// Map presets to [`PolicyParameters`].
///
/// `threshold = sensitivity threshold * content threshold multiplier` and
/// `min_scene_length = min_scene_duration * content scene multiplier`. The
/// motion factor and content weight come from the sensitivity preset
/// unchanged.
///
/// # Errors
///
/// Returns [`KeyframeError::InvalidConfig`] if the resulting parameters are
/// out of range (for example a non-positive `min_scene_duration`).
pub fn tune(
    sensitivity: Sensitivity,
    content_type: ContentType,
    min_scene_duration: f64,
    min_time_constraint: Option<f64>,
    max_time_constraint: Option<f64>,
    look_ahead_time: f64,
) -> Result<PolicyParameters, KeyframeError> {
    let (threshold, max_motion_factor, content_weight) = sensitivity.preset();
    let (threshold_mult, min_scene_length_mult) = content_type.adjustment();

    let params = PolicyParameters {
        threshold: threshold * threshold_mult,
        min_scene_length: min_scene_duration * min_scene_length_mult,
        max_motion_factor,
        content_weight,
        min_time_constraint,
        max_time_constraint,
        look_ahead_time,
    };
    params.validate()?;

    log::debug!(
        "Tuned parameters (sensitivity={}, content={}): threshold={:.2}, min_scene_length={:.2}s, motion_factor={}, content_weight={}",
        sensitivity,
        content_type,
        params.threshold,
        params.min_scene_length,
        params.max_motion_factor,
        params.content_weight,
    );

    Ok(params)
}

/// Builder over the inputs of [`tune`], with the defaults of the command
/// line: balanced sensitivity, general content, 1 second scenes, 1 second
/// lookahead and no time constraints.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct TuningOptions {
    /// Sensitivity preset.
    pub sensitivity: Sensitivity,
    /// Content type adjustment.
    pub content_type: ContentType,
    /// Seconds, before the content type multiplier.
    pub min_scene_duration: f64,
    /// Passed through to [`PolicyParameters::min_time_constraint`].
    pub min_time_constraint: Option<f64>,
    /// Passed through to [`PolicyParameters::max_time_constraint`].
    pub max_time_constraint: Option<f64>,
    /// Passed through to [`PolicyParameters::look_ahead_time`].
    pub look_ahead_time: f64,
}

impl Default for TuningOptions {
    fn default() -> Self {
        Self {
            sensitivity: Sensitivity::Balanced,
            content_type: ContentType::General,
            min_scene_duration: 1.0,
            min_time_constraint: None,
            max_time_constraint: None,
            look_ahead_time: 1.0,
        }
    }
}

impl TuningOptions {
    /// Options with the command line defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sensitivity preset.
    pub fn sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set the minimum scene duration in seconds.
    pub fn min_scene_duration(mut self, seconds: f64) -> Self {
        self.min_scene_duration = seconds;
        self
    }

    /// Set the minimum time constraint in seconds.
    pub fn min_time_constraint(mut self, seconds: f64) -> Self {
        self.min_time_constraint = Some(seconds);
        self
    }

    /// Set the maximum time constraint in seconds.
    pub fn max_time_constraint(mut self, seconds: f64) -> Self {
        self.max_time_constraint = Some(seconds);
        self
    }

    /// Set the lookahead width in seconds.
    pub fn look_ahead_time(mut self, seconds: f64) -> Self {
        self.look_ahead_time = seconds;
        self
    }

    /// Run [`tune`] with these inputs.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] if the result is out of range.
    pub fn tune(&self) -> Result<PolicyParameters, KeyframeError> {
        tune(
            self.sensitivity,
            self.content_type,
            self.min_scene_duration,
            self.min_time_constraint,
            self.max_time_constraint,
            self.look_ahead_time,
        )
    }
}
