//! Time-varying decision threshold.
//!
//! Right after a keyframe the threshold is scaled down by a motion penalty
//! that ramps linearly from 0 to 1 over `min_scene_length` seconds, then
//! stays at its ceiling `threshold * max_motion_factor * content_weight`.

use crate::error::KeyframeError;
use crate::tuning::PolicyParameters;

/// Computes the adjusted threshold for a validated set of parameters.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    params: PolicyParameters,
}

impl ThresholdPolicy {
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] if `min_scene_length` is not
    /// positive.
    pub fn new(params: PolicyParameters) -> Result<Self, KeyframeError> {
        check_scene_length(params.min_scene_length)?;
        Ok(Self { params })
    }

    /// `min(1, time_since_last_keyframe / min_scene_length)`.
    pub fn motion_penalty(&self, time_since_last_keyframe: f64) -> f64 {
        (time_since_last_keyframe / self.params.min_scene_length).min(1.0)
    }

    /// Threshold in effect `time_since_last_keyframe` seconds after the last
    /// keyframe.
    pub fn adjusted_threshold(&self, time_since_last_keyframe: f64) -> f64 {
        self.params.threshold
            * self.motion_penalty(time_since_last_keyframe)
            * self.params.max_motion_factor
            * self.params.content_weight
    }

    /// The value [`adjusted_threshold`](Self::adjusted_threshold) settles at
    /// once a full scene length has elapsed.
    pub fn ceiling(&self) -> f64 {
        self.params.threshold * self.params.max_motion_factor * self.params.content_weight
    }

    /// The parameters the policy was built from.
    pub fn params(&self) -> &PolicyParameters {
        &self.params
    }
}

/// One-shot form of [`ThresholdPolicy::adjusted_threshold`].
///
/// # Errors
///
/// Returns [`KeyframeError::InvalidConfig`] if `min_scene_length` is not
/// positive.
pub fn adjusted_threshold(
    base: &PolicyParameters,
    time_since_last_keyframe: f64,
) -> Result<f64, KeyframeError> {
    Ok(ThresholdPolicy::new(*base)?.adjusted_threshold(time_since_last_keyframe))
}

fn check_scene_length(min_scene_length: f64) -> Result<(), KeyframeError> {
    if min_scene_length > 0.0 {
        Ok(())
    } else {
        Err(KeyframeError::InvalidConfig(format!(
            "min_scene_length must be greater than zero, got {min_scene_length}"
        )))
    }
}
