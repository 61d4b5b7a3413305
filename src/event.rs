//! Keyframe events.
//!
//! A detection run produces an ordered list of [`KeyframeEvent`]s. Each
//! event records when the keyframe is, which frame it is, and why it was
//! chosen. In debug mode the event also carries the numbers the decision
//! was based on.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde_json::{Value, json};

/// Why a frame was chosen as a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyframeReason {
    /// The first frame of the stream, always a keyframe.
    FirstFrame,
    /// The frame's magnitude peaked inside the lookahead window above the
    /// adjusted threshold.
    LocalMaximum,
    /// Too much time passed since the previous keyframe.
    MaxTimeConstraint,
    /// A peak of the baseline-corrected signal (offline strategy).
    BaselinePeak,
}

impl KeyframeReason {
    /// The label written to keyframe metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyframeReason::FirstFrame => "first frame",
            KeyframeReason::LocalMaximum => "local maximum",
            KeyframeReason::MaxTimeConstraint => "max time constraint",
            KeyframeReason::BaselinePeak => "baseline peak",
        }
    }
}

impl Display for KeyframeReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Decision inputs recorded when debug mode is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeDebug {
    /// Magnitude of the sample that triggered the keyframe.
    pub magnitude: f64,
    /// Threshold in effect when the decision was made.
    pub adjusted_threshold: f64,
    /// Seconds between the previous keyframe and the deciding frame.
    pub time_since_last_keyframe: f64,
}

/// A detected keyframe.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeEvent {
    /// Time of the keyframe in seconds.
    pub time: f64,
    /// Index of the keyframe's frame.
    pub frame_index: u64,
    /// Why this frame was chosen.
    pub reason: KeyframeReason,
    /// Decision inputs, present only in debug mode.
    pub debug: Option<KeyframeDebug>,
}

impl KeyframeEvent {
    /// An event without debug fields.
    pub fn new(time: f64, frame_index: u64, reason: KeyframeReason) -> Self {
        Self {
            time,
            frame_index,
            reason,
            debug: None,
        }
    }

    /// Attach the decision inputs.
    #[must_use]
    pub fn with_debug(mut self, debug: KeyframeDebug) -> Self {
        self.debug = Some(debug);
        self
    }

    /// JSON object `{time, frame, reason}`, plus the debug fields when
    /// present.
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "time": self.time,
            "frame": self.frame_index,
            "reason": self.reason.as_str(),
        });
        if let (Some(debug), Some(object)) = (self.debug, value.as_object_mut()) {
            object.insert("magnitude".to_string(), json!(debug.magnitude));
            object.insert(
                "adjusted_threshold".to_string(),
                json!(debug.adjusted_threshold),
            );
            object.insert(
                "time_since_last_keyframe".to_string(),
                json!(debug.time_since_last_keyframe),
            );
        }
        value
    }
}

impl Display for KeyframeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{:.2}s (frame {}, {})",
            self.time, self.frame_index, self.reason
        )
    }
}
