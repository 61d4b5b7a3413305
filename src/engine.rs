//! The streaming keyframe decision engine.
//!
//! [`KeyframeDecisionEngine`] consumes frames one at a time and decides, for
//! each, whether a keyframe has been found. The first frame is always a
//! keyframe. After that every frame contributes a difference magnitude to a
//! [`LookAheadWindow`]; when the window's center sample is the window
//! maximum and beats the [`ThresholdPolicy`] threshold, the center becomes
//! a keyframe. If nothing qualifies for longer than the optional
//! `max_time_constraint`, the current frame is forced as a keyframe.
//!
//! # Example
//!
//! ```
//! use keyframe_detector::{GrayFrame, KeyframeDecisionEngine, KeyframeReason, TuningOptions};
//!
//! let params = TuningOptions::new().max_time_constraint(2.0).tune()?;
//! let mut engine = KeyframeDecisionEngine::new(params, 1.0)?;
//!
//! for second in 0..5 {
//!     let frame = GrayFrame::filled(4, 4, 0, second as f64, second);
//!     engine.process(frame)?;
//! }
//!
//! let reasons: Vec<_> = engine.events().iter().map(|event| event.reason).collect();
//! assert_eq!(
//!     reasons,
//!     [KeyframeReason::FirstFrame, KeyframeReason::MaxTimeConstraint, KeyframeReason::MaxTimeConstraint]
//! );
//! # Ok::<(), keyframe_detector::KeyframeError>(())
//! ```

use std::collections::VecDeque;

use crate::configuration::TimeBounds;
use crate::difference::FrameDifferenceMeter;
use crate::error::KeyframeError;
use crate::event::{KeyframeDebug, KeyframeEvent, KeyframeReason};
use crate::frame::GrayFrame;
use crate::threshold::ThresholdPolicy;
use crate::tuning::PolicyParameters;
use crate::window::{LookAheadWindow, MagnitudeSample};

/// Lifecycle of an engine. There is no way back to
/// [`AwaitingFirstFrame`](EngineState::AwaitingFirstFrame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No frame seen yet; the next one becomes the first keyframe.
    AwaitingFirstFrame,
    /// Frames are being compared and decided on.
    Streaming,
    /// Further frames are ignored.
    Finished,
}

/// A keyframe decided while processing a frame.
///
/// `frame` holds the keyframe's pixels when the engine was built with
/// [`retain_frames`](KeyframeDecisionEngine::retain_frames), so a sink can
/// save the image the event actually refers to.
#[derive(Debug, Clone)]
pub struct KeyframeDecision {
    pub event: KeyframeEvent,
    pub frame: Option<GrayFrame>,
}

/// Per-run decision state.
#[derive(Debug)]
pub struct KeyframeDecisionEngine {
    policy: ThresholdPolicy,
    meter: FrameDifferenceMeter,
    window: LookAheadWindow,
    bounds: TimeBounds,
    debug: bool,
    state: EngineState,
    last_keyframe_time: f64,
    previous_frame: Option<GrayFrame>,
    /// Frames backing the window samples, kept only when a sink needs them.
    retained: Option<VecDeque<GrayFrame>>,
    frame_count: u64,
    events: Vec<KeyframeEvent>,
}

impl KeyframeDecisionEngine {
    /// Create an engine for a stream running at `frames_per_second`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] if `params` fail validation
    /// or `frames_per_second` is not positive.
    pub fn new(params: PolicyParameters, frames_per_second: f64) -> Result<Self, KeyframeError> {
        params.validate()?;
        let policy = ThresholdPolicy::new(params)?;
        let window = LookAheadWindow::for_duration(params.look_ahead_time, frames_per_second)?;

        log::debug!(
            "Decision engine ready (fps={:.3}, window={} samples, threshold ceiling={:.3})",
            frames_per_second,
            window.capacity(),
            policy.ceiling(),
        );

        Ok(Self {
            policy,
            meter: FrameDifferenceMeter::new(),
            window,
            bounds: TimeBounds::default(),
            debug: false,
            state: EngineState::AwaitingFirstFrame,
            last_keyframe_time: f64::NEG_INFINITY,
            previous_frame: None,
            retained: None,
            frame_count: 0,
            events: Vec::new(),
        })
    }

    /// Only decide on frames inside `bounds`.
    #[must_use]
    pub fn with_bounds(mut self, bounds: TimeBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Attach [`KeyframeDebug`] data to every event.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Keep the frames behind the lookahead window so decisions can hand out
    /// the keyframe's pixels. Memory stays bounded by the window capacity.
    #[must_use]
    pub fn retain_frames(mut self, retain: bool) -> Self {
        self.retained = retain.then(VecDeque::new);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Frames handed to [`process`](Self::process), including skipped ones.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Keyframes decided so far, in order.
    pub fn events(&self) -> &[KeyframeEvent] {
        &self.events
    }

    /// Consume the engine, keeping its events.
    pub fn into_events(self) -> Vec<KeyframeEvent> {
        self.events
    }

    /// The lookahead window of recent magnitudes.
    pub fn window(&self) -> &LookAheadWindow {
        &self.window
    }

    /// The threshold policy deciding local maxima.
    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// Stop accepting frames.
    pub fn finish(&mut self) {
        self.state = EngineState::Finished;
    }

    /// Feed the next frame.
    ///
    /// Returns the keyframe decided on this frame, if any. Once the engine
    /// is [`Finished`](EngineState::Finished) further frames are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::DimensionMismatch`] if the frame's size
    /// differs from the previous one. The engine is finished afterwards.
    pub fn process(&mut self, frame: GrayFrame) -> Result<Option<KeyframeDecision>, KeyframeError> {
        match self.state {
            EngineState::Finished => Ok(None),
            EngineState::AwaitingFirstFrame => Ok(Some(self.accept_first_frame(frame))),
            EngineState::Streaming => self.accept_frame(frame).inspect_err(|_| {
                self.state = EngineState::Finished;
            }),
        }
    }

    fn accept_first_frame(&mut self, frame: GrayFrame) -> KeyframeDecision {
        self.frame_count += 1;

        let mut event = KeyframeEvent::new(0.0, 0, KeyframeReason::FirstFrame);
        if self.debug {
            event = event.with_debug(KeyframeDebug {
                magnitude: 0.0,
                adjusted_threshold: self.policy.params().threshold,
                time_since_last_keyframe: 0.0,
            });
        }

        log::debug!("Keyframe at 0.00s (first frame, source time {:.3}s)", frame.time);

        self.last_keyframe_time = frame.time;
        self.state = EngineState::Streaming;
        self.events.push(event.clone());

        let pixels = self.retained.is_some().then(|| frame.clone());
        self.previous_frame = Some(frame);

        KeyframeDecision {
            event,
            frame: pixels,
        }
    }

    fn accept_frame(&mut self, frame: GrayFrame) -> Result<Option<KeyframeDecision>, KeyframeError> {
        self.frame_count += 1;
        let time = frame.time;

        if self.bounds.is_before_start(time) {
            return Ok(None);
        }
        if self.bounds.is_past_end(time) {
            log::debug!("Frame {} at {:.3}s is past the end bound", frame.index, time);
            self.state = EngineState::Finished;
            return Ok(None);
        }

        let Some(previous) = self.previous_frame.as_ref() else {
            self.previous_frame = Some(frame);
            return Ok(None);
        };

        let magnitude = self.meter.difference(previous, &frame)?;
        let current = MagnitudeSample::new(time, frame.index, magnitude);
        self.window.push(current);
        if let Some(retained) = self.retained.as_mut() {
            if retained.len() == self.window.capacity() {
                retained.pop_front();
            }
            retained.push_back(frame.clone());
        }

        let time_since_last_keyframe = time - self.last_keyframe_time;
        let adjusted_threshold = self.policy.adjusted_threshold(time_since_last_keyframe);

        log::trace!(
            "Frame {} at {:.3}s: magnitude={:.3}, adjusted threshold={:.3}",
            frame.index,
            time,
            magnitude,
            adjusted_threshold,
        );

        let decision = if let Some(center) =
            self.local_maximum(time_since_last_keyframe, adjusted_threshold)
        {
            let pixels = self
                .retained
                .as_ref()
                .and_then(|retained| retained.get(retained.len() / 2).cloned());
            Some((center, KeyframeReason::LocalMaximum, pixels))
        } else if self
            .policy
            .params()
            .max_time_constraint
            .is_some_and(|max| time_since_last_keyframe >= max)
        {
            let pixels = self.retained.is_some().then(|| frame.clone());
            Some((current, KeyframeReason::MaxTimeConstraint, pixels))
        } else {
            None
        };

        self.previous_frame = Some(frame);

        Ok(decision.map(|(sample, reason, pixels)| {
            self.emit(
                sample,
                reason,
                adjusted_threshold,
                time_since_last_keyframe,
                pixels,
            )
        }))
    }

    /// The window center, if it qualifies as a local-maximum keyframe.
    fn local_maximum(
        &self,
        time_since_last_keyframe: f64,
        adjusted_threshold: f64,
    ) -> Option<MagnitudeSample> {
        let center = self.window.center()?;
        let min_time_satisfied = self
            .policy
            .params()
            .min_time_constraint
            .is_none_or(|min| time_since_last_keyframe >= min);

        (center.magnitude == self.window.max_magnitude()
            && center.magnitude > adjusted_threshold
            && min_time_satisfied
            && center.time > self.last_keyframe_time)
            .then_some(center)
    }

    fn emit(
        &mut self,
        sample: MagnitudeSample,
        reason: KeyframeReason,
        adjusted_threshold: f64,
        time_since_last_keyframe: f64,
        pixels: Option<GrayFrame>,
    ) -> KeyframeDecision {
        let mut event = KeyframeEvent::new(sample.time, sample.frame_index, reason);
        if self.debug {
            event = event.with_debug(KeyframeDebug {
                magnitude: sample.magnitude,
                adjusted_threshold,
                time_since_last_keyframe,
            });
        }

        log::debug!("Keyframe at {event}");

        self.last_keyframe_time = sample.time;
        self.events.push(event.clone());

        KeyframeDecision {
            event,
            frame: pixels,
        }
    }
}
