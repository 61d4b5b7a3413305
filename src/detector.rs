//! Detection runs.
//!
//! [`KeyframeDetector`] pulls frames from a source, drives the selected
//! [`DecisionStrategy`], hands keyframe pixels to an optional
//! [`KeyframeSink`] and reports progress. A run always ends with a
//! [`DetectionReport`], even when the source fails, the frame size changes
//! or the run is cancelled; only configuration errors abort it.
//!
//! # Example
//!
//! ```
//! use keyframe_detector::{DetectionConfig, GrayFrame, KeyframeDetector, Termination};
//!
//! let frames = (0..10u64).map(|i| Ok(GrayFrame::filled(8, 8, 0, i as f64, i)));
//!
//! let config = DetectionConfig::new().with_max_time_constraint(4.0);
//! let report = KeyframeDetector::new(&config, 1.0)?.detect(frames)?;
//!
//! assert!(matches!(report.termination, Termination::Exhausted));
//! assert_eq!(report.frames_processed, 10);
//! assert_eq!(report.events.len(), 3);
//! # Ok::<(), keyframe_detector::KeyframeError>(())
//! ```

use std::collections::BTreeMap;

use crate::configuration::DetectionConfig;
use crate::difference::FrameDifferenceMeter;
use crate::engine::{EngineState, KeyframeDecisionEngine};
use crate::error::KeyframeError;
use crate::event::{KeyframeDebug, KeyframeEvent, KeyframeReason};
use crate::frame::GrayFrame;
use crate::peak::PeakBaselineOptions;
use crate::progress::ProgressTracker;
use crate::sink::KeyframeSink;
use crate::tuning::PolicyParameters;
use crate::window::{LookAheadWindow, MagnitudeSample};

/// How keyframes are selected from the difference signal.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DecisionStrategy {
    /// Streaming lookahead-window local maxima with threshold and time
    /// constraints. This is the default.
    #[default]
    LookAhead,
    /// Offline baseline-corrected peak picking over the whole run.
    PeakBaseline(PeakBaselineOptions),
}

impl DecisionStrategy {
    /// Offline strategies only decide once the source is exhausted, so
    /// images have to be saved in a second pass with
    /// [`KeyframeDetector::save_selected`].
    pub fn is_offline(&self) -> bool {
        matches!(self, DecisionStrategy::PeakBaseline(_))
    }

    /// The strategy's command line name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStrategy::LookAhead => "lookahead",
            DecisionStrategy::PeakBaseline(_) => "peak-baseline",
        }
    }

    pub(crate) fn validate(&self) -> Result<(), KeyframeError> {
        match self {
            DecisionStrategy::LookAhead => Ok(()),
            DecisionStrategy::PeakBaseline(options) => options.validate(),
        }
    }
}

/// Why a run stopped.
#[derive(Debug)]
pub enum Termination {
    /// The source ran out of frames.
    Exhausted,
    /// A frame past the configured end time arrived.
    EndTimeReached,
    /// The cancellation token was triggered.
    Cancelled,
    /// The source reported an error. Events decided before it are kept.
    SourceFailed(KeyframeError),
    /// A frame could not be processed, e.g. its size changed mid-stream.
    /// Events decided before it are kept.
    Failed(KeyframeError),
}

impl Termination {
    /// `false` if the run stopped on an error.
    pub fn is_success(&self) -> bool {
        !matches!(self, Termination::SourceFailed(_) | Termination::Failed(_))
    }
}

/// Outcome of a detection run.
#[derive(Debug)]
pub struct DetectionReport {
    /// Keyframes in time order.
    pub events: Vec<KeyframeEvent>,
    /// Frames pulled from the source.
    pub frames_processed: u64,
    pub termination: Termination,
    /// Images the sink wrote successfully.
    pub images_saved: usize,
    /// Images the sink failed to write.
    pub image_failures: usize,
}

/// Runs keyframe detection over a frame source.
#[derive(Debug, Clone)]
pub struct KeyframeDetector {
    config: DetectionConfig,
    params: PolicyParameters,
    frames_per_second: f64,
    total_frames: Option<u64>,
}

impl KeyframeDetector {
    /// Validate `config` for a source running at `frames_per_second`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] or
    /// [`KeyframeError::UnknownPreset`] before any frame is read.
    pub fn new(config: &DetectionConfig, frames_per_second: f64) -> Result<Self, KeyframeError> {
        let params = config.policy_parameters()?;
        if !(frames_per_second.is_finite() && frames_per_second > 0.0) {
            return Err(KeyframeError::InvalidConfig(format!(
                "frames per second must be positive, got {frames_per_second}"
            )));
        }
        LookAheadWindow::for_duration(params.look_ahead_time, frames_per_second)?;

        log::debug!(
            "Detector configured: strategy={}, {:?}, bounds={:?}",
            config.strategy().as_str(),
            params,
            config.bounds(),
        );

        Ok(Self {
            config: config.clone(),
            params,
            frames_per_second,
            total_frames: None,
        })
    }

    /// Frame count hint used for progress percentages.
    #[must_use]
    pub fn with_total_frames(mut self, total: Option<u64>) -> Self {
        self.total_frames = total;
        self
    }

    /// The tuned parameters for this run.
    pub fn params(&self) -> &PolicyParameters {
        &self.params
    }

    /// The configuration the detector was built from.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run detection without saving images.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] if the decision engine
    /// cannot be built. Source failures and frame size changes end the run
    /// with [`Termination::SourceFailed`] or [`Termination::Failed`] and keep
    /// the events decided so far.
    pub fn detect<I>(&self, frames: I) -> Result<DetectionReport, KeyframeError>
    where
        I: IntoIterator<Item = Result<GrayFrame, KeyframeError>>,
    {
        self.run(frames, None)
    }

    /// Run detection, saving each keyframe's image to `sink` as it is
    /// decided.
    ///
    /// Offline strategies decide only at the end of the source and save
    /// nothing here; call [`save_selected`](Self::save_selected) with a
    /// fresh source afterwards.
    ///
    /// # Errors
    ///
    /// See [`detect`](Self::detect).
    pub fn detect_with_sink<I, S>(&self, frames: I, sink: &mut S) -> Result<DetectionReport, KeyframeError>
    where
        I: IntoIterator<Item = Result<GrayFrame, KeyframeError>>,
        S: KeyframeSink,
    {
        self.run(frames, Some(sink as &mut dyn KeyframeSink))
    }

    /// Save the images for `report`'s events from a second pass over the
    /// source. Stops reading once every event has been saved.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::SourceError`] if the source fails before all
    /// images are saved. Counts already updated stay in `report`.
    pub fn save_selected<I, S>(&self, frames: I, report: &mut DetectionReport, sink: &mut S) -> Result<(), KeyframeError>
    where
        I: IntoIterator<Item = Result<GrayFrame, KeyframeError>>,
        S: KeyframeSink,
    {
        let mut first = report
            .events
            .iter()
            .find(|event| event.reason == KeyframeReason::FirstFrame)
            .cloned();
        let mut pending: BTreeMap<u64, KeyframeEvent> = report
            .events
            .iter()
            .filter(|event| event.reason != KeyframeReason::FirstFrame)
            .map(|event| (event.frame_index, event.clone()))
            .collect();

        let mut last = None;
        for item in frames {
            if first.is_none() && pending.is_empty() {
                break;
            }
            let frame = item.map_err(|error| source_error(error, last))?;
            last = Some((frame.index, frame.time));

            let event = match first.take() {
                Some(event) => Some(event),
                None => pending.remove(&frame.index),
            };
            if let Some(event) = event {
                record_save(sink, &frame, &event, report);
            }
        }

        if !pending.is_empty() {
            log::warn!("{} keyframe images were not found in the second pass", pending.len());
        }
        Ok(())
    }

    fn run<I>(&self, frames: I, sink: Option<&mut dyn KeyframeSink>) -> Result<DetectionReport, KeyframeError>
    where
        I: IntoIterator<Item = Result<GrayFrame, KeyframeError>>,
    {
        let report = match &self.config.strategy {
            DecisionStrategy::LookAhead => self.run_lookahead(frames.into_iter(), sink)?,
            DecisionStrategy::PeakBaseline(options) => self.run_peak_baseline(frames.into_iter(), options)?,
        };

        log::info!(
            "Detection finished: {} keyframes from {} frames ({:?})",
            report.events.len(),
            report.frames_processed,
            report.termination,
        );
        Ok(report)
    }

    fn run_lookahead<I>(&self, mut frames: I, mut sink: Option<&mut dyn KeyframeSink>) -> Result<DetectionReport, KeyframeError>
    where
        I: Iterator<Item = Result<GrayFrame, KeyframeError>>,
    {
        let mut engine = KeyframeDecisionEngine::new(self.params, self.frames_per_second)?
            .with_bounds(self.config.bounds())
            .with_debug(self.config.debug_enabled())
            .retain_frames(sink.is_some());
        let mut tracker = self.tracker();
        let mut report = DetectionReport {
            events: Vec::new(),
            frames_processed: 0,
            termination: Termination::Exhausted,
            images_saved: 0,
            image_failures: 0,
        };

        let mut last = None;
        report.termination = loop {
            if self.config.is_cancelled() {
                log::info!("Detection cancelled after {} frames", report.frames_processed);
                break Termination::Cancelled;
            }
            let Some(item) = frames.next() else {
                break Termination::Exhausted;
            };
            let frame = match item {
                Ok(frame) => frame,
                Err(error) => break Termination::SourceFailed(source_error(error, last)),
            };

            let time = frame.time;
            last = Some((frame.index, time));
            report.frames_processed += 1;

            let decision = match engine.process(frame) {
                Ok(decision) => decision,
                Err(error) => {
                    log::warn!("Detection stopped: {error}");
                    break Termination::Failed(error);
                }
            };
            if let Some(decision) = decision
                && let (Some(sink), Some(pixels)) = (sink.as_deref_mut(), decision.frame.as_ref())
            {
                record_save(sink, pixels, &decision.event, &mut report);
            }
            tracker.advance(time, engine.events().len());

            if engine.state() == EngineState::Finished {
                break Termination::EndTimeReached;
            }
        };

        engine.finish();
        report.events = engine.into_events();
        tracker.finish(report.events.len());
        Ok(report)
    }

    fn run_peak_baseline<I>(&self, mut frames: I, options: &PeakBaselineOptions) -> Result<DetectionReport, KeyframeError>
    where
        I: Iterator<Item = Result<GrayFrame, KeyframeError>>,
    {
        let meter = FrameDifferenceMeter::new();
        let bounds = self.config.bounds();
        let debug = self.config.debug_enabled();
        let mut tracker = self.tracker();

        let mut first_event: Option<KeyframeEvent> = None;
        let mut first_time = 0.0;
        let mut previous: Option<GrayFrame> = None;
        let mut samples: Vec<MagnitudeSample> = Vec::new();
        let mut frames_processed = 0;
        let mut last = None;

        let termination = loop {
            if self.config.is_cancelled() {
                log::info!("Detection cancelled after {frames_processed} frames");
                break Termination::Cancelled;
            }
            let Some(item) = frames.next() else {
                break Termination::Exhausted;
            };
            let frame = match item {
                Ok(frame) => frame,
                Err(error) => break Termination::SourceFailed(source_error(error, last)),
            };

            last = Some((frame.index, frame.time));
            frames_processed += 1;
            tracker.advance(frame.time, usize::from(first_event.is_some()));

            if first_event.is_none() {
                let mut event = KeyframeEvent::new(0.0, 0, KeyframeReason::FirstFrame);
                if debug {
                    event = event.with_debug(KeyframeDebug {
                        magnitude: 0.0,
                        adjusted_threshold: options.threshold,
                        time_since_last_keyframe: 0.0,
                    });
                }
                first_time = frame.time;
                first_event = Some(event);
                previous = Some(frame);
                continue;
            }

            if bounds.is_before_start(frame.time) {
                continue;
            }
            if bounds.is_past_end(frame.time) {
                break Termination::EndTimeReached;
            }

            if let Some(previous) = previous.as_ref() {
                match meter.difference(previous, &frame) {
                    Ok(magnitude) => samples.push(MagnitudeSample::new(frame.time, frame.index, magnitude)),
                    Err(error) => {
                        log::warn!("Detection stopped: {error}");
                        break Termination::Failed(error);
                    }
                }
            }
            previous = Some(frame);
        };

        let mut events: Vec<KeyframeEvent> = first_event.into_iter().collect();
        if !events.is_empty() {
            events.extend(options.select(&samples, first_time, debug));
        }
        tracker.finish(events.len());

        Ok(DetectionReport {
            events,
            frames_processed,
            termination,
            images_saved: 0,
            image_failures: 0,
        })
    }

    fn tracker(&self) -> ProgressTracker {
        ProgressTracker::new(
            self.config.progress.clone(),
            self.total_frames,
            self.config.batch_size,
        )
    }
}

fn record_save<S: KeyframeSink + ?Sized>(sink: &mut S, frame: &GrayFrame, event: &KeyframeEvent, report: &mut DetectionReport) {
    match sink.save(frame, event) {
        Ok(_) => report.images_saved += 1,
        Err(error) => {
            log::warn!("{error}");
            report.image_failures += 1;
        }
    }
}

/// Attach the position of the last good frame to a source failure. A
/// failure before any frame is reported at frame 0, time 0.
fn source_error(error: KeyframeError, last: Option<(u64, f64)>) -> KeyframeError {
    let (frame_index, time) = match last {
        Some((index, time)) => (index + 1, time),
        None => (0, 0.0),
    };
    match error {
        KeyframeError::SourceError { .. } => error,
        other => KeyframeError::SourceError {
            frame_index,
            time,
            reason: other.to_string(),
        },
    }
}
