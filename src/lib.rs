//! # keyframe-detector
//!
//! Pick representative keyframes out of a video by measuring how much each
//! frame differs from the one before it.
//!
//! Every frame after the first contributes a difference magnitude (the mean
//! absolute difference of grayscale pixels). A short lookahead window over
//! those magnitudes finds local peaks; a peak becomes a keyframe when it
//! beats a threshold that is lowered right after each keyframe and recovers
//! over the minimum scene length. Optional minimum and maximum gaps between
//! keyframes bound the result. Decoding is done by FFmpeg via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next); the decision
//! engine itself only sees [`GrayFrame`]s and can be driven from any source.
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyframe_detector::{
//!     ContentType, DetectionConfig, ImageDirectorySink, KeyframeDetector, Sensitivity, VideoFile,
//! };
//!
//! let mut video = VideoFile::open("input.mp4")?;
//! let config = DetectionConfig::new()
//!     .with_sensitivity(Sensitivity::High)
//!     .with_content_type(ContentType::Action)
//!     .with_max_time_constraint(10.0);
//!
//! let detector = KeyframeDetector::new(&config, video.metadata().frames_per_second)?;
//! let mut sink = ImageDirectorySink::create("keyframes")?;
//! let report = detector.detect_with_sink(video.frames()?, &mut sink)?;
//!
//! for event in &report.events {
//!     println!("{event}");
//! }
//! keyframe_detector::write_metadata("keyframes/keyframes.json", &report.events)?;
//! # Ok::<(), keyframe_detector::KeyframeError>(())
//! ```
//!
//! ## Driving the engine directly
//!
//! ```
//! use keyframe_detector::{GrayFrame, KeyframeDecisionEngine, TuningOptions};
//!
//! let params = TuningOptions::new().tune()?;
//! let mut engine = KeyframeDecisionEngine::new(params, 25.0)?;
//! let decision = engine.process(GrayFrame::filled(16, 16, 0, 0.0, 0))?;
//! assert!(decision.is_some());
//! # Ok::<(), keyframe_detector::KeyframeError>(())
//! ```
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Computes large frame differences across rayon threads |

pub mod configuration;
mod conversion;
pub mod detector;
pub mod difference;
pub mod engine;
pub mod error;
pub mod event;
pub mod export;
pub mod ffmpeg;
pub mod frame;
pub mod peak;
pub mod progress;
pub mod sink;
pub mod threshold;
pub mod tuning;
pub mod video;
pub mod window;

pub use configuration::{DetectionConfig, OutputMode, TimeBounds};
pub use detector::{DecisionStrategy, DetectionReport, KeyframeDetector, Termination};
pub use difference::FrameDifferenceMeter;
pub use engine::{EngineState, KeyframeDecision, KeyframeDecisionEngine};
pub use error::KeyframeError;
pub use event::{KeyframeDebug, KeyframeEvent, KeyframeReason};
pub use export::{events_to_json, write_events, write_metadata};
pub use ffmpeg::set_decoder_log_level;
pub use frame::GrayFrame;
pub use peak::PeakBaselineOptions;
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use sink::{ImageDirectorySink, KeyframeSink};
pub use threshold::{ThresholdPolicy, adjusted_threshold};
pub use tuning::{ContentType, PolicyParameters, Sensitivity, TuningOptions, tune};
pub use video::{VideoFile, VideoFrameIterator, VideoMetadata};
pub use window::{LookAheadWindow, MAX_WINDOW_CAPACITY, MagnitudeSample};
