//! FFmpeg console output control.
//!
//! FFmpeg logs to stderr on its own, independently of the [`log`] facade.
//! [`set_decoder_log_level`] maps a [`log::LevelFilter`] onto FFmpeg's
//! levels so one verbosity switch governs both.
//!
//! ```no_run
//! use log::LevelFilter;
//!
//! // Only let FFmpeg print errors.
//! keyframe_detector::set_decoder_log_level(LevelFilter::Error);
//! ```

use ffmpeg_next::util::log::{self as ffmpeg_log, Level};
use log::LevelFilter;

/// The FFmpeg level corresponding to `filter`.
pub fn ffmpeg_level(filter: LevelFilter) -> Level {
    match filter {
        LevelFilter::Off => Level::Quiet,
        LevelFilter::Error => Level::Error,
        LevelFilter::Warn => Level::Warning,
        LevelFilter::Info => Level::Info,
        LevelFilter::Debug => Level::Debug,
        LevelFilter::Trace => Level::Trace,
    }
}

/// Set how much FFmpeg itself prints while decoding.
pub fn set_decoder_log_level(filter: LevelFilter) {
    log::debug!("FFmpeg log level set to {filter}");
    ffmpeg_log::set_level(ffmpeg_level(filter));
}
