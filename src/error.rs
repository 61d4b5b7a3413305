//! Error types for the `keyframe-detector` crate.
//!
//! This module defines [`KeyframeError`], the unified error type returned by
//! all fallible operations in the crate. Configuration problems surface
//! before any frame is processed; per-frame failures carry the frame index
//! and timestamp at which they happened.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all keyframe detection operations.
///
/// Every public method that can fail returns `Result<T, KeyframeError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyframeError {
    /// Two consecutive frames have different dimensions.
    #[error(
        "Frame {frame_index} ({time:.3}s) is {current_width}x{current_height} but the previous frame is {previous_width}x{previous_height}"
    )]
    DimensionMismatch {
        /// Index of the frame that failed to match.
        frame_index: u64,
        /// Timestamp of the frame that failed to match, in seconds.
        time: f64,
        /// Width of the previous frame.
        previous_width: u32,
        /// Height of the previous frame.
        previous_height: u32,
        /// Width of the offending frame.
        current_width: u32,
        /// Height of the offending frame.
        current_height: u32,
    },

    /// A detection parameter is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sensitivity or content type name is not one of the known presets.
    #[error("Unknown {kind} preset: {name:?} (expected one of {expected})")]
    UnknownPreset {
        /// Which preset table was consulted (`"sensitivity"` or `"content type"`).
        kind: &'static str,
        /// The name that was looked up.
        name: String,
        /// Comma-separated list of accepted names.
        expected: &'static str,
    },

    /// The frame source failed mid-stream.
    #[error("Frame source failed at frame {frame_index} ({time:.3}s): {reason}")]
    SourceError {
        /// Index of the last frame requested from the source.
        frame_index: u64,
        /// Timestamp of the last frame successfully read, in seconds.
        time: f64,
        /// Underlying reason reported by the source.
        reason: String,
    },

    /// A keyframe image could not be written.
    #[error("Failed to save keyframe {frame_index} to {path}: {reason}")]
    SinkError {
        /// Destination path of the image.
        path: PathBuf,
        /// Frame index of the keyframe.
        frame_index: u64,
        /// Underlying reason the save failed.
        reason: String,
    },

    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding a keyframe.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// Keyframe metadata could not be serialized.
    #[error("JSON error: {0}")]
    JsonError(#[from] JsonError),
}

impl From<FfmpegError> for KeyframeError {
    fn from(error: FfmpegError) -> Self {
        KeyframeError::FfmpegError(error.to_string())
    }
}

impl KeyframeError {
    /// Returns `true` for errors raised while validating configuration,
    /// before any frame has been processed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            KeyframeError::InvalidConfig(_) | KeyframeError::UnknownPreset { .. }
        )
    }
}
