//! Keyframe image output.
//!
//! A [`KeyframeSink`] receives the pixels of each keyframe as it is
//! decided. [`ImageDirectorySink`] writes them as `keyframe{index}.jpg`
//! files into a directory.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::KeyframeError;
use crate::event::KeyframeEvent;
use crate::frame::GrayFrame;

/// Receives keyframe pixels during a run.
///
/// Failures are reported as [`KeyframeError::SinkError`]; the detector logs
/// them and keeps going.
pub trait KeyframeSink {
    /// Store the image for `event`. Returns where it was written.
    fn save(&mut self, frame: &GrayFrame, event: &KeyframeEvent) -> Result<PathBuf, KeyframeError>;
}

/// Saves keyframes as RGB JPEG files in a directory.
///
/// Frames carrying a color image are saved in color; luminance-only frames
/// are expanded to three gray channels.
#[derive(Debug, Clone)]
pub struct ImageDirectorySink {
    directory: PathBuf,
}

impl ImageDirectorySink {
    /// Use `directory` for output, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::IoError`] if the directory cannot be
    /// created.
    pub fn create<P: AsRef<Path>>(directory: P) -> Result<Self, KeyframeError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        log::debug!("Saving keyframe images to {}", directory.display());
        Ok(Self { directory })
    }

    /// Where images are written.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file an event's image is written to.
    pub fn path_for(&self, frame_index: u64) -> PathBuf {
        self.directory.join(format!("keyframe{frame_index}.jpg"))
    }
}

impl KeyframeSink for ImageDirectorySink {
    fn save(&mut self, frame: &GrayFrame, event: &KeyframeEvent) -> Result<PathBuf, KeyframeError> {
        let path = self.path_for(event.frame_index);
        let sink_error = |reason: String| KeyframeError::SinkError {
            path: path.clone(),
            frame_index: event.frame_index,
            reason,
        };

        let image = frame
            .to_rgb_image()
            .ok_or_else(|| sink_error("frame has no pixels".to_string()))?;
        image
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|error| sink_error(error.to_string()))?;

        log::debug!("Saved keyframe image {}", path.display());
        Ok(path)
    }
}
