//! FFmpeg-backed frame source.
//!
//! [`VideoFile`] opens a container, picks the best video stream and caches
//! its [`VideoMetadata`]. [`VideoFile::frames`] returns a lazy
//! [`VideoFrameIterator`] that decodes every frame to 8-bit grayscale, ready
//! for [`KeyframeDetector`](crate::KeyframeDetector), with the RGB image
//! attached for saving. [`VideoFile::luma_frames`] skips the color
//! conversion when no images are saved.
//!
//! # Example
//!
//! ```no_run
//! use keyframe_detector::{DetectionConfig, KeyframeDetector, VideoFile};
//!
//! let mut video = VideoFile::open("input.mp4")?;
//! let fps = video.metadata().frames_per_second;
//!
//! let detector = KeyframeDetector::new(&DetectionConfig::new(), fps)?;
//! let report = detector.detect(video.luma_frames()?)?;
//! println!("{} keyframes", report.events.len());
//! # Ok::<(), keyframe_detector::KeyframeError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as FfmpegFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::conversion::{packed_plane, pts_to_seconds, rational_to_f64};
use crate::error::KeyframeError;
use crate::frame::GrayFrame;

/// Properties of the selected video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Average frame rate. Approximate for variable-frame-rate content.
    pub frames_per_second: f64,
    /// Estimated from duration and frame rate.
    pub frame_count: u64,
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
    /// Container format name (e.g. `"mp4"`).
    pub format: String,
}

/// An opened video file.
pub struct VideoFile {
    input_context: Input,
    metadata: VideoMetadata,
    stream_index: usize,
    path: PathBuf,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("stream_index", &self.stream_index)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open `path` and read the best video stream's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::FileOpen`] if FFmpeg cannot open the file or
    /// read the stream's codec, and [`KeyframeError::NoVideoStream`] if
    /// there is no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KeyframeError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |reason: String| KeyframeError::FileOpen {
            path: path.clone(),
            reason,
        };

        log::debug!("Opening video file: {}", path.display());

        ffmpeg_next::init().map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input_context = ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(KeyframeError::NoVideoStream)?;
        let stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frames_per_second = rational_to_f64(stream.avg_frame_rate())
            .or_else(|| rational_to_f64(stream.rate()))
            .unwrap_or(0.0);
        let frame_count = match stream.frames() {
            frames if frames > 0 => frames as u64,
            _ => (duration.as_secs_f64() * frames_per_second) as u64,
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec: decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            format: input_context.format().name().to_string(),
        };

        log::info!(
            "Opened video file: {} ({}x{}, {:.2} fps, codec={}, duration={:.2}s, ~{} frames)",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.codec,
            metadata.duration.as_secs_f64(),
            metadata.frame_count,
        );

        Ok(Self {
            input_context,
            metadata,
            stream_index,
            path,
        })
    }

    /// Properties of the selected video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// The path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the stream from its current position as grayscale frames,
    /// each carrying its RGB image.
    ///
    /// The iterator borrows the file mutably. Frame indices count from 0
    /// for each iterator.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::FfmpegError`] if the decoder or scaler
    /// cannot be created.
    pub fn frames(&mut self) -> Result<VideoFrameIterator<'_>, KeyframeError> {
        VideoFrameIterator::new(self, true)
    }

    /// Like [`frames`](Self::frames) without the RGB images. The luminance
    /// is identical.
    ///
    /// # Errors
    ///
    /// See [`frames`](Self::frames).
    pub fn luma_frames(&mut self) -> Result<VideoFrameIterator<'_>, KeyframeError> {
        VideoFrameIterator::new(self, false)
    }
}

/// Lazy grayscale decoder over a [`VideoFile`].
///
/// Yields `Ok(GrayFrame)` per decoded frame with its presentation time in
/// seconds. A decode failure is yielded once as `Err` and ends iteration.
/// Luminance always comes from FFmpeg's GRAY8 conversion, so detection does
/// not depend on whether color is kept.
pub struct VideoFrameIterator<'a> {
    video: &'a mut VideoFile,
    decoder: VideoDecoder,
    gray_scaler: ScalingContext,
    color_scaler: Option<ScalingContext>,
    time_base: Rational,
    frames_per_second: f64,
    width: u32,
    height: u32,
    decoded_frame: FfmpegFrame,
    gray_frame: FfmpegFrame,
    color_frame: FfmpegFrame,
    next_index: u64,
    eof_sent: bool,
    done: bool,
}

impl<'a> VideoFrameIterator<'a> {
    fn new(video: &'a mut VideoFile, keep_color: bool) -> Result<Self, KeyframeError> {
        let stream = video
            .input_context
            .stream(video.stream_index)
            .ok_or(KeyframeError::NoVideoStream)?;
        let time_base = stream.time_base();
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler_to = |format: Pixel| {
            ScalingContext::get(
                decoder.format(),
                width,
                height,
                format,
                width,
                height,
                ScalingFlags::BILINEAR,
            )
        };
        let gray_scaler = scaler_to(Pixel::GRAY8)?;
        let color_scaler = if keep_color {
            Some(scaler_to(Pixel::RGB24)?)
        } else {
            None
        };
        let frames_per_second = video.metadata.frames_per_second;

        Ok(Self {
            video,
            decoder,
            gray_scaler,
            color_scaler,
            time_base,
            frames_per_second,
            width,
            height,
            decoded_frame: FfmpegFrame::empty(),
            gray_frame: FfmpegFrame::empty(),
            color_frame: FfmpegFrame::empty(),
            next_index: 0,
            eof_sent: false,
            done: false,
        })
    }

    fn convert_current_frame(&mut self) -> Result<GrayFrame, KeyframeError> {
        self.gray_scaler.run(&self.decoded_frame, &mut self.gray_frame)?;

        let index = self.next_index;
        let time = match self.decoded_frame.timestamp().or(self.decoded_frame.pts()) {
            Some(pts) => pts_to_seconds(pts, self.time_base),
            None if self.frames_per_second > 0.0 => index as f64 / self.frames_per_second,
            None => 0.0,
        };

        let (width, height) = (self.width as usize, self.height as usize);
        let pixels = packed_plane(&self.gray_frame, width, height);
        let mut frame = GrayFrame::new(self.width, self.height, pixels, time, index)
            .map_err(|error| KeyframeError::VideoDecodeError(error.to_string()))?;

        if let Some(scaler) = self.color_scaler.as_mut() {
            scaler.run(&self.decoded_frame, &mut self.color_frame)?;
            let rgb = packed_plane(&self.color_frame, width * 3, height);
            let color = RgbImage::from_raw(self.width, self.height, rgb).ok_or_else(|| {
                KeyframeError::VideoDecodeError(format!("short RGB buffer for frame {index}"))
            })?;
            frame = frame
                .with_color(color)
                .map_err(|error| KeyframeError::VideoDecodeError(error.to_string()))?;
        }
        self.next_index += 1;
        Ok(frame)
    }

    fn fail(&mut self, error: KeyframeError) -> Option<Result<GrayFrame, KeyframeError>> {
        self.done = true;
        Some(Err(error))
    }
}

impl Iterator for VideoFrameIterator<'_> {
    type Item = Result<GrayFrame, KeyframeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return match self.convert_current_frame() {
                    Ok(frame) => Some(Ok(frame)),
                    Err(error) => self.fail(error),
                };
            }

            if self.eof_sent {
                self.done = true;
                log::debug!("Decoded {} frames", self.next_index);
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.video.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video.stream_index
                        && let Err(error) = self.decoder.send_packet(&packet)
                    {
                        return self.fail(KeyframeError::VideoDecodeError(error.to_string()));
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.fail(KeyframeError::from(error));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::debug!("Skipping unreadable packet: {error}");
                }
            }
        }
    }
}
