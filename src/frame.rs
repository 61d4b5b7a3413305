//! Grayscale frames as consumed by the decision engine.
//!
//! A [`GrayFrame`] is a tightly packed 8-bit luminance raster together with
//! the presentation time and ordinal index it was decoded at. Frame sources
//! produce them; the engine borrows them for one difference computation and
//! keeps only the previous frame around. A source may attach the decoded
//! color image, which is what keyframe images are saved from.

use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::KeyframeError;

/// An 8-bit grayscale frame with its timestamp and index.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// Presentation time in seconds.
    pub time: f64,
    /// Zero-based ordinal of the frame in decode order.
    pub index: u64,
    color: Option<RgbImage>,
}

impl GrayFrame {
    /// Wrap a row-major luminance buffer.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] if `pixels.len()` is not
    /// `width * height`.
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        time: f64,
        index: u64,
    ) -> Result<Self, KeyframeError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(KeyframeError::InvalidConfig(format!(
                "frame {index} holds {} bytes, expected {expected} for {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
            time,
            index,
            color: None,
        })
    }

    /// A frame where every pixel has the same intensity.
    pub fn filled(width: u32, height: u32, value: u8, time: f64, index: u64) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
            time,
            index,
            color: None,
        }
    }

    /// Take ownership of an [`image::GrayImage`].
    pub fn from_gray_image(image: GrayImage, time: f64, index: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
            time,
            index,
            color: None,
        }
    }

    /// Convert any decoded image to luminance. Color images are kept
    /// alongside for saving.
    pub fn from_dynamic_image(image: &DynamicImage, time: f64, index: u64) -> Self {
        let mut frame = Self::from_gray_image(image.to_luma8(), time, index);
        if image.color().has_color() {
            frame.color = Some(image.to_rgb8());
        }
        frame
    }

    /// Attach the color image this frame's luminance was derived from.
    ///
    /// # Errors
    ///
    /// Returns [`KeyframeError::InvalidConfig`] if the image size differs
    /// from the frame's.
    pub fn with_color(mut self, color: RgbImage) -> Result<Self, KeyframeError> {
        if color.dimensions() != self.dimensions() {
            let (width, height) = color.dimensions();
            return Err(KeyframeError::InvalidConfig(format!(
                "color image of frame {} is {width}x{height}, expected {}x{}",
                self.index, self.width, self.height
            )));
        }
        self.color = Some(color);
        Ok(self)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major pixel intensities.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The attached color image, if the source provided one.
    pub fn color_image(&self) -> Option<&RgbImage> {
        self.color.as_ref()
    }

    /// Copy the pixels into an [`image::GrayImage`] for encoding.
    pub fn to_gray_image(&self) -> Option<GrayImage> {
        GrayImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// The color image, or the luminance expanded to RGB when there is none.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        match &self.color {
            Some(color) => Some(color.clone()),
            None => self
                .to_gray_image()
                .map(|gray| DynamicImage::ImageLuma8(gray).to_rgb8()),
        }
    }
}
