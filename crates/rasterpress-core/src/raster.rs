//! In-memory raster images handed to the encoder.

use crate::error::InputError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Only supported sample depth.
pub const BIT_DEPTH: u8 = 8;

/// Pixel layout, mapped onto the PNG color type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ColorType {
    /// One gray sample per pixel.
    Gray = 0,
    /// Red, green, blue.
    Rgb = 2,
    /// Gray and alpha.
    GrayAlpha = 4,
    /// Red, green, blue, alpha.
    Rgba = 6,
}

impl ColorType {
    /// Map a channel count (1-4) to its color type.
    pub fn from_channels(channels: u8) -> Result<Self, InputError> {
        match channels {
            1 => Ok(ColorType::Gray),
            2 => Ok(ColorType::GrayAlpha),
            3 => Ok(ColorType::Rgb),
            4 => Ok(ColorType::Rgba),
            other => Err(InputError::UnsupportedChannels(other)),
        }
    }

    /// Number of samples per pixel.
    pub fn channels(self) -> u8 {
        match self {
            ColorType::Gray => 1,
            ColorType::GrayAlpha => 2,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }

    /// The color type byte written into the image header.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorType::GrayAlpha | ColorType::Rgba)
    }
}

/// An image with 8-bit samples in row-major order.
///
/// The pixel buffer length always equals `width * height * channels`;
/// every constructor checks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    color: ColorType,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Create a raster with 8-bit samples.
    ///
    /// # Arguments
    ///
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `channels` - Samples per pixel (1-4)
    /// * `pixels` - Sample data, `width * height * channels` bytes
    ///
    /// # Errors
    ///
    /// Returns an `InputError` when the channel count is unsupported or the
    /// buffer length doesn't match the dimensions.
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Result<Self, InputError> {
        Self::with_bit_depth(width, height, channels, BIT_DEPTH, pixels)
    }

    /// Create a raster with an explicit bit depth. Only 8 is accepted.
    pub fn with_bit_depth(
        width: u32,
        height: u32,
        channels: u8,
        bit_depth: u8,
        pixels: Vec<u8>,
    ) -> Result<Self, InputError> {
        if bit_depth != BIT_DEPTH {
            return Err(InputError::UnsupportedBitDepth(bit_depth));
        }
        let color = ColorType::from_channels(channels)?;
        let expected = expected_len(width, height, channels)?;
        if pixels.len() != expected {
            return Err(InputError::BufferLength {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            color,
            pixels,
        })
    }

    /// Convert a decoded `image` crate image, keeping gray and alpha when
    /// present. Samples wider than 8 bits are reduced to 8.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let layout = img.color();
        let (color, pixels) = match (layout.has_color(), layout.has_alpha()) {
            (false, false) => (ColorType::Gray, img.into_luma8().into_raw()),
            (false, true) => (ColorType::GrayAlpha, img.into_luma_alpha8().into_raw()),
            (true, false) => (ColorType::Rgb, img.into_rgb8().into_raw()),
            (true, true) => (ColorType::Rgba, img.into_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            color,
            pixels,
        }
    }

    /// Decode an encoded image (PNG or JPEG) from memory.
    pub fn decode(bytes: &[u8]) -> Result<Self, InputError> {
        let img = image::load_from_memory(bytes).map_err(|e| InputError::Decode(e.to_string()))?;
        Ok(Self::from_dynamic(img))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_type(&self) -> ColorType {
        self.color
    }

    pub fn channels(&self) -> u8 {
        self.color.channels()
    }

    pub fn bit_depth(&self) -> u8 {
        BIT_DEPTH
    }

    /// Distance in bytes between a byte and the matching byte of the
    /// previous pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels() as usize
    }

    /// Length of one scanline in bytes.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// The raw sample buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the image and return its sample buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Iterate scanlines from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let row_bytes = self.row_bytes();
        (0..self.height as usize).map(move |y| &self.pixels[y * row_bytes..(y + 1) * row_bytes])
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Load and decode an image file through the `image` crate.
pub fn load_raster(path: impl AsRef<Path>) -> Result<RasterImage, InputError> {
    let img = image::open(path.as_ref()).map_err(|e| InputError::Decode(e.to_string()))?;
    Ok(RasterImage::from_dynamic(img))
}

fn expected_len(width: u32, height: u32, channels: u8) -> Result<usize, InputError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels as usize))
        .ok_or(InputError::DimensionsOverflow { width, height })
}
