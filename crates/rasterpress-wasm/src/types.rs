//! WASM-compatible wrapper types for raster data.
//!
//! This module provides JavaScript-friendly types that wrap the core
//! rasterpress types, handling the conversion between Rust and JavaScript
//! data representations.

use rasterpress_core::{Error, InputError, RasterImage};
use wasm_bindgen::prelude::*;

/// Convert a core error into a JavaScript exception value.
pub(crate) fn js_error(err: impl Into<Error>) -> JsValue {
    JsValue::from_str(&err.into().to_string())
}

/// A raster image wrapper for JavaScript.
///
/// # Memory Management
///
/// The pixel data is stored in WASM memory. Calling `pixels()` copies it to
/// JavaScript memory as a `Uint8Array`. `free()` releases the WASM side
/// early; otherwise the wasm-bindgen finalizer does it.
#[wasm_bindgen]
pub struct JsRasterImage {
    inner: RasterImage,
}

#[wasm_bindgen]
impl JsRasterImage {
    /// Create an image from 8-bit samples.
    ///
    /// # Arguments
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `channels` - 1 (gray), 2 (gray+alpha), 3 (RGB) or 4 (RGBA)
    /// * `pixels` - Row-major samples, `width * height * channels` bytes
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Result<JsRasterImage, JsValue> {
        Self::try_new(width, height, channels, pixels).map_err(js_error)
    }

    /// Decode a PNG or JPEG file.
    pub fn decode(bytes: &[u8]) -> Result<JsRasterImage, JsValue> {
        RasterImage::decode(bytes)
            .map(Self::from_raster)
            .map_err(js_error)
    }

    /// Get the image width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Get the image height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Samples per pixel
    #[wasm_bindgen(getter)]
    pub fn channels(&self) -> u8 {
        self.inner.channels()
    }

    /// Get the number of bytes in the pixel buffer
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.inner.pixels().len()
    }

    /// Returns the samples as a Uint8Array (copied).
    pub fn pixels(&self) -> Vec<u8> {
        self.inner.pixels().to_vec()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {}
}

impl JsRasterImage {
    pub(crate) fn try_new(
        width: u32,
        height: u32,
        channels: u8,
        pixels: Vec<u8>,
    ) -> Result<Self, InputError> {
        RasterImage::new(width, height, channels, pixels).map(Self::from_raster)
    }

    pub(crate) fn from_raster(inner: RasterImage) -> Self {
        Self { inner }
    }

    pub(crate) fn raster(&self) -> &RasterImage {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_raster_image_creation() {
        let img = JsRasterImage::try_new(100, 50, 3, vec![0u8; 100 * 50 * 3]).unwrap();
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 50);
        assert_eq!(img.channels(), 3);
        assert_eq!(img.byte_length(), 15000);
    }

    #[test]
    fn test_js_raster_image_pixels() {
        let pixels = vec![255u8, 128, 64, 32, 16, 8, 4, 2];
        let img = JsRasterImage::try_new(2, 1, 4, pixels.clone()).unwrap();
        assert_eq!(img.pixels(), pixels);
    }

    #[test]
    fn test_try_new_rejects_bad_length() {
        let err = JsRasterImage::try_new(2, 2, 3, vec![0u8; 11]).err().unwrap();
        assert_eq!(
            err,
            InputError::BufferLength {
                expected: 12,
                actual: 11
            }
        );
    }

    #[test]
    fn test_from_raster() {
        let raster = RasterImage::new(3, 2, 1, vec![7u8; 6]).unwrap();
        let img = JsRasterImage::from_raster(raster.clone());
        assert_eq!(img.raster(), &raster);
    }
}
