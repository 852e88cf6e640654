//! Encoding WASM bindings.
//!
//! # Functions
//!
//! - [`encode_png`] - Encode raw samples as PNG at a compression effort
//! - [`encode_png_with_config`] - Encode a `JsRasterImage` with a full config
//! - [`encode_jpeg`] - Encode raw samples as JPEG
//! - [`encode_jpeg_from_image`] - Encode a `JsRasterImage` as JPEG
//! - [`gzip`] - Wrap arbitrary bytes in a gzip member
//!
//! # Example
//!
//! ```typescript
//! import { encode_png, gzip } from '@rasterpress/wasm';
//!
//! const png = encode_png(pixels, width, height, 4, 9);
//! const packed = gzip(png, 9);
//! ```

use crate::types::{js_error, JsRasterImage};
use rasterpress_core::{EncoderConfig, LossyConfig, RasterImage};
use wasm_bindgen::prelude::*;

/// Encode 8-bit samples as a PNG file.
///
/// # Arguments
///
/// * `pixels` - Row-major samples as a `Uint8Array`
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 1 (gray), 2 (gray+alpha), 3 (RGB) or 4 (RGBA)
/// * `effort` - Compression effort 0-9 (6 is a good default)
///
/// # Errors
///
/// Returns an error if the pixel data length doesn't match the dimensions
/// or the channel count is unsupported.
#[wasm_bindgen]
pub fn encode_png(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: u8,
    effort: u8,
) -> Result<Vec<u8>, JsValue> {
    let image = RasterImage::new(width, height, channels, pixels.to_vec()).map_err(js_error)?;
    let config = EncoderConfig::new().with_effort(effort);
    rasterpress_core::encode_png(&image, &config).map_err(js_error)
}

/// Encode an image with a configuration object.
///
/// `config` is a plain object with any of `compression_effort`,
/// `max_input_bytes`, `idat_chunk_len` and `filter`; missing fields take
/// their defaults. `undefined` or `null` selects the default configuration.
#[wasm_bindgen]
pub fn encode_png_with_config(image: &JsRasterImage, config: JsValue) -> Result<Vec<u8>, JsValue> {
    let config: EncoderConfig = if config.is_undefined() || config.is_null() {
        EncoderConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    rasterpress_core::encode_png(image.raster(), &config).map_err(js_error)
}

/// Encode 8-bit samples as JPEG.
///
/// Alpha is dropped; gray input stays gray.
///
/// # Arguments
///
/// * `quality` - JPEG quality (1-100, default preset is 50)
#[wasm_bindgen]
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: u8,
    quality: u8,
) -> Result<Vec<u8>, JsValue> {
    let image = RasterImage::new(width, height, channels, pixels.to_vec()).map_err(js_error)?;
    rasterpress_core::encode_jpeg(&image, &LossyConfig::new(quality)).map_err(js_error)
}

/// Encode a JsRasterImage as JPEG.
#[wasm_bindgen]
pub fn encode_jpeg_from_image(image: &JsRasterImage, quality: u8) -> Result<Vec<u8>, JsValue> {
    rasterpress_core::encode_jpeg(image.raster(), &LossyConfig::new(quality)).map_err(js_error)
}

/// Compress bytes into a gzip member.
#[wasm_bindgen]
pub fn gzip(bytes: &[u8], effort: u8) -> Result<Vec<u8>, JsValue> {
    rasterpress_core::gzip_compress(bytes, effort).map_err(js_error)
}
