//! Rasterpress WASM - WebAssembly bindings for rasterpress
//!
//! This crate exposes the rasterpress-core encoders to JavaScript/TypeScript
//! applications.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper types for raster data
//! - `encode` - PNG, JPEG and gzip encoding bindings
//!
//! # Usage
//!
//! ```typescript
//! import init, { encode_png, JsRasterImage } from '@rasterpress/wasm';
//!
//! await init();
//!
//! const png = encode_png(imageData.data, imageData.width, imageData.height, 4, 9);
//! console.log(`Encoded ${png.byteLength} bytes`);
//! ```

use wasm_bindgen::prelude::*;

mod encode;
mod types;

pub use encode::{encode_jpeg, encode_jpeg_from_image, encode_png, encode_png_with_config, gzip};
pub use types::JsRasterImage;

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
