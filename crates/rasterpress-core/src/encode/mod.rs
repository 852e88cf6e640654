//! Image encoders.
//!
//! This module provides:
//! - Lossless PNG encoding through the in-crate DEFLATE implementation
//! - Lossy JPEG export through the `image` crate
//!
//! # Architecture
//!
//! Every encode call owns all of its working state, so independent images
//! can be encoded on separate threads. Results are produced in memory and
//! only handed to a writer or file once encoding has fully succeeded.
//!
//! # Examples
//!
//! ```ignore
//! use rasterpress_core::encode::{encode_png, encode_jpeg};
//! use rasterpress_core::{EncoderConfig, LossyConfig, RasterImage};
//!
//! let image = RasterImage::new(100, 100, 3, vec![128u8; 100 * 100 * 3])?;
//! let png = encode_png(&image, &EncoderConfig::best())?;
//! let jpeg = encode_jpeg(&image, &LossyConfig::default())?;
//! ```

mod jpeg;
mod png;

pub use jpeg::encode_jpeg;
pub use png::{encode_png, encode_png_to_path, encode_png_to_writer, PipelineState};

pub(crate) use png::publish;
