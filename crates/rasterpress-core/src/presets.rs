//! File-to-file compression workflows.
//!
//! - [`compress_image_lossless`]: decode any supported image, write it as a
//!   maximum-effort PNG, then gzip that PNG into a second file
//! - [`compress_image_lossy`]: decode and re-save as JPEG at a quality hint
//! - [`gzip_file`]: gzip an arbitrary file
//!
//! Every output is published atomically; a failed run leaves no partial file.

use std::fs;
use std::path::Path;

use crate::config::{EncoderConfig, LossyConfig};
use crate::deflate::gzip_compress;
use crate::encode::{encode_jpeg, encode_png, publish};
use crate::error::{Error, Stage};
use crate::raster::load_raster;

/// Sizes of the files written by a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionReport {
    /// Size of the primary output (PNG or JPEG)
    pub output_bytes: u64,
    /// Size of the gzip copy, when one was written
    pub gzip_bytes: Option<u64>,
}

/// Re-encode `input` as PNG at `output`, and gzip the PNG to `gz_output`.
///
/// `config` controls the PNG encode; [`EncoderConfig::best`] matches the
/// usual lossless preset. The gzip pass uses the same effort.
pub fn compress_image_lossless(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    gz_output: impl AsRef<Path>,
    config: &EncoderConfig,
) -> Result<CompressionReport, Error> {
    let image = load_raster(input.as_ref())?;
    let png = encode_png(&image, config)?;
    publish(output.as_ref(), &png)?;

    let gz = gzip_compress(&png, config.effort())?;
    publish(gz_output.as_ref(), &gz)?;

    log::debug!(
        "lossless preset: {} -> {} ({} bytes), {} ({} bytes)",
        input.as_ref().display(),
        output.as_ref().display(),
        png.len(),
        gz_output.as_ref().display(),
        gz.len()
    );

    Ok(CompressionReport {
        output_bytes: png.len() as u64,
        gzip_bytes: Some(gz.len() as u64),
    })
}

/// Re-encode `input` as JPEG at `output`.
pub fn compress_image_lossy(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &LossyConfig,
) -> Result<CompressionReport, Error> {
    let image = load_raster(input.as_ref())?;
    let jpeg = encode_jpeg(&image, config)?;
    publish(output.as_ref(), &jpeg)?;

    Ok(CompressionReport {
        output_bytes: jpeg.len() as u64,
        gzip_bytes: None,
    })
}

/// Gzip the file at `input` into `output`.
pub fn gzip_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    effort: u8,
) -> Result<CompressionReport, Error> {
    let data = fs::read(input.as_ref()).map_err(|e| Error::io(Stage::Validate, e))?;
    let gz = gzip_compress(&data, effort)?;
    publish(output.as_ref(), &gz)?;

    Ok(CompressionReport {
        output_bytes: gz.len() as u64,
        gzip_bytes: Some(gz.len() as u64),
    })
}
