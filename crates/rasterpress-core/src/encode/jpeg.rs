//! Lossy JPEG export.
//!
//! JPEG encoding is delegated to the `image` crate's baseline encoder. JPEG
//! has no alpha channel, so alpha is dropped before encoding.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;

use crate::config::LossyConfig;
use crate::error::{EncodeError, Error, InputError, Stage};
use crate::raster::{ColorType, RasterImage};

/// Encode an image as JPEG bytes.
///
/// # Arguments
///
/// * `image` - Raster to encode; gray stays gray, color becomes RGB
/// * `config` - Quality hint (1-100)
///
/// # Quality Guidelines
///
/// * 90-100: High quality, suitable for archival
/// * 60-90: Good quality for most uses
/// * Below 60: Small files with visible artifacts (the default of 50 sits here)
///
/// # Errors
///
/// Images with a zero dimension are rejected; JPEG cannot represent them.
pub fn encode_jpeg(image: &RasterImage, config: &LossyConfig) -> Result<Vec<u8>, Error> {
    // Validate dimensions
    if image.width() == 0 || image.height() == 0 {
        return Err(InputError::EmptyImage {
            width: image.width(),
            height: image.height(),
        }
        .into());
    }

    let quality = config.quality();
    log::debug!(
        "encoding {}x{} {:?} JPEG at quality {}",
        image.width(),
        image.height(),
        image.color_type(),
        quality
    );

    let (samples, layout) = jpeg_samples(image);

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(&samples, image.width(), image.height(), layout)
        .map_err(|e| Error::encode(Stage::Writing, EncodeError::Jpeg(e.to_string())))?;

    Ok(buffer.into_inner())
}

/// Strip alpha and pick the matching sample layout.
fn jpeg_samples(image: &RasterImage) -> (Vec<u8>, ExtendedColorType) {
    let pixels = image.pixels();
    match image.color_type() {
        ColorType::Gray => (pixels.to_vec(), ExtendedColorType::L8),
        ColorType::GrayAlpha => (
            pixels.chunks_exact(2).map(|px| px[0]).collect(),
            ExtendedColorType::L8,
        ),
        ColorType::Rgb => (pixels.to_vec(), ExtendedColorType::Rgb8),
        ColorType::Rgba => (
            pixels
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            ExtendedColorType::Rgb8,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: u32, height: u32, channels: u8, value: u8) -> RasterImage {
        let len = (width * height * channels as u32) as usize;
        RasterImage::new(width, height, channels, vec![value; len]).unwrap()
    }

    fn assert_jpeg_markers(bytes: &[u8]) {
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_basic() {
        let image = flat(100, 100, 3, 128);
        let bytes = encode_jpeg(&image, &LossyConfig::default()).unwrap();
        assert_jpeg_markers(&bytes);
    }

    #[test]
    fn test_every_color_type_encodes() {
        for channels in 1..=4 {
            let image = flat(16, 9, channels, 200);
            let bytes = encode_jpeg(&image, &LossyConfig::new(90)).unwrap();
            assert_jpeg_markers(&bytes);
        }
    }

    #[test]
    fn test_alpha_is_dropped() {
        let image = RasterImage::new(2, 1, 4, vec![1, 2, 3, 255, 4, 5, 6, 0]).unwrap();
        let (samples, layout) = jpeg_samples(&image);
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(layout, ExtendedColorType::Rgb8);

        let image = RasterImage::new(2, 1, 2, vec![9, 255, 8, 0]).unwrap();
        let (samples, layout) = jpeg_samples(&image);
        assert_eq!(samples, vec![9, 8]);
        assert_eq!(layout, ExtendedColorType::L8);
    }

    #[test]
    fn test_decodes_back_to_same_size() {
        let image = flat(33, 17, 3, 90);
        let bytes = encode_jpeg(&image, &LossyConfig::default()).unwrap();
        let decoded = RasterImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (33, 17));
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        let image = RasterImage::new(0, 10, 3, Vec::new()).unwrap();
        let err = encode_jpeg(&image, &LossyConfig::default()).unwrap_err();
        assert_eq!(err.stage(), Stage::Validate);
    }

    #[test]
    fn test_quality_is_clamped() {
        let image = flat(10, 10, 3, 128);
        assert!(encode_jpeg(&image, &LossyConfig::new(0)).is_ok());
        assert!(encode_jpeg(&image, &LossyConfig::new(255)).is_ok());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
