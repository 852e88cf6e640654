//! Rasterpress Core - Lossless image compression library
//!
//! This crate encodes in-memory rasters as PNG files using its own DEFLATE
//! implementation: adaptive scanline filtering, an LZ77 hash-chain match
//! finder and per-block dynamic Huffman coding. It also provides zlib and
//! gzip framings, JPEG export through the `image` crate, and file-to-file
//! presets.

pub mod chunk;
pub mod config;
pub mod deflate;
pub mod encode;
pub mod error;
pub mod filter;
pub mod presets;
pub mod raster;

pub use config::{EncoderConfig, FilterStrategy, LossyConfig};
pub use deflate::{compress, gzip_compress, zlib_compress};
pub use encode::{encode_jpeg, encode_png, encode_png_to_path, encode_png_to_writer};
pub use error::{EncodeError, Error, InputError, Stage};
pub use filter::FilterType;
pub use presets::{compress_image_lossless, compress_image_lossy, gzip_file, CompressionReport};
pub use raster::{load_raster, ColorType, RasterImage};

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn assert_send_sync<T: Send + Sync>() {}

    fn noise(width: u32, height: u32, channels: u8, seed: u32) -> RasterImage {
        let mut state = seed | 1;
        let len = (width * height * channels as u32) as usize;
        let pixels = (0..len)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                // Mix in some structure so matches exist
                if i % 5 == 0 {
                    (state >> 24) as u8
                } else {
                    (i % 64) as u8
                }
            })
            .collect();
        RasterImage::new(width, height, channels, pixels).unwrap()
    }

    #[test]
    fn test_shared_types_are_send_sync() {
        assert_send_sync::<RasterImage>();
        assert_send_sync::<EncoderConfig>();
        assert_send_sync::<LossyConfig>();
        assert_send_sync::<Error>();
    }

    #[test]
    fn test_parallel_encodes_match_sequential() {
        let images: Vec<RasterImage> = (0..6)
            .map(|i| noise(40 + i * 7, 30 + i * 3, (i % 4 + 1) as u8, i * 7919 + 1))
            .collect();
        let config = EncoderConfig::default();

        let sequential: Vec<Vec<u8>> = images
            .iter()
            .map(|image| encode_png(image, &config).unwrap())
            .collect();

        let parallel: Vec<Vec<u8>> = thread::scope(|scope| {
            let handles: Vec<_> = images
                .iter()
                .map(|image| scope.spawn(|| encode_png(image, &config).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_buffer_length_mismatch_is_input_error() {
        let err = RasterImage::new(4, 4, 3, vec![0; 47]).unwrap_err();
        assert_eq!(
            err,
            InputError::BufferLength {
                expected: 48,
                actual: 47
            }
        );
        let err: Error = err.into();
        assert_eq!(err.stage(), Stage::Validate);
    }

    #[test]
    fn test_best_preset_not_larger_than_fast() {
        let image = noise(64, 64, 3, 42);
        let fast = encode_png(&image, &EncoderConfig::fast()).unwrap();
        let best = encode_png(&image, &EncoderConfig::best()).unwrap();
        // Deeper search may parse differently; it should not be notably worse
        assert!(best.len() <= fast.len() + fast.len() / 20);
    }
}
