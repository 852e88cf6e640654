//! Lossless PNG encoding.
//!
//! The pipeline filters one scanline at a time and streams it straight into
//! the zlib encoder, whose output is cut into IDAT chunks as it is produced.
//! The filtered image is never held in memory as a whole.
//!
//! Output goes to a scratch buffer first. A destination (writer or file)
//! only ever sees a complete, successfully encoded container.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::chunk::{ChunkWriter, IdatWriter, ImageHeader};
use crate::config::{EncoderConfig, FilterStrategy};
use crate::deflate::ZlibEncoder;
use crate::error::{classify_io, EncodeError, Error, Stage};
use crate::filter::FilterSelector;
use crate::raster::RasterImage;

/// Where the encoder is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    /// Filtering and compressing scanline `i`
    FilteringRow(u32),
    /// Flushing the final deflate block
    Deflating,
    /// Emitting the remaining chunks
    Writing,
    Done,
    Failed(Stage),
}

pub(crate) struct PngPipeline<'a> {
    image: &'a RasterImage,
    config: &'a EncoderConfig,
    state: PipelineState,
}

impl<'a> PngPipeline<'a> {
    pub(crate) fn new(image: &'a RasterImage, config: &'a EncoderConfig) -> Self {
        Self {
            image,
            config,
            state: PipelineState::Init,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> PipelineState {
        self.state
    }

    /// Encode the image into a fresh buffer.
    pub(crate) fn run(&mut self) -> Result<Vec<u8>, Error> {
        match self.encode() {
            Ok(bytes) => {
                self.transition(PipelineState::Done);
                Ok(bytes)
            }
            Err(err) => {
                self.transition(PipelineState::Failed(err.stage()));
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        log::trace!("pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn encode(&mut self) -> Result<Vec<u8>, Error> {
        let image = self.image;
        let config = self.config;

        // Guard the input size before any work is done
        let limit = config.max_input_bytes;
        let actual = image.pixels().len() as u64;
        if actual > limit {
            return Err(Error::encode(
                Stage::Validate,
                EncodeError::InputTooLarge { limit, actual },
            ));
        }

        let mut chunks = ChunkWriter::new(Vec::new());
        chunks
            .write_header(&ImageHeader {
                width: image.width(),
                height: image.height(),
                color: image.color_type(),
            })
            .map_err(|e| classify_io(Stage::Writing, e))?;

        // Each scanline adds its filter tag byte to the stream
        let stream_limit = limit.saturating_add(image.height() as u64);
        let idat = IdatWriter::new(chunks, config.chunk_len());
        let mut zlib = ZlibEncoder::new(idat, config.effort()).with_limit(stream_limit);

        let row_bytes = image.row_bytes();
        let bpp = image.bytes_per_pixel();
        let zero_row = vec![0u8; row_bytes];
        let mut prev: &[u8] = &zero_row;
        let mut selector = FilterSelector::new(row_bytes);

        for (y, row) in image.rows().enumerate() {
            self.transition(PipelineState::FilteringRow(y as u32));
            let filter = match config.filter {
                FilterStrategy::Adaptive => selector.choose(row, prev, bpp),
                FilterStrategy::Fixed(filter) => {
                    selector.apply(filter, row, prev, bpp);
                    filter
                }
            };
            zlib.write_all(&[filter.tag()])
                .and_then(|_| zlib.write_all(selector.best()))
                .map_err(|e| classify_io(Stage::Deflating, e))?;
            prev = row;
        }

        self.transition(PipelineState::Deflating);
        let idat = zlib
            .finish()
            .map_err(|e| classify_io(Stage::Deflating, e))?;

        self.transition(PipelineState::Writing);
        idat.finish()
            .and_then(ChunkWriter::finish)
            .map_err(|e| classify_io(Stage::Writing, e))
    }
}

/// Encode an image as PNG bytes.
///
/// # Arguments
///
/// * `image` - Validated raster to encode
/// * `config` - Compression effort, size guard, IDAT size and filter choice
///
/// # Returns
///
/// The complete PNG file. Identical inputs always produce identical bytes.
///
/// # Errors
///
/// Returns [`Error::Encode`] with [`EncodeError::InputTooLarge`] when the
/// pixel buffer exceeds `config.max_input_bytes`.
///
/// # Example
///
/// ```ignore
/// use rasterpress_core::{encode_png, EncoderConfig, RasterImage};
///
/// let image = RasterImage::new(2, 1, 3, vec![255, 0, 0, 0, 0, 255])?;
/// let png = encode_png(&image, &EncoderConfig::default())?;
/// assert_eq!(&png[1..4], b"PNG");
/// ```
pub fn encode_png(image: &RasterImage, config: &EncoderConfig) -> Result<Vec<u8>, Error> {
    log::debug!(
        "encoding {}x{} {:?} PNG at effort {}",
        image.width(),
        image.height(),
        image.color_type(),
        config.effort()
    );
    let bytes = PngPipeline::new(image, config).run()?;
    log::debug!(
        "encoded {} pixel bytes into {} PNG bytes",
        image.pixels().len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Encode an image and write the finished file to `sink`.
///
/// Nothing is written unless encoding succeeds.
pub fn encode_png_to_writer<W: Write + ?Sized>(
    image: &RasterImage,
    config: &EncoderConfig,
    sink: &mut W,
) -> Result<(), Error> {
    let bytes = encode_png(image, config)?;
    sink.write_all(&bytes)
        .and_then(|_| sink.flush())
        .map_err(|e| Error::io(Stage::Publishing, e))
}

/// Encode an image and atomically replace the file at `path`.
///
/// The data is written to a temporary file next to the destination, synced
/// and renamed into place. On failure the temporary file is removed and the
/// destination is left untouched.
pub fn encode_png_to_path(
    image: &RasterImage,
    config: &EncoderConfig,
    path: impl AsRef<Path>,
) -> Result<(), Error> {
    let bytes = encode_png(image, config)?;
    publish(path.as_ref(), &bytes)
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Removes the temporary file unless the rename went through.
struct TempFile {
    path: PathBuf,
    keep: bool,
}

impl TempFile {
    fn beside(dest: &Path) -> Self {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_name = format!(".{}.{}-{}.tmp", name, std::process::id(), n);
        Self {
            path: dest.with_file_name(temp_name),
            keep: false,
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove temporary file {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Write `bytes` to `dest` through a synced temporary file and a rename.
pub(crate) fn publish(dest: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut temp = TempFile::beside(dest);

    let mut file = File::create(&temp.path).map_err(|e| Error::io(Stage::Publishing, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::io(Stage::Publishing, e))?;
    drop(file);

    fs::rename(&temp.path, dest).map_err(|e| Error::io(Stage::Publishing, e))?;
    temp.keep = true;

    log::debug!("published {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for a small image with arbitrary pixels.
    fn image_strategy() -> impl Strategy<Value = RasterImage> {
        (1u32..=24, 1u32..=24, 1u8..=4).prop_flat_map(|(w, h, c)| {
            let len = (w * h * c as u32) as usize;
            prop::collection::vec(any::<u8>(), len..=len)
                .prop_map(move |pixels| RasterImage::new(w, h, c, pixels).unwrap())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Property: The reference decoder reproduces the exact pixels.
        #[test]
        fn prop_roundtrip(image in image_strategy(), effort in 0u8..=9) {
            let config = EncoderConfig::new().with_effort(effort);
            let png = encode_png(&image, &config).unwrap();
            let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png).unwrap();
            prop_assert_eq!(RasterImage::from_dynamic(decoded), image);
        }

        /// Property: Output size is bounded by a linear function of the input.
        #[test]
        fn prop_output_size_is_bounded(image in image_strategy()) {
            let png = encode_png(&image, &EncoderConfig::default()).unwrap();
            let filtered = image.pixels().len() + image.height() as usize;
            // signature, IHDR, IEND, zlib framing, stored block headers, IDAT framing
            let bound = 8 + 25 + 12 + 6 + 5 * (filtered / 65_535 + 2) + 12 * (filtered / 8192 + 2);
            prop_assert!(png.len() <= filtered + bound);
        }
    }
}
