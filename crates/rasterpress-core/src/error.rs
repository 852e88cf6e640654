//! Error types for the encoding pipeline.
//!
//! Component errors are split by origin: [`InputError`] for a malformed
//! [`RasterImage`](crate::RasterImage), [`EncodeError`] for failures inside
//! the encoder itself. Both are surfaced through the top-level [`Error`],
//! which also records the pipeline [`Stage`] that failed.

use std::fmt;
use std::io;
use thiserror::Error;

/// Errors caused by an inconsistent or unsupported input image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// Pixel buffer length doesn't match width * height * channels
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    /// Channel count outside 1..=4
    #[error("Unsupported channel count {0}: expected 1 (gray), 2 (gray+alpha), 3 (RGB) or 4 (RGBA)")]
    UnsupportedChannels(u8),

    /// Only 8-bit samples are supported
    #[error("Unsupported bit depth {0}: only 8 bits per sample are supported")]
    UnsupportedBitDepth(u8),

    /// width * height * channels does not fit in memory addressing
    #[error("Image dimensions {width}x{height} overflow the addressable buffer size")]
    DimensionsOverflow { width: u32, height: u32 },

    /// The target format cannot represent an image without pixels
    #[error("Image dimensions {width}x{height} are not supported by this format")]
    EmptyImage { width: u32, height: u32 },

    /// The external decoder could not produce a raster
    #[error("Failed to decode source image: {0}")]
    Decode(String),
}

/// Errors raised by the encoder components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Input exceeds the configured guard limit
    #[error("Input of {actual} bytes exceeds the configured limit of {limit} bytes")]
    InputTooLarge { limit: u64, actual: u64 },

    /// A chunk was appended out of the IHDR, IDAT..., IEND order
    #[error("Chunk {chunk} cannot be written after {previous}")]
    ChunkOrder {
        chunk: &'static str,
        previous: &'static str,
    },

    /// Chunk payload longer than the container allows
    #[error("Chunk payload of {0} bytes exceeds the 2^31-1 byte limit")]
    ChunkTooLarge(usize),

    /// JPEG encoding failed inside the image crate
    #[error("JPEG encoding failed: {0}")]
    Jpeg(String),
}

/// Pipeline stage in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Deflating,
    Writing,
    Publishing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Deflating => "deflating",
            Stage::Writing => "writing",
            Stage::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

/// Top-level error returned by every public encode operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The input image was rejected before encoding started
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// An encoder component failed
    #[error("Encoding failed during {stage}: {source}")]
    Encode {
        stage: Stage,
        #[source]
        source: EncodeError,
    },

    /// Reading or writing a sink failed
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn encode(stage: Stage, source: EncodeError) -> Self {
        Error::Encode { stage, source }
    }

    pub(crate) fn io(stage: Stage, source: io::Error) -> Self {
        Error::Io { stage, source }
    }

    /// The stage that failed. Input errors are reported as [`Stage::Validate`].
    pub fn stage(&self) -> Stage {
        match self {
            Error::Input(_) => Stage::Validate,
            Error::Encode { stage, .. } | Error::Io { stage, .. } => *stage,
        }
    }
}

/// Carries an [`EncodeError`] through `std::io::Write` implementations.
///
/// The deflate encoder and the chunk writer both sit behind `io::Write`;
/// this wraps component errors so they can be recovered intact by the
/// pipeline driver instead of being flattened into an opaque I/O error.
pub(crate) fn encode_to_io(err: EncodeError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// Splits an `io::Error` back into the component error it carries, if any.
pub(crate) fn classify_io(stage: Stage, err: io::Error) -> Error {
    if !err.get_ref().is_some_and(|inner| inner.is::<EncodeError>()) {
        return Error::io(stage, err);
    }
    let kind = err.kind();
    match err.into_inner().map(|inner| inner.downcast::<EncodeError>()) {
        Some(Ok(source)) => Error::encode(stage, *source),
        Some(Err(inner)) => Error::io(stage, io::Error::new(kind, inner)),
        None => Error::io(stage, kind.into()),
    }
}
