//! Encoder configuration.
//!
//! [`EncoderConfig`] gathers every tunable of the lossless pipeline and is
//! serde-serializable so it can be stored or passed across the WASM boundary.
//! [`LossyConfig`] carries the JPEG quality hint for the lossy export path.

use crate::filter::FilterType;
use serde::{Deserialize, Serialize};

/// Highest compression effort.
pub const MAX_EFFORT: u8 = 9;

/// Largest payload a single chunk may carry (2^31 - 1).
pub const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

/// Largest IDAT payload the encoder buffers before emitting a chunk.
pub const MAX_IDAT_LEN: u32 = 1 << 20;

/// How the pipeline picks a scanline filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterStrategy {
    /// Pick the filter with the lowest signed-byte sum for each row.
    #[default]
    Adaptive,
    /// Use the same filter for every row.
    Fixed(FilterType),
}

/// Configuration for PNG encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Compression effort (0-9). Higher values search harder for matches.
    /// Values above 9 are treated as 9.
    pub compression_effort: u8,
    /// Maximum pixel buffer size accepted, in bytes
    pub max_input_bytes: u64,
    /// Maximum payload of each IDAT chunk. Values above 1 MiB are treated
    /// as 1 MiB, since a whole chunk is buffered before it is written.
    pub idat_chunk_len: u32,
    /// Scanline filter selection
    pub filter: FilterStrategy,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            compression_effort: 6,
            max_input_bytes: 512 * 1024 * 1024,
            idat_chunk_len: 8192,
            filter: FilterStrategy::Adaptive,
        }
    }
}

impl EncoderConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Fastest setting that still searches for matches (effort 1).
    pub fn fast() -> Self {
        Self {
            compression_effort: 1,
            ..Self::default()
        }
    }

    /// Maximum compression (effort 9), used by the lossless preset.
    pub fn best() -> Self {
        Self {
            compression_effort: MAX_EFFORT,
            ..Self::default()
        }
    }

    /// Set the compression effort, clamped to 0-9
    pub fn with_effort(mut self, effort: u8) -> Self {
        self.compression_effort = effort.min(MAX_EFFORT);
        self
    }

    /// Set the input guard limit
    pub fn with_max_input_bytes(mut self, limit: u64) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Set the scanline filter strategy
    pub fn with_filter(mut self, filter: FilterStrategy) -> Self {
        self.filter = filter;
        self
    }

    /// Effort actually used by the encoder
    pub fn effort(&self) -> u8 {
        self.compression_effort.min(MAX_EFFORT)
    }

    /// IDAT payload size actually used, clamped to 1..=1 MiB
    pub fn chunk_len(&self) -> usize {
        self.idat_chunk_len.clamp(1, MAX_IDAT_LEN) as usize
    }
}

/// Configuration for the lossy JPEG export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossyConfig {
    /// JPEG quality (1-100, where 100 is highest quality)
    pub quality: u8,
}

impl Default for LossyConfig {
    fn default() -> Self {
        Self { quality: 50 }
    }
}

impl LossyConfig {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    /// Quality clamped to the valid range (1-100)
    pub fn quality(&self) -> u8 {
        self.quality.clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncoderConfig::new();
        assert_eq!(config.compression_effort, 6);
        assert_eq!(config.idat_chunk_len, 8192);
        assert_eq!(config.filter, FilterStrategy::Adaptive);
    }

    #[test]
    fn test_presets() {
        assert_eq!(EncoderConfig::fast().effort(), 1);
        assert_eq!(EncoderConfig::best().effort(), 9);
    }

    #[test]
    fn test_effort_clamping() {
        let config = EncoderConfig::new().with_effort(200);
        assert_eq!(config.compression_effort, 9);

        let mut config = EncoderConfig::new();
        config.compression_effort = 42;
        assert_eq!(config.effort(), 9);
    }

    #[test]
    fn test_chunk_len_clamping() {
        let mut config = EncoderConfig::new();
        config.idat_chunk_len = 0;
        assert_eq!(config.chunk_len(), 1);

        config.idat_chunk_len = u32::MAX;
        assert_eq!(config.chunk_len(), MAX_IDAT_LEN as usize);

        config.idat_chunk_len = MAX_IDAT_LEN + 1;
        assert_eq!(config.chunk_len(), 1 << 20);
    }

    #[test]
    fn test_lossy_quality_clamping() {
        assert_eq!(LossyConfig::new(0).quality(), 1);
        assert_eq!(LossyConfig::new(255).quality(), 100);
        assert_eq!(LossyConfig::default().quality(), 50);
    }
}
