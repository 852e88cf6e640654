//! DEFLATE compression (RFC 1951) with zlib and gzip framings.
//!
//! The encoder is a streaming [`Write`] adapter: bytes written to it are
//! buffered until a block of up to 64 KiB is available, then tokenized by
//! the LZ77 match finder and emitted as either a dynamic Huffman block or a
//! stored block, whichever is smaller. Completed bytes are forwarded to the
//! inner sink block by block, so memory stays bounded by the window plus one
//! block regardless of input size.
//!
//! # Example
//!
//! ```ignore
//! use std::io::Write;
//! use rasterpress_core::deflate::DeflateEncoder;
//!
//! let mut encoder = DeflateEncoder::new(Vec::new(), 6);
//! encoder.write_all(b"hello hello hello")?;
//! let compressed = encoder.finish()?;
//! ```

mod bits;
mod block;
mod gzip;
mod huffman;
mod lz77;
mod zlib;

pub use block::{BlockKind, MAX_STORED_LEN};
pub use gzip::{gzip_compress, GzipEncoder};
pub use huffman::{canonical_codes, code_lengths, MAX_CODE_LEN, MAX_CODE_LENGTH_CODE_LEN};
pub use lz77::{tokenize, SearchParams, Token, MAX_MATCH, MIN_MATCH, WINDOW_SIZE};
pub use zlib::{zlib_compress, Adler32, ZlibEncoder};

use std::io::{self, Write};

use crate::config::MAX_EFFORT;
use crate::error::{classify_io, encode_to_io, EncodeError, Error, Stage};
use bits::BitWriter;
use lz77::MatchFinder;

/// Maximum number of input bytes per block.
pub const MAX_BLOCK_LEN: usize = MAX_STORED_LEN;

/// Streaming raw DEFLATE encoder.
#[derive(Debug)]
pub struct DeflateEncoder<W: Write> {
    sink: W,
    bits: BitWriter,
    /// History (up to `WINDOW_SIZE` bytes) followed by the pending block
    window: Vec<u8>,
    pending_start: usize,
    finder: MatchFinder,
    tokens: Vec<Token>,
    total_in: u64,
    limit: u64,
    blocks: usize,
}

impl<W: Write> DeflateEncoder<W> {
    /// Create an encoder writing to `sink` at the given effort (0-9,
    /// clamped).
    pub fn new(sink: W, effort: u8) -> Self {
        let effort = effort.min(MAX_EFFORT);
        Self {
            sink,
            bits: BitWriter::new(),
            window: Vec::with_capacity(WINDOW_SIZE + MAX_BLOCK_LEN),
            pending_start: 0,
            finder: MatchFinder::new(effort),
            tokens: Vec::new(),
            total_in: 0,
            limit: u64::MAX,
            blocks: 0,
        }
    }

    /// Reject writes once more than `limit` bytes have been accepted.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Bytes emitted before the first block (a framing header).
    pub(crate) fn with_header(mut self, header: &[u8]) -> Self {
        self.bits.write_bytes(header);
        self
    }

    /// Total uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Emit the final block and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.compress_block(true)?;
        self.bits.align();
        self.bits.flush_to(&mut self.sink)?;
        log::trace!(
            "deflate finished: {} bytes in {} blocks",
            self.total_in,
            self.blocks
        );
        Ok(self.sink)
    }

    fn compress_block(&mut self, is_final: bool) -> io::Result<()> {
        self.tokens.clear();
        self.finder
            .tokenize(&self.window, self.pending_start, self.window.len(), &mut self.tokens);
        block::write_block(
            &mut self.bits,
            &self.tokens,
            &self.window[self.pending_start..],
            is_final,
        );
        self.blocks += 1;
        self.pending_start = self.window.len();
        self.bits.flush_to(&mut self.sink)?;
        self.slide();
        Ok(())
    }

    /// Drop history older than the window.
    fn slide(&mut self) {
        if self.pending_start > WINDOW_SIZE {
            let shift = self.pending_start - WINDOW_SIZE;
            self.window.drain(..shift);
            self.finder.slide(shift);
            self.pending_start -= shift;
        }
    }
}

impl<W: Write> Write for DeflateEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let actual = self.total_in.saturating_add(buf.len() as u64);
        if actual > self.limit {
            return Err(encode_to_io(EncodeError::InputTooLarge {
                limit: self.limit,
                actual,
            }));
        }

        let mut rest = buf;
        while !rest.is_empty() {
            let pending = self.window.len() - self.pending_start;
            let take = (MAX_BLOCK_LEN - pending).min(rest.len());
            self.window.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.window.len() - self.pending_start == MAX_BLOCK_LEN {
                self.compress_block(false)?;
            }
        }

        self.total_in = actual;
        Ok(buf.len())
    }

    /// Completed blocks are already forwarded; this only flushes the sink.
    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Compress `data` into a raw DEFLATE stream.
///
/// # Errors
///
/// Writing to an in-memory buffer cannot fail, so errors here indicate an
/// encoder bug and are reported as [`Stage::Deflating`].
pub fn compress(data: &[u8], effort: u8) -> Result<Vec<u8>, Error> {
    let mut encoder = DeflateEncoder::new(Vec::new(), effort);
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| classify_io(Stage::Deflating, e))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
